//! Integration tests that run every demo program and check its printed
//! output against the `# expect:` annotations in the source.

use forge_eval::Vm;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn demos_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

fn find_forge_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().map_or(false, |e| e == "forge"))
        .collect();
    files.sort();
    files
}

/// Collect the `# expect:` annotations, one output line each, in order.
fn expected_output(source: &str) -> String {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix("# expect:"))
        .map(|rest| format!("{}\n", rest.trim_start()))
        .collect()
}

#[test]
fn all_demos_print_what_they_promise() {
    let demos = demos_dir();
    let files = find_forge_files(&demos);
    assert!(!files.is_empty(), "no .forge files found in {demos:?}");

    for file in &files {
        let source = fs::read_to_string(file).unwrap();
        let expected = expected_output(&source);
        assert!(
            !expected.is_empty(),
            "{} has no `# expect:` annotations",
            file.display()
        );

        let buf = SharedBuf::default();
        let mut vm = Vm::with_io(Box::new(io::empty()), Box::new(buf.clone()));
        vm.run(&source)
            .unwrap_or_else(|e| panic!("{} failed: {e}", file.display()));

        let got = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert_eq!(got, expected, "wrong output from {}", file.display());
    }
}
