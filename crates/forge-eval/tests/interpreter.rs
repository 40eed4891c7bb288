//! End-to-end interpreter tests: programs in, printed output out.

use forge_eval::{EvalError, ForgeError, Value, Vm};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A writer the test can read back after the VM is done with it.
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

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output should be UTF-8")
    }
}

fn capture_vm() -> (Vm, SharedBuf) {
    let buf = SharedBuf::default();
    let vm = Vm::with_io(Box::new(io::empty()), Box::new(buf.clone()));
    (vm, buf)
}

/// Run a program and return everything it printed.
fn output_of(source: &str) -> String {
    let (mut vm, buf) = capture_vm();
    vm.run(source).expect("program should run");
    buf.contents()
}

/// Run a program that must fail at runtime and return the error.
fn eval_error_of(source: &str) -> EvalError {
    let (mut vm, _) = capture_vm();
    match vm.run(source) {
        Err(ForgeError::Eval(e)) => e,
        Err(other) => panic!("expected a runtime error, got {other:?}"),
        Ok(()) => panic!("expected a runtime error, program succeeded"),
    }
}

// === Whole-program scenarios ===

#[test]
fn scenario_addition() {
    assert_eq!(output_of("1 2 add print"), "3\n");
}

#[test]
fn scenario_if_else() {
    assert_eq!(output_of(r#"1 2 gt if "G" else "S" end print"#), "S\n");
}

#[test]
fn scenario_while_counter() {
    let source = r#"0 "c" store "c" load 3 lt while "c" load 1 add "c" store "c" load 3 lt end "c" load print"#;
    assert_eq!(output_of(source), "3\n");
}

#[test]
fn scenario_recursive_factorial() {
    let source = "def f dup 1 gt if dup 1 sub f mul end end 5 f print";
    assert_eq!(output_of(source), "120\n");
}

#[test]
fn scenario_list_append_via_store() {
    let source = r#"1 2 3 3 list "xs" store "xs" load 4 list_append "xs" load list_len print"#;
    assert_eq!(output_of(source), "4\n");
}

#[test]
fn scenario_dict_get_and_missing_key() {
    let (mut vm, buf) = capture_vm();
    vm.run(r#""k" "v" 1 dict "d" store "d" load "k" dict_get print"#)
        .unwrap();
    assert_eq!(buf.contents(), "v\n");
    vm.run(r#""d" load "missing" dict_get print"#).unwrap();
    assert_eq!(buf.contents(), "v\nnone\n");
}

// === Stack shuffling ===

#[test]
fn test_stack_words() {
    assert_eq!(output_of("7 dup print print"), "7\n7\n");
    assert_eq!(output_of("1 2 swap print print"), "1\n2\n");
    assert_eq!(output_of("1 2 drop print"), "1\n");
    assert_eq!(output_of("1 2 over print print print"), "1\n2\n1\n");
    // rot brings the third element to the top.
    assert_eq!(output_of("1 2 3 rot print print print"), "1\n3\n2\n");
}

#[test]
fn test_stack_underflow() {
    assert!(matches!(eval_error_of("dup"), EvalError::StackUnderflow));
    assert!(matches!(eval_error_of("1 swap"), EvalError::StackUnderflow));
    assert!(matches!(eval_error_of("1 2 rot"), EvalError::StackUnderflow));
    assert!(matches!(eval_error_of("add"), EvalError::StackUnderflow));
}

// === Arithmetic ===

#[test]
fn test_integer_arithmetic() {
    assert_eq!(output_of("10 4 sub print"), "6\n");
    assert_eq!(output_of("6 7 mul print"), "42\n");
    assert_eq!(output_of("7 2 div print"), "3\n");
    assert_eq!(output_of("7 3 mod print"), "1\n");
}

#[test]
fn test_division_truncates_toward_zero() {
    assert_eq!(output_of("-7 2 div print"), "-3\n");
    assert_eq!(output_of("7 -2 div print"), "-3\n");
}

#[test]
fn test_modulo_takes_sign_of_dividend() {
    assert_eq!(output_of("-7 3 mod print"), "-1\n");
    assert_eq!(output_of("7 -3 mod print"), "1\n");
}

#[test]
fn test_float_promotion() {
    assert_eq!(output_of("1 2.5 add print"), "3.5\n");
    assert_eq!(output_of("1.5 0.5 add print"), "2.0\n");
    assert_eq!(output_of("7 2.0 div print"), "3.5\n");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(output_of(r#""ab" "cd" add print"#), "abcd\n");
}

#[test]
fn test_arithmetic_type_errors() {
    assert!(matches!(
        eval_error_of(r#"1 "a" add"#),
        EvalError::TypeMismatch { .. }
    ));
    assert!(matches!(
        eval_error_of("true 1 sub"),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(
        eval_error_of("1 0 div"),
        EvalError::DivisionByZero
    ));
    assert!(matches!(
        eval_error_of("1.0 0.0 div"),
        EvalError::DivisionByZero
    ));
    assert!(matches!(
        eval_error_of("5 0 mod"),
        EvalError::DivisionByZero
    ));
}

#[test]
fn test_wrapping_overflow() {
    let source = format!("{} 1 add print", i64::MAX);
    assert_eq!(output_of(&source), format!("{}\n", i64::MIN));
}

// === Comparison ===

#[test]
fn test_comparisons() {
    assert_eq!(output_of("2 2 eq print"), "true\n");
    assert_eq!(output_of("2 2.0 eq print"), "true\n");
    assert_eq!(output_of(r#""a" "a" eq print"#), "true\n");
    assert_eq!(output_of(r#"1 "1" eq print"#), "false\n");
    assert_eq!(output_of("3 2 gt print"), "true\n");
    assert_eq!(output_of(r#""a" "b" lt print"#), "true\n");
    assert_eq!(output_of("1.5 2 lt print"), "true\n");
}

#[test]
fn test_container_equality() {
    assert_eq!(output_of("1 2 2 list 1 2 2 list eq print"), "true\n");
    assert_eq!(output_of("1 2 2 list 2 1 2 list eq print"), "false\n");
}

#[test]
fn test_ordering_type_error() {
    assert!(matches!(
        eval_error_of(r#"1 "a" gt"#),
        EvalError::TypeMismatch { .. }
    ));
    assert!(matches!(
        eval_error_of("true false lt"),
        EvalError::TypeMismatch { .. }
    ));
}

// === Truthiness ===

#[test]
fn test_truthiness_selection() {
    assert_eq!(output_of(r#"0 if "T" else "F" end print"#), "F\n");
    assert_eq!(output_of(r#""" if "T" else "F" end print"#), "F\n");
    assert_eq!(output_of(r#"1 if "T" else "F" end print"#), "T\n");
    assert_eq!(output_of(r#"none if "T" else "F" end print"#), "F\n");
    assert_eq!(output_of(r#"0.0 if "T" else "F" end print"#), "F\n");
    assert_eq!(output_of(r#"0 0 list if "T" else "F" end print"#), "F\n");
}

#[test]
fn test_if_without_else() {
    assert_eq!(output_of(r#"0 if "T" print end "done" print"#), "done\n");
    assert_eq!(
        output_of(r#"1 if "T" print end "done" print"#),
        "T\ndone\n"
    );
}

// === Variables ===

#[test]
fn test_store_and_rebind() {
    assert_eq!(
        output_of(r#"1 "x" store 2 "x" store "x" load print"#),
        "2\n"
    );
}

#[test]
fn test_load_unbound() {
    assert!(matches!(
        eval_error_of(r#""nope" load"#),
        EvalError::UnboundVariable(name) if name == "nope"
    ));
}

#[test]
fn test_store_name_must_be_string() {
    assert!(matches!(
        eval_error_of("1 2 store"),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_list_aliasing_through_store() {
    let source = r#"1 2 2 list "a" store "a" load "b" store "a" load 3 list_append "b" load list_len print"#;
    assert_eq!(output_of(source), "3\n");
}

// === Loops ===

#[test]
fn test_for_accumulates() {
    let source = r#"0 "sum" store 1 4 for dup "sum" load add "sum" store end "sum" load print"#;
    assert_eq!(output_of(source), "10\n");
}

#[test]
fn test_for_pushes_each_index() {
    assert_eq!(output_of("1 3 for dup print end"), "1\n2\n3\n");
}

#[test]
fn test_for_empty_range() {
    assert_eq!(output_of(r#"5 1 for dup print end "done" print"#), "done\n");
}

#[test]
fn test_for_bounds_must_be_integers() {
    assert!(matches!(
        eval_error_of(r#"1 "a" for end"#),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_times_repeats_body() {
    assert_eq!(output_of(r#"3 times "x" print end"#), "x\nx\nx\n");
    assert_eq!(output_of(r#"0 times "x" print end "done" print"#), "done\n");
    assert_eq!(
        output_of(r#"-2 times "x" print end "done" print"#),
        "done\n"
    );
}

#[test]
fn test_nested_loops() {
    assert_eq!(
        output_of(r#"2 times 2 times "a" print end end"#),
        "a\na\na\na\n"
    );
}

#[test]
fn test_while_false_entry_skips_body() {
    assert_eq!(
        output_of(r#"false while "x" print false end "done" print"#),
        "done\n"
    );
}

// === Procedures ===

#[test]
fn test_def_body_is_skipped_at_definition() {
    assert_eq!(
        output_of(r#"def g "hi" print end "after" print"#),
        "after\n"
    );
}

#[test]
fn test_procedure_call() {
    assert_eq!(output_of("def square dup mul end 6 square print"), "36\n");
}

#[test]
fn test_procedure_redefinition_wins() {
    assert_eq!(
        output_of("def f 1 end def f 2 end f print"),
        "2\n"
    );
}

#[test]
fn test_procedures_share_flat_namespace() {
    // A callee reads and writes the caller's variables.
    let source = r#"def bump "n" load 1 add "n" store end 10 "n" store bump bump "n" load print"#;
    assert_eq!(output_of(source), "12\n");
}

#[test]
fn test_unknown_word() {
    assert!(matches!(
        eval_error_of("frobnicate"),
        EvalError::UnknownWord(w) if w == "frobnicate"
    ));
}

// === REPL-style incremental runs ===

#[test]
fn test_state_persists_across_runs() {
    let (mut vm, buf) = capture_vm();
    vm.run("def sq dup mul end").unwrap();
    vm.run(r#"3 "x" store"#).unwrap();
    vm.run(r#""x" load sq print"#).unwrap();
    assert_eq!(buf.contents(), "9\n");
}

#[test]
fn test_runtime_error_leaves_stack_intact() {
    let (mut vm, _) = capture_vm();
    vm.run("1 2").unwrap();
    assert!(vm.run("frobnicate").is_err());
    assert_eq!(vm.stack(), &[Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_resolve_error_rolls_back_tokens() {
    let (mut vm, buf) = capture_vm();
    assert!(matches!(vm.run("1 if"), Err(ForgeError::Resolve(_))));
    // The broken line must not poison later ones.
    vm.run("5 print").unwrap();
    assert_eq!(buf.contents(), "5\n");
}

#[test]
fn test_lex_error_surfaces() {
    let (mut vm, _) = capture_vm();
    assert!(matches!(vm.run(r#""open"#), Err(ForgeError::Lex(_))));
}

// === Conversion ===

#[test]
fn test_conversions() {
    assert_eq!(output_of(r#""42" int print"#), "42\n");
    assert_eq!(output_of("3.9 int print"), "3\n");
    assert_eq!(output_of("-3.9 int print"), "-3\n");
    assert_eq!(output_of("true int print"), "1\n");
    assert_eq!(output_of("42 float print"), "42.0\n");
    assert_eq!(output_of(r#""3.5" float print"#), "3.5\n");
    assert_eq!(output_of("42 str print"), "42\n");
    assert_eq!(output_of("0 bool print"), "false\n");
    assert_eq!(output_of(r#""x" bool print"#), "true\n");
}

#[test]
fn test_str_of_containers_quotes_nested_strings() {
    assert_eq!(output_of(r#"1 "a" 2 list str print"#), "[1, \"a\"]\n");
}

#[test]
fn test_bad_conversion() {
    assert!(matches!(
        eval_error_of(r#""zap" int"#),
        EvalError::Conversion { target: "Int", .. }
    ));
    assert!(matches!(
        eval_error_of(r#""zap" float"#),
        EvalError::Conversion { target: "Float", .. }
    ));
}

#[test]
fn test_constant_words() {
    assert_eq!(output_of("push_true print"), "true\n");
    assert_eq!(output_of("push_false print"), "false\n");
    assert_eq!(output_of("push_none print"), "none\n");
    assert_eq!(output_of("true print"), "true\n");
    assert_eq!(output_of("none print"), "none\n");
}

// === Memory stubs ===

#[test]
fn test_memory_words_are_stubbed() {
    assert!(matches!(
        eval_error_of("8 alloc"),
        EvalError::Unsupported("alloc")
    ));
    assert!(matches!(
        eval_error_of("0 free"),
        EvalError::Unsupported("free")
    ));
}

// === Lists ===

#[test]
fn test_list_construction_order() {
    assert_eq!(output_of("1 2 3 3 list print"), "[1, 2, 3]\n");
    assert_eq!(output_of("0 list print"), "[]\n");
}

#[test]
fn test_list_count_must_be_non_negative() {
    assert!(matches!(
        eval_error_of("-1 list"),
        EvalError::BadCount("list")
    ));
}

#[test]
fn test_list_get_supports_negative_indices() {
    assert_eq!(output_of("1 2 3 3 list -1 list_get print"), "3\n");
    assert_eq!(output_of("1 2 3 3 list 0 list_get print"), "1\n");
}

#[test]
fn test_list_get_out_of_range() {
    assert!(matches!(
        eval_error_of("1 2 2 list 5 list_get"),
        EvalError::IndexOutOfBounds { index: 5, len: 2 }
    ));
    assert!(matches!(
        eval_error_of("1 2 2 list -3 list_get"),
        EvalError::IndexOutOfBounds { index: -3, len: 2 }
    ));
}

#[test]
fn test_list_pop_and_pop_at() {
    assert_eq!(output_of("1 2 2 list list_pop print"), "2\n");
    assert_eq!(
        output_of(r#"1 2 3 3 list "l" store "l" load 0 list_pop_at print "l" load print"#),
        "1\n[2, 3]\n"
    );
    assert!(matches!(
        eval_error_of("0 list list_pop"),
        EvalError::EmptyList("list_pop")
    ));
}

#[test]
fn test_list_insert_clamps() {
    assert_eq!(
        output_of(r#"1 3 2 list "l" store "l" load 1 2 list_insert "l" load print"#),
        "[1, 2, 3]\n"
    );
    assert_eq!(
        output_of(r#"1 1 list "l" store "l" load 99 2 list_insert "l" load print"#),
        "[1, 2]\n"
    );
}

#[test]
fn test_list_set() {
    assert_eq!(
        output_of(r#"1 2 2 list "l" store "l" load 1 9 list_set "l" load print"#),
        "[1, 9]\n"
    );
    assert!(matches!(
        eval_error_of("1 1 list 3 0 list_set"),
        EvalError::IndexOutOfBounds { .. }
    ));
}

#[test]
fn test_list_remove() {
    assert_eq!(
        output_of(r#"1 2 1 3 list "l" store "l" load 1 list_remove "l" load print"#),
        "[2, 1]\n"
    );
    assert!(matches!(
        eval_error_of("1 1 list 9 list_remove"),
        EvalError::ElementNotFound
    ));
}

#[test]
fn test_list_extend() {
    let source = r#"1 1 list "a" store 2 3 2 list "b" store "a" load "b" load list_extend "a" load print"#;
    assert_eq!(output_of(source), "[1, 2, 3]\n");
}

#[test]
fn test_list_extend_with_itself() {
    let source = r#"1 2 2 list "a" store "a" load "a" load list_extend "a" load print"#;
    assert_eq!(output_of(source), "[1, 2, 1, 2]\n");
}

#[test]
fn test_list_sort_and_reverse() {
    assert_eq!(
        output_of(r#"3 1 2 3 list "l" store "l" load list_sort "l" load print"#),
        "[1, 2, 3]\n"
    );
    assert_eq!(
        output_of(r#""b" "a" 2 list "l" store "l" load list_sort "l" load print"#),
        "[\"a\", \"b\"]\n"
    );
    assert_eq!(
        output_of(r#"1 2 2 list "l" store "l" load list_reverse "l" load print"#),
        "[2, 1]\n"
    );
}

#[test]
fn test_list_sort_mixed_types_fails() {
    assert!(matches!(
        eval_error_of(r#"1 "a" 2 list list_sort"#),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_list_slice_clamps() {
    assert_eq!(output_of("1 2 3 4 4 list 1 3 list_slice print"), "[2, 3]\n");
    assert_eq!(
        output_of("1 2 3 4 4 list -3 99 list_slice print"),
        "[2, 3, 4]\n"
    );
    assert_eq!(output_of("1 2 2 list 2 1 list_slice print"), "[]\n");
}

#[test]
fn test_list_copy_is_independent() {
    let source = r#"1 1 list "a" store "a" load list_copy "b" store "b" load 2 list_append "a" load print "b" load print"#;
    assert_eq!(output_of(source), "[1]\n[1, 2]\n");
}

#[test]
fn test_list_clear_preserves_identity() {
    let source = r#"1 2 2 list "a" store "a" load "b" store "a" load list_clear "b" load list_len print"#;
    assert_eq!(output_of(source), "0\n");
}

#[test]
fn test_list_index_and_count() {
    assert_eq!(output_of("5 6 5 3 list 6 list_index print"), "1\n");
    assert_eq!(output_of("5 6 5 3 list 5 list_count print"), "2\n");
    assert!(matches!(
        eval_error_of("1 1 list 9 list_index"),
        EvalError::ElementNotFound
    ));
}

#[test]
fn test_list_word_requires_list() {
    assert!(matches!(
        eval_error_of("1 2 list_append"),
        EvalError::TypeMismatch { .. }
    ));
}

// === Dicts ===

#[test]
fn test_dict_insertion_order() {
    assert_eq!(
        output_of(r#""a" 1 "b" 2 2 dict dict_keys print"#),
        "[\"a\", \"b\"]\n"
    );
    assert_eq!(
        output_of(r#""a" 1 "b" 2 2 dict dict_values print"#),
        "[1, 2]\n"
    );
}

#[test]
fn test_dict_items_are_tuples() {
    assert_eq!(
        output_of(r#""k" 1 1 dict dict_items print"#),
        "[(\"k\", 1)]\n"
    );
}

#[test]
fn test_dict_set_inserts_and_overwrites() {
    let source = r#""a" 1 1 dict "d" store "d" load "b" 2 dict_set "d" load "a" 9 dict_set "d" load print"#;
    assert_eq!(output_of(source), "{\"a\": 9, \"b\": 2}\n");
}

#[test]
fn test_dict_pop() {
    assert_eq!(
        output_of(r#""a" 1 "b" 2 2 dict "d" store "d" load "a" dict_pop print "d" load print"#),
        "1\n{\"b\": 2}\n"
    );
    assert!(matches!(
        eval_error_of(r#""a" 1 1 dict "zz" dict_pop"#),
        EvalError::KeyNotFound(k) if k == "zz"
    ));
}

#[test]
fn test_dict_keys_must_be_strings() {
    assert!(matches!(
        eval_error_of("1 2 1 dict"),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_dict_printing() {
    assert_eq!(
        output_of(r#""k" "v" 1 dict print"#),
        "{\"k\": \"v\"}\n"
    );
}

// === Strings ===

#[test]
fn test_string_case_words() {
    assert_eq!(output_of(r#""hi there" str_upper print"#), "HI THERE\n");
    assert_eq!(output_of(r#""LOUD" str_lower print"#), "loud\n");
    assert_eq!(
        output_of(r#""hello WORLD" str_capitalize print"#),
        "Hello world\n"
    );
}

#[test]
fn test_string_strip() {
    assert_eq!(output_of(r#""  hi  " str_strip print"#), "hi\n");
}

#[test]
fn test_string_find_counts_scalars() {
    // The index is in scalars, not bytes: é is two bytes but one scalar.
    assert_eq!(output_of(r#""héllo" "llo" str_find print"#), "2\n");
    assert_eq!(output_of(r#""abc" "zz" str_find print"#), "-1\n");
}

#[test]
fn test_string_replace() {
    assert_eq!(
        output_of(r#""a-b-c" "-" "+" str_replace print"#),
        "a+b+c\n"
    );
}

#[test]
fn test_string_split() {
    assert_eq!(
        output_of(r#""a b  c" str_split print"#),
        "[\"a\", \"b\", \"c\"]\n"
    );
    assert_eq!(
        output_of(r#""a,,b" "," str_split_on print"#),
        "[\"a\", \"\", \"b\"]\n"
    );
    assert!(matches!(
        eval_error_of(r#""ab" "" str_split_on"#),
        EvalError::EmptySeparator
    ));
}

#[test]
fn test_string_join() {
    assert_eq!(output_of(r#""a" "b" 2 list "-" str_join print"#), "a-b\n");
    assert!(matches!(
        eval_error_of(r#"1 1 list "-" str_join"#),
        EvalError::TypeMismatch { .. }
    ));
}

#[test]
fn test_string_affix_words() {
    assert_eq!(output_of(r#""forge" "fo" str_startswith print"#), "true\n");
    assert_eq!(output_of(r#""forge" "ge" str_endswith print"#), "true\n");
    assert_eq!(output_of(r#""forge" "x" str_startswith print"#), "false\n");
}

#[test]
fn test_string_class_words() {
    assert_eq!(output_of(r#""123" str_isdigit print"#), "true\n");
    assert_eq!(output_of(r#""12a" str_isdigit print"#), "false\n");
    assert_eq!(output_of(r#""" str_isdigit print"#), "false\n");
    assert_eq!(output_of(r#""abc" str_isalpha print"#), "true\n");
    assert_eq!(output_of(r#""ab1" str_isalpha print"#), "false\n");
}

#[test]
fn test_string_word_requires_string() {
    assert!(matches!(
        eval_error_of("1 str_upper"),
        EvalError::TypeMismatch { .. }
    ));
}

// === I/O ===

#[test]
fn test_input_pushes_line_as_string() {
    let buf = SharedBuf::default();
    let mut vm = Vm::with_io(
        Box::new(io::Cursor::new(b"42\n".to_vec())),
        Box::new(buf.clone()),
    );
    vm.run("input print").unwrap();
    assert_eq!(buf.contents(), "42\n");
}

#[test]
fn test_input_is_string_typed() {
    let mut vm = Vm::with_io(
        Box::new(io::Cursor::new(b"5\n".to_vec())),
        Box::new(io::sink()),
    );
    vm.run("input 1 add").unwrap_err();
}

#[test]
fn test_input_on_closed_stream() {
    let (mut vm, _) = capture_vm();
    assert!(matches!(
        vm.run("input"),
        Err(ForgeError::Eval(EvalError::EndOfInput))
    ));
}

#[test]
fn test_float_print_always_has_point() {
    assert_eq!(output_of("1.0 print"), "1.0\n");
    assert_eq!(output_of("2.5 2.5 add print"), "5.0\n");
}
