//! String words. All indices and predicates work on Unicode scalar values,
//! never bytes.

use crate::value::Value;
use crate::vm::{type_mismatch, EvalError, EvalResult, Vm};

/// ( s -- S )
pub(crate) fn upper(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    vm.push(Value::Str(s.to_uppercase()));
    Ok(())
}

/// ( s -- S )
pub(crate) fn lower(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    vm.push(Value::Str(s.to_lowercase()));
    Ok(())
}

/// ( s -- S ) — first scalar uppercased, the rest lowercased.
pub(crate) fn capitalize(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    let mut chars = s.chars();
    let capped = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    vm.push(Value::Str(capped));
    Ok(())
}

/// ( s -- S ) — leading and trailing whitespace removed.
pub(crate) fn strip(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    vm.push(Value::Str(s.trim().to_string()));
    Ok(())
}

/// ( s sub -- Int ) — scalar index of the first occurrence, or −1.
pub(crate) fn find(vm: &mut Vm) -> EvalResult<()> {
    let needle = vm.pop_str()?;
    let s = vm.pop_str()?;
    let at = match s.find(&needle) {
        Some(byte) => s[..byte].chars().count() as i64,
        None => -1,
    };
    vm.push(Value::Int(at));
    Ok(())
}

/// ( s old new -- S ) — replaces every occurrence.
pub(crate) fn replace(vm: &mut Vm) -> EvalResult<()> {
    let new = vm.pop_str()?;
    let old = vm.pop_str()?;
    let s = vm.pop_str()?;
    vm.push(Value::Str(s.replace(&old, &new)));
    Ok(())
}

/// ( s -- List ) — split on whitespace runs; no empty fields.
pub(crate) fn split(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    let parts = s.split_whitespace().map(Value::str).collect();
    vm.push(Value::list(parts));
    Ok(())
}

/// ( s sep -- List ) — empty fields preserved; the separator must be
/// nonempty.
pub(crate) fn split_on(vm: &mut Vm) -> EvalResult<()> {
    let sep = vm.pop_str()?;
    let s = vm.pop_str()?;
    if sep.is_empty() {
        return Err(EvalError::EmptySeparator);
    }
    let parts = s.split(&sep).map(Value::str).collect();
    vm.push(Value::list(parts));
    Ok(())
}

/// ( L sep -- S ) — every element of the list must be a Str.
pub(crate) fn join(vm: &mut Vm) -> EvalResult<()> {
    let sep = vm.pop_str()?;
    let list = vm.pop_list()?;
    let items = list.borrow();
    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Value::Str(s) => parts.push(s.as_str()),
            other => return Err(type_mismatch("a list of Str", other)),
        }
    }
    let joined = parts.join(&sep);
    drop(items);
    vm.push(Value::Str(joined));
    Ok(())
}

/// ( s prefix -- Bool )
pub(crate) fn startswith(vm: &mut Vm) -> EvalResult<()> {
    let prefix = vm.pop_str()?;
    let s = vm.pop_str()?;
    vm.push(Value::Bool(s.starts_with(&prefix)));
    Ok(())
}

/// ( s suffix -- Bool )
pub(crate) fn endswith(vm: &mut Vm) -> EvalResult<()> {
    let suffix = vm.pop_str()?;
    let s = vm.pop_str()?;
    vm.push(Value::Bool(s.ends_with(&suffix)));
    Ok(())
}

/// ( s -- Bool ) — nonempty and all scalars numeric.
pub(crate) fn isdigit(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    let all = !s.is_empty() && s.chars().all(char::is_numeric);
    vm.push(Value::Bool(all));
    Ok(())
}

/// ( s -- Bool ) — nonempty and all scalars alphabetic.
pub(crate) fn isalpha(vm: &mut Vm) -> EvalResult<()> {
    let s = vm.pop_str()?;
    let all = !s.is_empty() && s.chars().all(char::is_alphabetic);
    vm.push(Value::Bool(all));
    Ok(())
}
