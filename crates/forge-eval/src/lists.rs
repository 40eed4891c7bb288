//! Container words: list/tuple/dict construction, list mutation and
//! inspection, and the dict method surface.
//!
//! Mutating words change the container through its shared handle and push
//! nothing back; the binding that produced the handle still sees the change.
//! Producing words push a fresh value.

use crate::value::{compare, Value};
use crate::vm::{type_mismatch, EvalError, EvalResult, Vm};
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Resolve a possibly negative index against a length. Negative indices
/// count back from the end.
fn locate(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let at = if index < 0 { index + len } else { index };
    (0..len).contains(&at).then(|| at as usize)
}

/// Clamp a possibly negative slice bound to `0..=len`.
fn clamp_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let at = if bound < 0 { bound + len } else { bound };
    at.clamp(0, len) as usize
}

// === Construction ===

/// ( v1 … vN N -- List )
pub(crate) fn list(vm: &mut Vm) -> EvalResult<()> {
    let n = vm.pop_count("list")?;
    let items = vm.pop_n(n)?;
    vm.push(Value::list(items));
    Ok(())
}

/// ( v1 … vN N -- Tuple )
pub(crate) fn tuple(vm: &mut Vm) -> EvalResult<()> {
    let n = vm.pop_count("tuple")?;
    let items = vm.pop_n(n)?;
    vm.push(Value::tuple(items));
    Ok(())
}

/// ( k1 v1 … kN vN N -- Dict ) — keys must be Str; pairs enter in source
/// order, so the first-pushed key is first in iteration order.
pub(crate) fn dict(vm: &mut Vm) -> EvalResult<()> {
    let n = vm.pop_count("dict")?;
    let flat = vm.pop_n(n * 2)?;
    let mut entries = IndexMap::with_capacity(n);
    let mut pairs = flat.into_iter();
    while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
        let Value::Str(key) = key else {
            return Err(type_mismatch("Str key", &key));
        };
        entries.insert(key, value);
    }
    vm.push(Value::dict(entries));
    Ok(())
}

// === List mutators ===

/// ( L v -- )
pub(crate) fn append(vm: &mut Vm) -> EvalResult<()> {
    let elem = vm.pop()?;
    let list = vm.pop_list()?;
    list.borrow_mut().push(elem);
    Ok(())
}

/// ( L i v -- ) — the index is clamped, counting from the end if negative.
pub(crate) fn insert(vm: &mut Vm) -> EvalResult<()> {
    let elem = vm.pop()?;
    let index = vm.pop_int()?;
    let list = vm.pop_list()?;
    let mut items = list.borrow_mut();
    let at = clamp_bound(index, items.len());
    items.insert(at, elem);
    Ok(())
}

/// ( L v -- ) — removes the first equal element.
pub(crate) fn remove(vm: &mut Vm) -> EvalResult<()> {
    let elem = vm.pop()?;
    let list = vm.pop_list()?;
    let mut items = list.borrow_mut();
    match items.iter().position(|v| *v == elem) {
        Some(at) => {
            items.remove(at);
            Ok(())
        }
        None => Err(EvalError::ElementNotFound),
    }
}

/// ( L M -- ) — appends M's elements to L.
pub(crate) fn extend(vm: &mut Vm) -> EvalResult<()> {
    let other = vm.pop_list()?;
    let list = vm.pop_list()?;
    // Snapshot first so extending a list with itself cannot alias borrows.
    let tail: Vec<Value> = other.borrow().clone();
    list.borrow_mut().extend(tail);
    Ok(())
}

/// ( L -- ) — elements must be mutually comparable (all numbers or all
/// strings).
pub(crate) fn sort(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    let mut items = list.borrow_mut();
    for window in items.windows(2) {
        if compare(&window[0], &window[1]).is_none() {
            return Err(EvalError::TypeMismatch {
                expected: "a list of numbers or a list of strings".to_string(),
                actual: format!(
                    "{} and {}",
                    window[0].type_name(),
                    window[1].type_name()
                ),
            });
        }
    }
    items.sort_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal));
    Ok(())
}

/// ( L -- )
pub(crate) fn reverse(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    list.borrow_mut().reverse();
    Ok(())
}

/// ( L -- ) — empties the list but keeps the container identity.
pub(crate) fn clear(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    list.borrow_mut().clear();
    Ok(())
}

/// ( L i v -- )
pub(crate) fn set(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    let index = vm.pop_int()?;
    let list = vm.pop_list()?;
    let mut items = list.borrow_mut();
    let len = items.len();
    match locate(index, len) {
        Some(at) => {
            items[at] = value;
            Ok(())
        }
        None => Err(EvalError::IndexOutOfBounds { index, len }),
    }
}

// === List producers ===

/// ( L -- v ) — pops the last element.
pub(crate) fn pop(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    let elem = list.borrow_mut().pop().ok_or(EvalError::EmptyList("list_pop"))?;
    vm.push(elem);
    Ok(())
}

/// ( L i -- v )
pub(crate) fn pop_at(vm: &mut Vm) -> EvalResult<()> {
    let index = vm.pop_int()?;
    let list = vm.pop_list()?;
    let mut items = list.borrow_mut();
    let len = items.len();
    match locate(index, len) {
        Some(at) => {
            let elem = items.remove(at);
            drop(items);
            vm.push(elem);
            Ok(())
        }
        None => Err(EvalError::IndexOutOfBounds { index, len }),
    }
}

/// ( L i -- v )
pub(crate) fn get(vm: &mut Vm) -> EvalResult<()> {
    let index = vm.pop_int()?;
    let list = vm.pop_list()?;
    let items = list.borrow();
    let len = items.len();
    match locate(index, len) {
        Some(at) => {
            let elem = items[at].clone();
            drop(items);
            vm.push(elem);
            Ok(())
        }
        None => Err(EvalError::IndexOutOfBounds { index, len }),
    }
}

/// ( L lo hi -- M ) — bounds clamp like the slicing they imitate; an empty
/// range yields an empty list.
pub(crate) fn slice(vm: &mut Vm) -> EvalResult<()> {
    let hi = vm.pop_int()?;
    let lo = vm.pop_int()?;
    let list = vm.pop_list()?;
    let items = list.borrow();
    let lo = clamp_bound(lo, items.len());
    let hi = clamp_bound(hi, items.len());
    let piece = if lo < hi {
        items[lo..hi].to_vec()
    } else {
        Vec::new()
    };
    drop(items);
    vm.push(Value::list(piece));
    Ok(())
}

/// ( L -- M ) — shallow copy under a fresh handle.
pub(crate) fn copy(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    let items = list.borrow().clone();
    vm.push(Value::list(items));
    Ok(())
}

/// ( L v -- Int )
pub(crate) fn index(vm: &mut Vm) -> EvalResult<()> {
    let elem = vm.pop()?;
    let list = vm.pop_list()?;
    let at = list.borrow().iter().position(|v| *v == elem);
    match at {
        Some(at) => {
            vm.push(Value::Int(at as i64));
            Ok(())
        }
        None => Err(EvalError::ElementNotFound),
    }
}

/// ( L v -- Int )
pub(crate) fn count(vm: &mut Vm) -> EvalResult<()> {
    let elem = vm.pop()?;
    let list = vm.pop_list()?;
    let n = list.borrow().iter().filter(|v| **v == elem).count();
    vm.push(Value::Int(n as i64));
    Ok(())
}

/// ( L -- Int )
pub(crate) fn len(vm: &mut Vm) -> EvalResult<()> {
    let list = vm.pop_list()?;
    let n = list.borrow().len();
    vm.push(Value::Int(n as i64));
    Ok(())
}

// === Dict words ===

/// ( D k -- v|none )
pub(crate) fn dict_get(vm: &mut Vm) -> EvalResult<()> {
    let key = vm.pop_str()?;
    let dict = vm.pop_dict()?;
    let value = dict.borrow().get(&key).cloned().unwrap_or(Value::None);
    vm.push(value);
    Ok(())
}

/// ( D k v -- )
pub(crate) fn dict_set(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    let key = vm.pop_str()?;
    let dict = vm.pop_dict()?;
    dict.borrow_mut().insert(key, value);
    Ok(())
}

/// ( D k -- v ) — fails on a missing key.
pub(crate) fn dict_pop(vm: &mut Vm) -> EvalResult<()> {
    let key = vm.pop_str()?;
    let dict = vm.pop_dict()?;
    let removed = dict.borrow_mut().shift_remove(&key);
    match removed {
        Some(value) => {
            vm.push(value);
            Ok(())
        }
        None => Err(EvalError::KeyNotFound(key)),
    }
}

/// ( D -- List ) — keys in insertion order.
pub(crate) fn dict_keys(vm: &mut Vm) -> EvalResult<()> {
    let dict = vm.pop_dict()?;
    let keys = dict.borrow().keys().cloned().map(Value::Str).collect();
    vm.push(Value::list(keys));
    Ok(())
}

/// ( D -- List ) — values in insertion order.
pub(crate) fn dict_values(vm: &mut Vm) -> EvalResult<()> {
    let dict = vm.pop_dict()?;
    let values = dict.borrow().values().cloned().collect();
    vm.push(Value::list(values));
    Ok(())
}

/// ( D -- List ) — `(key, value)` tuples in insertion order.
pub(crate) fn dict_items(vm: &mut Vm) -> EvalResult<()> {
    let dict = vm.pop_dict()?;
    let items = dict
        .borrow()
        .iter()
        .map(|(k, v)| Value::tuple(vec![Value::str(k.clone()), v.clone()]))
        .collect();
    vm.push(Value::list(items));
    Ok(())
}
