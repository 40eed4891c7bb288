//! The built-in word table: stack shuffling, arithmetic, comparison,
//! conversion, variables, and I/O.
//!
//! Container and string words live in [`crate::lists`] and
//! [`crate::strings`]; this module owns the dispatch table for all of them.

use crate::value::{compare, numeric_pair, NumPair, Value};
use crate::vm::{type_mismatch, EvalError, EvalResult, Vm};
use crate::{lists, strings};
use std::cmp::Ordering;

/// A built-in word implementation.
pub(crate) type Builtin = fn(&mut Vm) -> EvalResult<()>;

/// Look up a built-in word by name.
pub(crate) fn lookup(name: &str) -> Option<Builtin> {
    Some(match name {
        // === Stack ===
        "dup" => dup,
        "swap" => swap,
        "drop" => drop_top,
        "over" => over,
        "rot" => rot,

        // === Arithmetic ===
        "add" => add,
        "sub" => sub,
        "mul" => mul,
        "div" => div,
        "mod" => modulo,

        // === Comparison ===
        "eq" => eq,
        "gt" => gt,
        "lt" => lt,

        // === Conversion ===
        "int" => to_int,
        "float" => to_float,
        "str" => to_str,
        "bool" => to_bool,

        // === Constants ===
        "push_true" => push_true,
        "push_false" => push_false,
        "push_none" => push_none,

        // === Variables ===
        "store" => store,
        "load" => load,

        // === I/O ===
        "print" => print,
        "input" => input,

        // === Constructors ===
        "list" => lists::list,
        "tuple" => lists::tuple,
        "dict" => lists::dict,

        // === List words ===
        "list_append" => lists::append,
        "list_pop" => lists::pop,
        "list_pop_at" => lists::pop_at,
        "list_insert" => lists::insert,
        "list_remove" => lists::remove,
        "list_extend" => lists::extend,
        "list_index" => lists::index,
        "list_count" => lists::count,
        "list_sort" => lists::sort,
        "list_reverse" => lists::reverse,
        "list_copy" => lists::copy,
        "list_clear" => lists::clear,
        "list_len" => lists::len,
        "list_get" => lists::get,
        "list_set" => lists::set,
        "list_slice" => lists::slice,

        // === Dict words ===
        "dict_keys" => lists::dict_keys,
        "dict_values" => lists::dict_values,
        "dict_items" => lists::dict_items,
        "dict_get" => lists::dict_get,
        "dict_set" => lists::dict_set,
        "dict_pop" => lists::dict_pop,

        // === String words ===
        "str_upper" => strings::upper,
        "str_lower" => strings::lower,
        "str_capitalize" => strings::capitalize,
        "str_strip" => strings::strip,
        "str_find" => strings::find,
        "str_replace" => strings::replace,
        "str_split" => strings::split,
        "str_split_on" => strings::split_on,
        "str_join" => strings::join,
        "str_startswith" => strings::startswith,
        "str_endswith" => strings::endswith,
        "str_isdigit" => strings::isdigit,
        "str_isalpha" => strings::isalpha,

        // === Low-level memory (not supported) ===
        "alloc" => mem_alloc,
        "free" => mem_free,
        "read" => mem_read,
        "write" => mem_write,

        _ => return None,
    })
}

// === Stack shuffling ===

fn dup(vm: &mut Vm) -> EvalResult<()> {
    vm.require(1)?;
    let top = vm.stack[vm.stack.len() - 1].clone();
    vm.push(top);
    Ok(())
}

fn swap(vm: &mut Vm) -> EvalResult<()> {
    vm.require(2)?;
    let len = vm.stack.len();
    vm.stack.swap(len - 1, len - 2);
    Ok(())
}

fn drop_top(vm: &mut Vm) -> EvalResult<()> {
    vm.pop()?;
    Ok(())
}

fn over(vm: &mut Vm) -> EvalResult<()> {
    vm.require(2)?;
    let second = vm.stack[vm.stack.len() - 2].clone();
    vm.push(second);
    Ok(())
}

fn rot(vm: &mut Vm) -> EvalResult<()> {
    vm.require(3)?;
    let at = vm.stack.len() - 3;
    vm.stack[at..].rotate_left(1);
    Ok(())
}

// === Arithmetic ===

fn binary_operands(vm: &mut Vm) -> EvalResult<(Value, Value)> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    Ok((a, b))
}

fn numeric_mismatch(a: &Value, b: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected: "two numbers".to_string(),
        actual: format!("{} and {}", a.type_name(), b.type_name()),
    }
}

fn add(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    let result = match (&a, &b) {
        (Value::Str(x), Value::Str(y)) => {
            let mut s = x.clone();
            s.push_str(y);
            Value::Str(s)
        }
        _ => match numeric_pair(&a, &b) {
            Some(NumPair::Int(x, y)) => Value::Int(x.wrapping_add(y)),
            Some(NumPair::Float(x, y)) => Value::Float(x + y),
            None => {
                return Err(EvalError::TypeMismatch {
                    expected: "two numbers or two strings".to_string(),
                    actual: format!("{} and {}", a.type_name(), b.type_name()),
                })
            }
        },
    };
    vm.push(result);
    Ok(())
}

fn sub(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    let result = match numeric_pair(&a, &b) {
        Some(NumPair::Int(x, y)) => Value::Int(x.wrapping_sub(y)),
        Some(NumPair::Float(x, y)) => Value::Float(x - y),
        None => return Err(numeric_mismatch(&a, &b)),
    };
    vm.push(result);
    Ok(())
}

fn mul(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    let result = match numeric_pair(&a, &b) {
        Some(NumPair::Int(x, y)) => Value::Int(x.wrapping_mul(y)),
        Some(NumPair::Float(x, y)) => Value::Float(x * y),
        None => return Err(numeric_mismatch(&a, &b)),
    };
    vm.push(result);
    Ok(())
}

fn div(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let result = match numeric_pair(&a, &b) {
        // Integer division truncates toward zero.
        Some(NumPair::Int(x, y)) => Value::Int(x.wrapping_div(y)),
        Some(NumPair::Float(x, y)) => Value::Float(x / y),
        None => return Err(numeric_mismatch(&a, &b)),
    };
    vm.push(result);
    Ok(())
}

fn modulo(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let result = match numeric_pair(&a, &b) {
        // The remainder takes the sign of the dividend.
        Some(NumPair::Int(x, y)) => Value::Int(x.wrapping_rem(y)),
        Some(NumPair::Float(x, y)) => Value::Float(x % y),
        None => return Err(numeric_mismatch(&a, &b)),
    };
    vm.push(result);
    Ok(())
}

// === Comparison ===

fn eq(vm: &mut Vm) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    vm.push(Value::Bool(a == b));
    Ok(())
}

fn ordered(vm: &mut Vm, wanted: Ordering) -> EvalResult<()> {
    let (a, b) = binary_operands(vm)?;
    match compare(&a, &b) {
        Some(ordering) => {
            vm.push(Value::Bool(ordering == wanted));
            Ok(())
        }
        None => Err(EvalError::TypeMismatch {
            expected: "two numbers or two strings".to_string(),
            actual: format!("{} and {}", a.type_name(), b.type_name()),
        }),
    }
}

fn gt(vm: &mut Vm) -> EvalResult<()> {
    ordered(vm, Ordering::Greater)
}

fn lt(vm: &mut Vm) -> EvalResult<()> {
    ordered(vm, Ordering::Less)
}

// === Conversion ===

fn to_int(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    let n = match &value {
        Value::Int(n) => *n,
        Value::Float(x) => *x as i64,
        Value::Bool(b) => *b as i64,
        Value::Str(s) => s.trim().parse().map_err(|_| EvalError::Conversion {
            text: s.clone(),
            target: "Int",
        })?,
        other => return Err(type_mismatch("Int, Float, Bool, or Str", other)),
    };
    vm.push(Value::Int(n));
    Ok(())
}

fn to_float(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    let x = match &value {
        Value::Int(n) => *n as f64,
        Value::Float(x) => *x,
        Value::Bool(b) => *b as i64 as f64,
        Value::Str(s) => s.trim().parse().map_err(|_| EvalError::Conversion {
            text: s.clone(),
            target: "Float",
        })?,
        other => return Err(type_mismatch("Int, Float, Bool, or Str", other)),
    };
    vm.push(Value::Float(x));
    Ok(())
}

fn to_str(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    vm.push(Value::Str(value.print_form()));
    Ok(())
}

fn to_bool(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    vm.push(Value::Bool(value.is_truthy()));
    Ok(())
}

// === Constants ===

fn push_true(vm: &mut Vm) -> EvalResult<()> {
    vm.push(Value::Bool(true));
    Ok(())
}

fn push_false(vm: &mut Vm) -> EvalResult<()> {
    vm.push(Value::Bool(false));
    Ok(())
}

fn push_none(vm: &mut Vm) -> EvalResult<()> {
    vm.push(Value::None);
    Ok(())
}

// === Variables ===

fn store(vm: &mut Vm) -> EvalResult<()> {
    let name = vm.pop_str()?;
    let value = vm.pop()?;
    vm.vars.insert(name, value);
    Ok(())
}

fn load(vm: &mut Vm) -> EvalResult<()> {
    let name = vm.pop_str()?;
    match vm.vars.get(&name) {
        Some(value) => {
            let value = value.clone();
            vm.push(value);
            Ok(())
        }
        None => Err(EvalError::UnboundVariable(name)),
    }
}

// === I/O ===

fn print(vm: &mut Vm) -> EvalResult<()> {
    let value = vm.pop()?;
    let line = value.print_form();
    vm.write_line(&line)
}

fn input(vm: &mut Vm) -> EvalResult<()> {
    let line = vm.read_line()?;
    vm.push(Value::Str(line));
    Ok(())
}

// === Low-level memory words ===
//
// Reserved but unimplemented: the words exist so programs fail with a clear
// message rather than "unknown word".

fn mem_alloc(_vm: &mut Vm) -> EvalResult<()> {
    Err(EvalError::Unsupported("alloc"))
}

fn mem_free(_vm: &mut Vm) -> EvalResult<()> {
    Err(EvalError::Unsupported("free"))
}

fn mem_read(_vm: &mut Vm) -> EvalResult<()> {
    Err(EvalError::Unsupported("read"))
}

fn mem_write(_vm: &mut Vm) -> EvalResult<()> {
    Err(EvalError::Unsupported("write"))
}
