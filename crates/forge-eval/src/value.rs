//! Runtime values for Forge.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a mutable list. Two stack slots or store bindings holding
/// the same handle alias the same container.
pub type ListHandle = Rc<RefCell<Vec<Value>>>;

/// Shared handle to a mutable, insertion-ordered dict with string keys.
pub type DictHandle = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value in Forge.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Immutable string.
    Str(String),
    /// Mutable list, shared by handle.
    List(ListHandle),
    /// Mutable dict with Str keys, shared by handle, insertion-ordered.
    Dict(DictHandle),
    /// Immutable group of values.
    Tuple(Rc<Vec<Value>>),
    /// The unit value.
    None,
}

impl Value {
    /// Create an Int value.
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    /// Create a Float value.
    pub fn float(x: f64) -> Self {
        Value::Float(x)
    }

    /// Create a Bool value.
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create a Str value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create a List value with a fresh handle.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Create a Dict value with a fresh handle.
    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// Create a Tuple value.
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    /// Return a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Dict(_) => "Dict",
            Value::Tuple(_) => "Tuple",
            Value::None => "None",
        }
    }

    /// Check if this value is "truthy" for `if`/`while` conditions: Bool is
    /// itself, numbers are nonzero, containers and strings are nonempty,
    /// None is false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::None => false,
        }
    }

    /// Check if this value is numerically zero (Int or Float).
    pub fn is_zero(&self) -> bool {
        matches!(self, Value::Int(0)) || matches!(self, Value::Float(x) if *x == 0.0)
    }

    /// The top-level printed form: like `Display`, except strings print raw,
    /// without surrounding quotes. This is what `print` writes and what the
    /// `str` word produces.
    pub fn print_form(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Promote a numeric pair to a common type.
pub enum NumPair {
    Int(i64, i64),
    Float(f64, f64),
}

/// Promote two numeric values: two Ints stay Int, any Float makes both
/// Float. Returns None if either operand is not a number.
pub fn numeric_pair(a: &Value, b: &Value) -> Option<NumPair> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(NumPair::Int(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some(NumPair::Float(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some(NumPair::Float(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some(NumPair::Float(*a, *b)),
        _ => None,
    }
}

/// Order two values, if they are comparable: numbers compare numerically and
/// strings lexicographically by scalar; everything else has no order.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match numeric_pair(a, b)? {
            NumPair::Int(a, b) => Some(a.cmp(&b)),
            NumPair::Float(a, b) => a.partial_cmp(&b),
        },
    }
}

impl PartialEq for Value {
    /// Structural equality: Int and Float compare numerically, containers
    /// element-wise (Dict ignoring order), and mismatched types are simply
    /// unequal, never an error.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v == w))
            }
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::None, Value::None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The nested display form used inside containers: strings are quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => fmt_float(f, *x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Tuple(t) => {
                write!(f, "(")?;
                for (i, v) in t.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::None => write!(f, "none"),
        }
    }
}

/// Format a float so that finite values always carry a decimal point.
fn fmt_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "nan")
    } else {
        // Debug formatting is the shortest round-trip repr and keeps a
        // trailing `.0` on whole numbers; infinities print as `inf`/`-inf`.
        write!(f, "{:?}", x)
    }
}
