use std::cmp::Ordering;
use std::fmt;

use cubesheet_core::CellKey;

use crate::attributes::AttrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    Value,
    Index,
    ZeroDivision,
    Circular,
    Recursion,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Value => "ValueError",
            ErrorKind::Index => "IndexError",
            ErrorKind::ZeroDivision => "ZeroDivisionError",
            ErrorKind::Circular => "CircularReferenceError",
            ErrorKind::Recursion => "RecursionError",
        }
    }
}

/// An evaluation failure. Cells hold these as values.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn name(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("name '{}' is not defined", name))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, message)
    }

    pub fn zero_division() -> Self {
        Self::new(ErrorKind::ZeroDivision, "division by zero")
    }

    /// The cell at `key` was reached again while it was still being evaluated.
    pub fn circular(key: CellKey) -> Self {
        Self::new(ErrorKind::Circular, format!("circular reference at cell {}", key))
    }

    pub fn recursion(depth: usize) -> Self {
        Self::new(
            ErrorKind::Recursion,
            format!("maximum evaluation depth {} exceeded", depth),
        )
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl std::error::Error for EvalError {}

/// Result of evaluating an expression or a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// The grid itself, subscriptable with `[row, col, table]`.
    Grid,
    Error(EvalError),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Grid => "grid",
            Value::Error(_) => "error",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Truth value: zero, empty and None are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Grid => true,
            Value::Error(_) => false,
        }
    }

    /// Numeric view for arithmetic. Bools count as 0/1.
    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    /// Quoted form, used for strings inside lists.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }

    /// Ordering between comparable values; None for mixed types and NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return match (a, b) {
                (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
                _ => a.as_f64().partial_cmp(&b.as_f64()),
            };
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Equality across numeric types (1 == 1.0 == True).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => match (a, b) {
                (Number::Int(x), Number::Int(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            _ => match (self, other) {
                (Value::List(a), Value::List(b)) => {
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
                }
                _ => self == other,
            },
        }
    }
}

/// Int or float operand after bool promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(n) => Value::Int(n),
            Number::Float(n) => Value::Float(n),
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            Value::Grid => write!(f, "<grid>"),
            Value::Error(err) => write!(f, "{}", err),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<EvalError> for Value {
    fn from(err: EvalError) -> Self {
        Value::Error(err)
    }
}

impl From<AttrValue> for Value {
    fn from(attr: AttrValue) -> Self {
        match attr {
            AttrValue::Bool(b) => Value::Bool(b),
            AttrValue::Int(n) => Value::Int(n),
            AttrValue::Float(n) => Value::Float(n),
            AttrValue::Text(s) => Value::Str(s),
        }
    }
}

impl From<&Value> for AttrValue {
    /// Scalars keep their type; anything else is pinned as its text.
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Int(n) => AttrValue::Int(*n),
            Value::Float(n) => AttrValue::Float(*n),
            Value::Str(s) => AttrValue::Text(s.clone()),
            other => AttrValue::Text(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::from("plain").to_string(), "plain");
    }

    #[test]
    fn test_display_list_quotes_strings() {
        let list = Value::List(vec![Value::Int(1), Value::from("a"), Value::None]);
        assert_eq!(list.to_string(), "[1, 'a', None]");
    }

    #[test]
    fn test_error_display() {
        let err = EvalError::name("foo");
        assert_eq!(err.to_string(), "NameError: name 'foo' is not defined");
        let circ = EvalError::circular(CellKey::new(0, 1, 0));
        assert_eq!(circ.kind, ErrorKind::Circular);
        assert!(circ.to_string().contains("(0, 1, 0)"));
    }

    #[test]
    fn test_truthy() {
        assert!(!Value::None.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Float(0.1).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::List(vec![Value::None]).truthy());
    }

    #[test]
    fn test_compare_and_eq_across_numbers() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
        assert!(!Value::from("1").loose_eq(&Value::Int(1)));
    }

    #[test]
    fn test_attr_conversion() {
        assert_eq!(AttrValue::from(&Value::Int(5)), AttrValue::Int(5));
        assert_eq!(AttrValue::from(&Value::None), AttrValue::Text("None".to_string()));
        assert_eq!(Value::from(AttrValue::Float(1.5)), Value::Float(1.5));
    }
}
