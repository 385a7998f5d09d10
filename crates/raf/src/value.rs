//! Runtime values and the operator semantics shared by both back ends.
//!
//! The tree-walking evaluator and the VM call the same functions in this
//! module for every arithmetic, comparison, and indexing operation, so the
//! two back ends cannot drift apart on value behavior.

use std::{fmt, rc::Rc};

use crate::{
    builtins::Builtin,
    error::{RafError, RafResult},
    function::Function,
};

/// A runtime value. The variant set is closed.
///
/// Strings and lists are reference-counted so cloning a value is cheap;
/// neither has a mutation operation after construction, so shared ownership
/// is not observable from the language.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Func(Rc<Function>),
    Builtin(Builtin),
}

impl Value {
    /// The mapping from a value to the boolean used by conditions, the
    /// logical operators, and `not`: `none`, `false`, zero of either numeric
    /// kind, the empty string, and the empty list are falsy.
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Func(_) | Self::Builtin(_) => true,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Func(_) => "function",
            Self::Builtin(_) => "builtin",
        }
    }

    /// Source-syntax rendering: like `Display`, except strings come back
    /// double-quoted with escapes. Used for list elements and the
    /// disassembler's constant pool.
    pub(crate) fn repr(&self) -> String {
        match self {
            Self::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for ch in s.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        other => out.push(other),
                    }
                }
                out.push('"');
                out
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(true) => f.write_str("true"),
            Self::Bool(false) => f.write_str("false"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(ryu::Buffer::new().format(*v)),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Self::Func(func) => write!(f, "<fn {}>", func.name),
            Self::Builtin(b) => write!(f, "<builtin {b}>"),
        }
    }
}

/// Value equality: cross-kind compares unequal, except that integers and
/// fractional numbers mix. Lists compare element-wise; functions compare by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y),
            (Self::Func(a), Self::Func(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// Ordering comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

fn unsupported(sym: &str, a: &Value, b: &Value) -> RafError {
    RafError::runtime(format!(
        "unsupported operands for '{sym}': {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

/// Numeric promotion: both operands as `f64` when at least one side is a
/// number and the pair is not integer/integer.
fn float_pair(a: &Value, b: &Value) -> Option<(f64, f64)> {
    let widen = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    Some((widen(a)?, widen(b)?))
}

pub(crate) fn add(a: &Value, b: &Value) -> RafResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or_else(|| RafError::runtime("integer overflow")),
        (Value::Str(x), Value::Str(y)) => {
            let mut s = String::with_capacity(x.len() + y.len());
            s.push_str(x);
            s.push_str(y);
            Ok(Value::Str(s.into()))
        }
        (Value::List(x), Value::List(y)) => {
            let mut items = Vec::with_capacity(x.len() + y.len());
            items.extend(x.iter().cloned());
            items.extend(y.iter().cloned());
            Ok(Value::List(Rc::new(items)))
        }
        _ => match float_pair(a, b) {
            Some((x, y)) => Ok(Value::Float(x + y)),
            None => Err(unsupported("+", a, b)),
        },
    }
}

pub(crate) fn sub(a: &Value, b: &Value) -> RafResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_sub(*y)
            .map(Value::Int)
            .ok_or_else(|| RafError::runtime("integer overflow")),
        _ => match float_pair(a, b) {
            Some((x, y)) => Ok(Value::Float(x - y)),
            None => Err(unsupported("-", a, b)),
        },
    }
}

pub(crate) fn mul(a: &Value, b: &Value) -> RafResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_mul(*y)
            .map(Value::Int)
            .ok_or_else(|| RafError::runtime("integer overflow")),
        _ => match float_pair(a, b) {
            Some((x, y)) => Ok(Value::Float(x * y)),
            None => Err(unsupported("*", a, b)),
        },
    }
}

/// Division always yields a fractional result, never floor-division.
pub(crate) fn div(a: &Value, b: &Value) -> RafResult<Value> {
    match float_pair(a, b) {
        Some((_, y)) if y == 0.0 => Err(RafError::runtime("division by zero")),
        Some((x, y)) => Ok(Value::Float(x / y)),
        None => Err(unsupported("/", a, b)),
    }
}

/// Modulo: integer when both sides are integers, fractional otherwise.
/// The sign of the result follows the dividend.
pub(crate) fn modulo(a: &Value, b: &Value) -> RafResult<Value> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(RafError::runtime("modulo by zero")),
        (Value::Int(x), Value::Int(y)) => x
            .checked_rem(*y)
            .map(Value::Int)
            .ok_or_else(|| RafError::runtime("integer overflow")),
        _ => match float_pair(a, b) {
            Some((_, y)) if y == 0.0 => Err(RafError::runtime("modulo by zero")),
            Some((x, y)) => Ok(Value::Float(x % y)),
            None => Err(unsupported("%", a, b)),
        },
    }
}

pub(crate) fn negate(v: &Value) -> RafResult<Value> {
    match v {
        Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| RafError::runtime("integer overflow")),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(RafError::runtime(format!(
            "unsupported operand for unary '-': {}",
            other.type_name()
        ))),
    }
}

/// Ordering requires like-kinded operands: numbers (mixing allowed) or
/// strings.
pub(crate) fn compare(op: CmpOp, a: &Value, b: &Value) -> RafResult<Value> {
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => match op {
            CmpOp::Lt => x < y,
            CmpOp::Lte => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Gte => x >= y,
        },
        (Value::Str(x), Value::Str(y)) => match op {
            CmpOp::Lt => x < y,
            CmpOp::Lte => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Gte => x >= y,
        },
        _ => match float_pair(a, b) {
            Some((x, y)) => match op {
                CmpOp::Lt => x < y,
                CmpOp::Lte => x <= y,
                CmpOp::Gt => x > y,
                CmpOp::Gte => x >= y,
            },
            None => {
                return Err(RafError::runtime(format!(
                    "'{}' not supported between {} and {}",
                    op.symbol(),
                    a.type_name(),
                    b.type_name()
                )));
            }
        },
    };
    Ok(Value::Bool(result))
}

/// Indexing into a list or a string. The index must be an integer; negative
/// indices are not normalized and report out-of-range.
pub(crate) fn index(target: &Value, idx: &Value) -> RafResult<Value> {
    match target {
        Value::List(items) => {
            let Value::Int(i) = idx else {
                return Err(RafError::runtime("Index must be an integer"));
            };
            usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| RafError::runtime("list index out of range"))
        }
        Value::Str(s) => {
            let Value::Int(i) = idx else {
                return Err(RafError::runtime("Index must be an integer"));
            };
            usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|ch| Value::Str(ch.to_string().into()))
                .ok_or_else(|| RafError::runtime("string index out of range"))
        }
        other => Err(RafError::runtime(format!("{} is not indexable", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn truthiness_table() {
        assert!(!Value::None.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::Str("".into()).truthy());
        assert!(!Value::List(Rc::new(vec![])).truthy());

        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(-1).truthy());
        assert!(Value::Float(0.5).truthy());
        assert!(Value::Str("x".into()).truthy());
        assert!(Value::List(Rc::new(vec![Value::None])).truthy());
    }

    #[test]
    fn display_uses_language_literals() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        let list = Value::List(Rc::new(vec![Value::Int(1), Value::Str("a".into()), Value::Bool(true)]));
        assert_eq!(list.to_string(), "[1, \"a\", true]");
    }

    #[test]
    fn repr_quotes_and_escapes_strings() {
        assert_eq!(Value::Str("a\n\"b\"".into()).repr(), "\"a\\n\\\"b\\\"\"");
        assert_eq!(Value::Int(3).repr(), "3");
    }

    #[test]
    fn equality_mixes_numbers_only() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Str("1".into()), Value::Int(1));
        assert_ne!(Value::None, Value::Bool(false));
    }

    #[test]
    fn list_equality_is_element_wise() {
        let a = Value::List(Rc::new(vec![Value::Int(1), Value::Float(2.0)]));
        let b = Value::List(Rc::new(vec![Value::Float(1.0), Value::Int(2)]));
        assert_eq!(a, b);
    }

    #[test]
    fn division_always_yields_float() {
        assert_eq!(div(&Value::Int(4), &Value::Int(2)).unwrap(), Value::Float(2.0));
        assert_eq!(div(&Value::Int(7), &Value::Int(2)).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(div(&Value::Int(1), &Value::Int(0)).is_err());
        assert!(div(&Value::Float(1.0), &Value::Float(0.0)).is_err());
        assert!(modulo(&Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn modulo_keeps_integer_kind_and_dividend_sign() {
        assert_eq!(modulo(&Value::Int(7), &Value::Int(3)).unwrap(), Value::Int(1));
        assert_eq!(modulo(&Value::Int(-7), &Value::Int(3)).unwrap(), Value::Int(-1));
        assert_eq!(modulo(&Value::Float(7.5), &Value::Int(2)).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn string_and_list_concatenation() {
        assert_eq!(
            add(&Value::Str("ab".into()), &Value::Str("cd".into())).unwrap(),
            Value::Str("abcd".into())
        );
        assert!(add(&Value::Str("ab".into()), &Value::Int(1)).is_err());
        let joined = add(
            &Value::List(Rc::new(vec![Value::Int(1)])),
            &Value::List(Rc::new(vec![Value::Int(2)])),
        )
        .unwrap();
        assert_eq!(joined, Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(add(&Value::Int(i64::MAX), &Value::Int(1)).is_err());
        assert!(negate(&Value::Int(i64::MIN)).is_err());
    }

    #[test]
    fn ordering_requires_like_kinds() {
        assert_eq!(
            compare(CmpOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            compare(CmpOp::Gte, &Value::Str("b".into()), &Value::Str("a".into())).unwrap(),
            Value::Bool(true)
        );
        let err = compare(CmpOp::Lt, &Value::Int(1), &Value::Str("a".into())).unwrap_err();
        assert!(err.message().contains("'<' not supported between int and str"));
    }

    #[test]
    fn indexing_rules() {
        let list = Value::List(Rc::new(vec![Value::Int(10), Value::Int(20)]));
        assert_eq!(index(&list, &Value::Int(1)).unwrap(), Value::Int(20));
        assert!(index(&list, &Value::Int(-1)).is_err());
        assert!(index(&list, &Value::Int(2)).is_err());
        assert!(index(&list, &Value::Float(0.0)).is_err());

        let s = Value::Str("héllo".into());
        assert_eq!(index(&s, &Value::Int(1)).unwrap(), Value::Str("é".into()));
        assert!(index(&Value::Int(1), &Value::Int(0)).is_err());
    }
}
