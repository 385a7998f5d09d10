//! Implementation of the len() builtin function.

use crate::{
    error::{RafError, RafResult},
    value::Value,
};

/// Returns the element count of a string (in characters) or a list.
pub(super) fn builtin_len(args: &[Value]) -> RafResult<Value> {
    let [arg] = args else {
        return Err(RafError::runtime("len() expects exactly 1 argument"));
    };
    match arg {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        other => Err(RafError::runtime(format!(
            "len() is not supported for {}",
            other.type_name()
        ))),
    }
}
