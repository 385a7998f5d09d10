//! Implementation of the print() builtin function.

use std::borrow::Cow;

use crate::{error::RafResult, io::PrintWriter, value::Value};

/// Prints the arguments separated by a single space, followed by a newline,
/// and returns `none`.
pub(super) fn builtin_print(args: &[Value], print: &mut impl PrintWriter) -> RafResult<Value> {
    let mut first = true;
    for value in args {
        if first {
            first = false;
        } else {
            print.stdout_push(' ')?;
        }
        print.stdout_write(Cow::Owned(value.to_string()))?;
    }
    print.stdout_push('\n')?;
    Ok(Value::None)
}
