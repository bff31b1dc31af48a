//! Members of the library types.
//!
//! - `core_members`: what `Object`, `String`, `Number`, `ArrayList` and
//!   `LinkedHashMap` declare, registered into every registry's catalog.
//! - `default_methods`: library-wide extension methods seeded into a new
//!   registry unless disabled.

mod core_members;
mod default_methods;

pub(crate) use core_members::define_core_members;
pub(crate) use default_methods::default_methods;

use crate::errors::InvokeError;
use crate::Value;

fn text_of<'a>(value: &'a Value, what: &str) -> Result<&'a str, InvokeError> {
    value
        .as_str()
        .ok_or_else(|| InvokeError::raised(format!("{what} expects text, got {value}")))
}

fn items_of<'a>(value: &'a Value, what: &str) -> Result<&'a [Value], InvokeError> {
    value
        .as_list()
        .ok_or_else(|| InvokeError::raised(format!("{what} expects a list, got {value}")))
}

fn index_of(value: &Value, what: &str) -> Result<usize, InvokeError> {
    value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| InvokeError::raised(format!("{what}: invalid index {value}")))
}

fn count_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}
