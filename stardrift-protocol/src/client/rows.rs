//! Typed extraction from compact array rows. Decoding lives here so
//! the hot-channel messages can be round-tripped in tests and by bots.

use serde_json::Value;

use crate::ProtocolError;

pub(crate) fn as_array<'v>(
    value: &'v Value,
    message_type: &str,
) -> Result<&'v Vec<Value>, ProtocolError> {
    value.as_array().ok_or_else(|| ProtocolError::Invalid {
        message_type: message_type.to_string(),
        reason: "row is not an array".to_string(),
    })
}

pub(crate) fn f64_at(arr: &[Value], idx: usize, message_type: &str) -> Result<f64, ProtocolError> {
    arr.get(idx)
        .and_then(Value::as_f64)
        .ok_or_else(|| bad_index(idx, "number", message_type))
}

pub(crate) fn i64_at(arr: &[Value], idx: usize, message_type: &str) -> Result<i64, ProtocolError> {
    arr.get(idx)
        .and_then(Value::as_i64)
        .ok_or_else(|| bad_index(idx, "integer", message_type))
}

pub(crate) fn u64_at(arr: &[Value], idx: usize, message_type: &str) -> Result<u64, ProtocolError> {
    arr.get(idx)
        .and_then(Value::as_u64)
        .ok_or_else(|| bad_index(idx, "unsigned integer", message_type))
}

pub(crate) fn str_at<'v>(
    arr: &'v [Value],
    idx: usize,
    message_type: &str,
) -> Result<&'v str, ProtocolError> {
    arr.get(idx)
        .and_then(Value::as_str)
        .ok_or_else(|| bad_index(idx, "string", message_type))
}

fn bad_index(idx: usize, expected: &str, message_type: &str) -> ProtocolError {
    ProtocolError::Invalid {
        message_type: message_type.to_string(),
        reason: format!("row index {idx} is not a {expected}"),
    }
}
