//! Normalization of JSON web services replies into site-keyed results.

pub mod data_result;
pub mod meta_result;

use crate::error::AcisError;
use crate::types::record::Meta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded reply together with the parameters of the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub params: Value,
    pub result: Value,
}

impl Query {
    pub fn new(params: Value, result: Value) -> Self {
        Self { params, result }
    }
}

/// Fails with the server's message when the result object reports an error.
pub(crate) fn check_error(result: &Value) -> Result<(), AcisError> {
    match result.get("error") {
        None => Ok(()),
        Some(Value::String(message)) => Err(AcisError::Result(message.clone())),
        Some(other) => Err(AcisError::Result(other.to_string())),
    }
}

/// Splits a site metadata object into its UID and the remaining attributes.
pub(crate) fn split_uid(meta: &Value) -> Result<(u64, Meta), AcisError> {
    let Value::Object(object) = meta else {
        return Err(AcisError::MalformedResult(format!(
            "site metadata must be an object, got {}",
            meta
        )));
    };
    let mut attributes = object.clone();
    let uid = attributes.remove("uid").ok_or(AcisError::MissingUid)?;
    let uid = match &uid {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AcisError::MalformedResult(format!("uid must be an unsigned integer, got {}", uid)))?;
    Ok((uid, attributes))
}
