// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque task arguments.
//!
//! Arguments travel as a generic [`Value`] (null, bool, number, string,
//! list, map). Executors decode them into a concrete shape when they run;
//! schema validation is an optional [`ArgsValidator`] hook.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

pub use serde_json::Value;

/// Arguments did not match the shape an executor expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Dotted path of the offending field, when known.
    pub field: Option<String>,
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { field: None, message: message.into() }
    }

    pub fn at(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: Some(field.into()), message: message.into() }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "invalid arguments at `{}`: {}", field, self.message),
            None => write!(f, "invalid arguments: {}", self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Convert any serializable value into the generic argument value.
///
/// Structs become maps, sequences become lists, and `Option`, `Box` and
/// references are transparently dereferenced.
pub fn to_value<T: Serialize + ?Sized>(args: &T) -> Result<Value, DecodeError> {
    serde_path_to_error::serialize(args, serde_json::value::Serializer).map_err(path_error)
}

/// Decode a generic argument value into a concrete shape.
///
/// Failures name the dotted path of the offending field, e.g. `inner.tags`.
pub fn decode<T: DeserializeOwned>(args: &Value) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(args).map_err(path_error)
}

fn path_error(e: serde_path_to_error::Error<serde_json::Error>) -> DecodeError {
    // The root path renders as ".".
    let field = e.path().to_string();
    let message = e.into_inner().to_string();
    match field.as_str() {
        "." => DecodeError::new(message),
        _ => DecodeError::at(field, message),
    }
}

/// Optional validation applied to raw arguments before decoding.
pub trait ArgsValidator: Send + Sync {
    fn validate(&self, args: &Value) -> Result<(), DecodeError>;
}

impl<F> ArgsValidator for F
where
    F: Fn(&Value) -> Result<(), DecodeError> + Send + Sync,
{
    fn validate(&self, args: &Value) -> Result<(), DecodeError> {
        self(args)
    }
}

/// Validator requiring the arguments to be a map containing `fields`.
pub struct RequiredFields(pub Vec<String>);

impl ArgsValidator for RequiredFields {
    fn validate(&self, args: &Value) -> Result<(), DecodeError> {
        let map = args
            .as_object()
            .ok_or_else(|| DecodeError::new(format!("expected a map, got {}", kind(args))))?;
        for field in &self.0 {
            if !map.contains_key(field) {
                return Err(DecodeError::at(field, "missing required field"));
            }
        }
        Ok(())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
