//! Per-endpoint request schemas
//!
//! Each endpoint declares which top-level fields must be present and which
//! error to report when they are not. A field counts as present when it is
//! truthy: not null, not `false`, not `0`, not an empty string.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::types::RelayError;

/// Required-field check for one endpoint
pub struct RequestSchema {
    pub required: &'static [&'static str],
    missing: fn() -> RelayError,
}

pub const RECORD_EVENT_SCHEMA: RequestSchema = RequestSchema {
    required: &["event", "extensionId"],
    missing: missing_parameter,
};

pub const PROXY_SCHEMA: RequestSchema = RequestSchema {
    required: &["endpoint", "data"],
    missing: invalid_request,
};

pub const VERIFY_SCHEMA: RequestSchema = RequestSchema {
    required: &["extensionId", "installationId"],
    missing: missing_parameter,
};

fn missing_parameter() -> RelayError {
    RelayError::MissingParameter
}

fn invalid_request() -> RelayError {
    RelayError::InvalidRequest
}

impl RequestSchema {
    /// Check required fields, then decode into the endpoint's request type
    ///
    /// A required field of the wrong JSON type is reported the same way as a
    /// missing one.
    pub fn parse<T: DeserializeOwned>(&self, body: Map<String, Value>) -> Result<T, RelayError> {
        if !self
            .required
            .iter()
            .all(|field| body.get(*field).is_some_and(is_present))
        {
            return Err((self.missing)());
        }

        serde_json::from_value(Value::Object(body)).map_err(|_| (self.missing)())
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
