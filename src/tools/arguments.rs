//! Typed access to tool call arguments.

use crate::error::{RelayError, Result};

/// Parsed tool call arguments.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the JSON-encoded argument string sent with a tool call.
    ///
    /// An empty string is an empty object.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        serde_json::from_str(trimmed).map(Self::new).map_err(|e| {
            RelayError::InvalidArgument(format!("Failed to parse arguments: {e}"))
        })
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::InvalidArgument(format!("Missing string argument: {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encoded_object() {
        let args = ToolArguments::from_raw(r#"{"command":"status"}"#).unwrap();
        assert_eq!(args.get_str("command").unwrap(), "status");
        assert!(matches!(
            args.get_str("missing"),
            Err(RelayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_string_is_empty_object() {
        let args = ToolArguments::from_raw("  ").unwrap();
        assert_eq!(args.raw(), &serde_json::json!({}));
    }

    #[test]
    fn invalid_json_is_invalid_argument() {
        let err = ToolArguments::from_raw("{command:").unwrap_err();
        assert!(matches!(err, RelayError::InvalidArgument(_)));
    }
}
