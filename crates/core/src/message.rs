//! Control messages posted by the hosted application.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A control message, e.g. `{"type": "SKIP_WAITING"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker now instead of waiting for every client to go away.
    SkipWaiting,
    /// Delete every cache store.
    ClearCache,
}

impl ControlMessage {
    /// Parse a message from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for malformed JSON or an unknown `type`.
    pub fn parse(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("invalid control message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_messages() {
        assert_eq!(ControlMessage::parse(r#"{"type":"SKIP_WAITING"}"#).unwrap(), ControlMessage::SkipWaiting);
        assert_eq!(ControlMessage::parse(r#"{"type":"CLEAR_CACHE"}"#).unwrap(), ControlMessage::ClearCache);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let msg = ControlMessage::parse(r#"{"type":"CLEAR_CACHE","from":"settings"}"#).unwrap();
        assert_eq!(msg, ControlMessage::ClearCache);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = ControlMessage::parse(r#"{"type":"RELOAD"}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_type_rejected() {
        assert!(ControlMessage::parse("{}").is_err());
        assert!(ControlMessage::parse("not json").is_err());
    }

    #[test]
    fn test_serializes_to_wire_form() {
        let json = serde_json::to_string(&ControlMessage::SkipWaiting).unwrap();
        assert_eq!(json, r#"{"type":"SKIP_WAITING"}"#);
    }
}
