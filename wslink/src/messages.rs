//!
//! Wire message shape (spec §3 "Wire Message (control)") and the fixed
//! method/id-prefix strings the protocol handler matches on (spec §4.5,
//! §6.5).
//!

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

/// `wslink` field value on every message the server emits.
pub const WSLINK_VERSION: &str = "1.0";

/// Method name of an attachment header (spec §4.1 decode side).
pub const ATTACHMENT_METHOD: &str = "wslink.binary.attachment";

/// Method name of the hello/authentication system call.
pub const HELLO_METHOD: &str = "wslink.hello";

/// `id` prefix reserved for system messages (spec §4.5 rule 2).
pub const SYSTEM_ID_PREFIX: &str = "system:";

/// One control frame: a request, a reply, an attachment header, or a
/// publish. Exactly which fields are populated depends on the role the
/// message plays; see spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub wslink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// `error` field of a failure reply (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WireMessage {
    fn base() -> Self {
        WireMessage {
            wslink: WSLINK_VERSION.to_string(),
            id: None,
            method: None,
            args: None,
            kwargs: None,
            result: None,
            error: None,
        }
    }

    pub fn reply_result(id: String, result: Value) -> Self {
        WireMessage {
            id: Some(id),
            result: Some(result),
            ..Self::base()
        }
    }

    pub fn reply_error(id: String, code: ErrorCode, message: &str, data: Option<Value>) -> Self {
        WireMessage {
            id: Some(id),
            error: Some(WireError {
                code: code.0,
                message: message.to_string(),
                data,
            }),
            ..Self::base()
        }
    }

    pub fn attachment_header(keys: Vec<String>) -> Self {
        WireMessage {
            method: Some(ATTACHMENT_METHOD.to_string()),
            args: Some(keys.into_iter().map(Value::String).collect()),
            ..Self::base()
        }
    }

    pub fn publish(topic: String, data: Value) -> Self {
        WireMessage {
            method: Some(topic),
            args: Some(vec![data]),
            ..Self::base()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_request_fields() {
        let text = r#"{"wslink":"1.0","id":"rpc:1","method":"echo.blob","args":["wslink_bin7"]}"#;
        let msg: WireMessage = serde_json::from_str(text).unwrap();
        assert_eq!(msg.wslink, "1.0");
        assert_eq!(msg.id.as_deref(), Some("rpc:1"));
        assert_eq!(msg.method.as_deref(), Some("echo.blob"));
        assert_eq!(msg.args, Some(vec![Value::String("wslink_bin7".into())]));
        assert!(msg.kwargs.is_none());

        let encoded = serde_json::to_string(&msg).unwrap();
        let round_tripped: WireMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(round_tripped.id, msg.id);
        assert_eq!(round_tripped.method, msg.method);
        assert_eq!(round_tripped.args, msg.args);
    }

    #[test]
    fn reply_omits_absent_fields() {
        let msg = WireMessage::reply_result("system:0".to_string(), serde_json::json!({"a": 1}));
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(!encoded.contains("\"error\""));
        assert!(!encoded.contains("\"method\""));
    }
}
