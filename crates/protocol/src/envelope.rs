use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Emitted verbatim when the envelope itself cannot be serialized. The
/// client always receives a syntactically valid envelope, even when the
/// codec is the thing that failed.
pub const FAILURE_FALLBACK: &str = "{\"success\": false, \"message\": \"cannot describe error\"}";

// ── Response envelope ────────────────────────────────────────────────────────

/// Uniform response body for every HTTP reply and WebSocket frame.
///
/// Success carries `message: null` and a `payload` (which may itself be
/// JSON null, e.g. a take on an empty queue). Failure carries a short
/// human-readable `message` and omits `payload` entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Serialize, falling back to the fixed failure literal if encoding
    /// the envelope fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| FAILURE_FALLBACK.to_string())
    }
}

// ── Item encoding ────────────────────────────────────────────────────────────

/// Wire form of an item: `{"key": string|null, "value": string}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemBody {
    pub key: Option<String>,
    pub value: String,
}

impl ItemBody {
    pub fn new(key: Option<&str>, value: &str) -> Self {
        Self {
            key: key.map(str::to_string),
            value: value.to_string(),
        }
    }
}

/// Wire form of an asynchronous delivery:
/// `{"id": <subscription identifier>, "item": <item>}`.
pub fn delivery_body(identifier: &str, item: &ItemBody) -> Value {
    serde_json::json!({
        "id": identifier,
        "item": item,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
