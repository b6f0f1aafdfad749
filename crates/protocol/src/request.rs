use serde::Deserialize;

// ── HTTP form bodies ─────────────────────────────────────────────────────────

/// Fields recognized in `application/x-www-form-urlencoded` request bodies.
/// Unknown fields are ignored; repeated fields keep the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    /// Queue id in its 36-character textual form.
    pub name: Option<String>,
    /// Optional match key.
    pub key: Option<String>,
    /// Item value; required for put only.
    pub value: Option<String>,
}

/// Decode a form-encoded body. Tolerant by construction: anything that is
/// not a recognized `k=v` pair is skipped rather than rejected.
pub fn decode_form(body: &[u8]) -> FormFields {
    let mut fields = FormFields::default();
    for (k, v) in url::form_urlencoded::parse(body) {
        match k.as_ref() {
            "name" if fields.name.is_none() => fields.name = Some(v.into_owned()),
            "key" if fields.key.is_none() => fields.key = Some(v.into_owned()),
            "value" if fields.value.is_none() => fields.value = Some(v.into_owned()),
            _ => {}
        }
    }
    fields
}

// ── WebSocket subscription messages ──────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WaitRequestError {
    #[error("failed to read message")]
    Malformed,
    #[error("no identifier")]
    MissingIdentifier,
    #[error("no queue")]
    MissingQueue,
}

/// A subscription request sent as a WebSocket text frame:
/// `{"identifier": ..., "queue": ..., "key": ...?}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WaitRequest {
    pub identifier: String,
    pub queue: String,
    #[serde(default)]
    pub key: Option<String>,
}

impl WaitRequest {
    /// Parse a text frame, distinguishing the missing-field cases so the
    /// error envelope can name what was absent.
    pub fn parse(text: &str) -> Result<Self, WaitRequestError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| WaitRequestError::Malformed)?;
        if !value.is_object() {
            return Err(WaitRequestError::Malformed);
        }
        if value.get("identifier").and_then(|v| v.as_str()).is_none() {
            return Err(WaitRequestError::MissingIdentifier);
        }
        if value.get("queue").and_then(|v| v.as_str()).is_none() {
            return Err(WaitRequestError::MissingQueue);
        }
        serde_json::from_value(value).map_err(|_| WaitRequestError::Malformed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
