use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use hopper_protocol::{Envelope, FormFields, ItemBody, decode_form};
use hopper_queue::Item;

use crate::state::{QueueLookupError, Registry};

// ── Envelope responses ───────────────────────────────────────────────────────

fn reply(status: StatusCode, envelope: &Envelope) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        envelope.to_json(),
    )
        .into_response()
}

fn success(payload: Value) -> Response {
    reply(StatusCode::OK, &Envelope::success(payload))
}

fn error(status: StatusCode, message: &str) -> Response {
    reply(status, &Envelope::failure(message))
}

fn lookup_error(err: QueueLookupError) -> Response {
    let status = match err {
        QueueLookupError::InvalidId => StatusCode::BAD_REQUEST,
        QueueLookupError::NotFound => StatusCode::NOT_FOUND,
    };
    error(status, &err.to_string())
}

fn encode_item(item: Option<&Arc<Item>>) -> Value {
    match item {
        Some(item) => {
            let body = ItemBody::new(item.key.as_deref(), &item.value);
            serde_json::to_value(&body).unwrap_or(Value::Null)
        }
        None => Value::Null,
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// `GET /queues` — list queue ids in creation order.
pub async fn list_queues(State(registry): State<Arc<Registry>>) -> Response {
    let ids = registry.list().await;
    success(Value::Array(ids.into_iter().map(Value::String).collect()))
}

/// `POST /queues` — create a queue; `name` optional.
pub async fn create_queue(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let fields = decode_form(&body);
    match registry.create(fields.name.as_deref()).await {
        Ok(id) => success(Value::String(id)),
        Err(err) => lookup_error(err),
    }
}

/// `POST /queue` — describe a queue; `name` required.
pub async fn queue_info(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let fields = decode_form(&body);
    let Some(name) = fields.name.as_deref() else {
        return lookup_error(QueueLookupError::NotFound);
    };
    match registry.find(name).await {
        Ok(id) => success(serde_json::json!({ "name": id })),
        Err(err) => lookup_error(err),
    }
}

/// `DELETE /queue` — delete a queue; `name` required.
pub async fn delete_queue(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let fields = decode_form(&body);
    let Some(name) = fields.name.as_deref() else {
        return lookup_error(QueueLookupError::NotFound);
    };
    match registry.delete(name).await {
        Ok(()) => success(Value::Null),
        Err(err) => lookup_error(err),
    }
}

/// `POST /take` — consume the first matching item; payload is the item or
/// null when nothing matches.
pub async fn take_item(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let (name, fields) = match required_name(&body) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    match registry.take(&name, fields.key.as_deref()).await {
        Ok(item) => success(encode_item(item.as_ref())),
        Err(err) => lookup_error(err),
    }
}

/// `POST /peek` — like take, without consuming. The returned `Arc` clone
/// pins the item's data across encoding even if a concurrent take detaches
/// it; the clone drops once the payload is built.
pub async fn peek_item(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let (name, fields) = match required_name(&body) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    match registry.peek(&name, fields.key.as_deref()).await {
        Ok(item) => success(encode_item(item.as_ref())),
        Err(err) => lookup_error(err),
    }
}

/// `POST /put` — publish an item; `value` required, `key` optional.
pub async fn put_item(State(registry): State<Arc<Registry>>, body: Bytes) -> Response {
    let (name, fields) = match required_name(&body) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    let Some(value) = fields.value else {
        return error(StatusCode::BAD_REQUEST, "missing parameter 'value'");
    };
    match registry.put(&name, fields.key, value).await {
        Ok(_) => success(Value::Null),
        Err(err) => lookup_error(err),
    }
}

/// Wrong method on a known path.
pub async fn method_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "method not supported")
}

/// Unknown path.
pub async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "no such endpoint")
}

fn required_name(body: &Bytes) -> Result<(String, FormFields), Response> {
    let fields = decode_form(body);
    match fields.name.clone() {
        Some(name) => Ok((name, fields)),
        None => Err(lookup_error(QueueLookupError::NotFound)),
    }
}
