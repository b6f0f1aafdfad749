//! Wire protocol: the `{success, message, payload}` response envelope,
//! item/delivery encodings, and request-body decoding for both transports
//! (form-encoded over HTTP, JSON text frames over WebSocket).

mod envelope;
mod request;

pub use envelope::{Envelope, FAILURE_FALLBACK, ItemBody, delivery_body};
pub use request::{FormFields, WaitRequest, WaitRequestError, decode_form};
