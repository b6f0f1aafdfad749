use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use hopper_auth::PlaintextAuth;
use hopper_protocol::Envelope;

/// Per-endpoint authentication handle: the verifier plus the realm
/// announced in challenges (the backend's configured name).
#[derive(Clone)]
pub struct AuthGate {
    pub verifier: Arc<PlaintextAuth>,
    pub realm: String,
}

/// Middleware wrapping every route of an authenticated endpoint, the
/// WebSocket upgrade included. Missing credentials get a 401 with a Basic
/// challenge, rejected credentials a 403; anything else dispatches.
pub async fn require_auth(State(gate): State<AuthGate>, request: Request, next: Next) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(credentials) = header_value else {
        return (
            StatusCode::UNAUTHORIZED,
            [
                (
                    header::WWW_AUTHENTICATE,
                    format!("Basic realm=\"{}\"", gate.realm),
                ),
                (header::CONTENT_TYPE, "application/json".to_string()),
            ],
            Envelope::failure("authentication required").to_json(),
        )
            .into_response();
    };

    if !gate.verifier.verify(credentials) {
        debug!(realm = %gate.realm, "authentication rejected");
        return (
            StatusCode::FORBIDDEN,
            [(header::CONTENT_TYPE, "application/json")],
            Envelope::failure("authentication failed").to_json(),
        )
            .into_response();
    }

    next.run(request).await
}
