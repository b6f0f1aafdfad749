#![allow(clippy::unwrap_used, dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use hopper_gateway::{auth::AuthGate, server::build_router, state::Registry};

/// Bind a broker endpoint on an ephemeral port and serve it in the
/// background. The registry handle lets tests observe internal counts to
/// sequence otherwise-racy steps.
pub async fn spawn_broker(gate: Option<AuthGate>) -> (SocketAddr, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let app = build_router(Arc::clone(&registry), gate);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, registry)
}

/// Poll until the registry tracks exactly `count` live waiters. Used to
/// sequence subscribe/close steps that the protocol itself never acks.
pub async fn wait_for_waiters(registry: &Registry, count: usize) {
    for _ in 0..200 {
        if registry.waiter_total().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {count} tracked waiters");
}
