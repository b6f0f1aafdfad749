use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::task::JoinSet;
use tracing::info;

use hopper_auth::PlaintextAuth;
use hopper_config::{Config, ServerConfig};

use crate::{
    auth::{AuthGate, require_auth},
    http, ws,
    state::Registry,
};

// ── Router assembly ──────────────────────────────────────────────────────────

/// Build the route table for one endpoint. All endpoints share the same
/// registry; an endpoint with an auth gate wraps every route in it,
/// including the WebSocket upgrade.
pub fn build_router(registry: Arc<Registry>, gate: Option<AuthGate>) -> Router {
    let router = Router::new()
        .route(
            "/queues",
            get(http::list_queues)
                .post(http::create_queue)
                .fallback(http::method_not_allowed),
        )
        .route(
            "/queue",
            post(http::queue_info)
                .delete(http::delete_queue)
                .fallback(http::method_not_allowed),
        )
        .route(
            "/take",
            post(http::take_item).fallback(http::method_not_allowed),
        )
        .route(
            "/peek",
            post(http::peek_item).fallback(http::method_not_allowed),
        )
        .route(
            "/put",
            post(http::put_item).fallback(http::method_not_allowed),
        )
        .route(
            "/take/ws",
            get(ws::upgrade).fallback(http::method_not_allowed),
        )
        .fallback(http::not_found)
        .with_state(registry);

    match gate {
        Some(gate) => router.layer(middleware::from_fn_with_state(gate, require_auth)),
        None => router,
    }
}

// ── Startup ──────────────────────────────────────────────────────────────────

/// Bind and serve every configured endpoint until ctrl-c or the first
/// listener failure. Returns only after the registry has been shut down.
pub async fn run(config: &Config, registry: Arc<Registry>) -> anyhow::Result<()> {
    // One verifier per backend, shared by every endpoint naming it.
    let verifiers: HashMap<&str, Arc<PlaintextAuth>> = config
        .authentication
        .iter()
        .map(|(name, backend)| (name.as_str(), Arc::new(PlaintextAuth::new(&backend.file))))
        .collect();

    let mut servers = JoinSet::new();
    for server in &config.servers {
        let gate = server.authentication.as_deref().and_then(|name| {
            verifiers.get(name).map(|verifier| AuthGate {
                verifier: Arc::clone(verifier),
                realm: name.to_string(),
            })
        });
        let app = build_router(Arc::clone(&registry), gate);
        spawn_endpoint(&mut servers, server, app).await?;
    }

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
        Some(finished) = servers.join_next() => {
            match finished {
                Ok(Err(e)) => Err(anyhow::anyhow!("server terminated: {e}")),
                Ok(Ok(())) => Err(anyhow::anyhow!("server terminated unexpectedly")),
                Err(e) => Err(anyhow::anyhow!("server task failed: {e}")),
            }
        }
    };

    servers.abort_all();
    registry.shutdown().await;
    result
}

/// Resolve the bind address and spawn one listener, TLS-wrapped when the
/// endpoint carries security material.
async fn spawn_endpoint(
    servers: &mut JoinSet<std::io::Result<()>>,
    server: &ServerConfig,
    app: Router,
) -> anyhow::Result<()> {
    let addr = resolve(&server.hostname, server.port).await?;

    match &server.security {
        Some(security) => {
            let tls = RustlsConfig::from_pem_file(&security.certificate, &security.privatekey)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load tls material for {addr}: {e}"))?;
            info!(%addr, tls = true, "listening");
            servers.spawn(async move {
                axum_server::bind_rustls(addr, tls)
                    .serve(app.into_make_service())
                    .await
            });
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
            info!(%addr, tls = false, "listening");
            servers.spawn(async move { axum::serve(listener, app).await });
        }
    }

    Ok(())
}

async fn resolve(hostname: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((hostname, port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| anyhow::anyhow!("cannot resolve {hostname}:{port}"))
}
