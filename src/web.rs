use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::OnTymError;
use crate::api;
use crate::api::error::render_layer_rejection;
use crate::config::ServerConfig;
use crate::state::SharedState;

async fn not_found() -> OnTymError {
    OnTymError::not_found("Route")
}

/// The full application: API routes, static fallback and middleware
pub fn app(state: SharedState) -> Router {
    let server = state.config.server.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = api::router(state);
    let router = match &server.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(Duration::from_secs(u64::from(
                    server.request_timeout_seconds,
                ))))
                .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(server.body_limit_bytes)),
        )
        .layer(middleware::map_response(render_layer_rejection))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

async fn resolve(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    let target = format!("{}:{}", server.host, server.port);
    tokio::net::lookup_host(&target)
        .await
        .with_context(|| format!("Failed to resolve {target}"))?
        .next()
        .with_context(|| format!("No address for {target}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Serve until a shutdown signal arrives
pub async fn run(state: SharedState) -> anyhow::Result<()> {
    let server = state.config.server.clone();
    let addr = resolve(&server).await?;
    let app = app(state);

    match server.tls.as_ref().and_then(|tls| tls.cert_path.clone().zip(tls.key_path.clone())) {
        Some((cert, key)) => serve_tls(app, addr, &cert, &key).await,
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!("Web server running at http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")
        }
    }
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: SocketAddr, cert: &str, key: &str) -> anyhow::Result<()> {
    use axum_server::Handle;
    use axum_server::tls_rustls::RustlsConfig;

    const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} / key {key}"))?;

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("Server error")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_app: Router, _addr: SocketAddr, _cert: &str, _key: &str) -> anyhow::Result<()> {
    anyhow::bail!("TLS is configured but this build has the `tls` feature disabled")
}
