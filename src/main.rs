//! x402 facilitator HTTP entrypoint.
//!
//! This binary launches an Axum-based HTTP server that exposes the x402
//! protocol interface for payment verification and settlement on
//! EVM-compatible networks.
//!
//! Endpoints:
//! - `POST /verify` – Verify a payment payload against requirements
//! - `POST /settle` – Settle an accepted payment payload on-chain
//! - `GET /supported` – List supported payment kinds
//! - `GET /health` – Liveness probe
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control the binding address
//! - `EVM_PRIVATE_KEY`/`EVM_PRIVATE_KEYS` and `RPC_URL_*` configure providers
//! - `OTEL_*` variables enable tracing export

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Extension, Router};
use dotenvy::dotenv;
use opentelemetry::trace::Status;
use std::env;
use std::net::SocketAddr;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use x402_facilitator::facilitator_local::FacilitatorLocal;
use x402_facilitator::handlers;
use x402_facilitator::provider_cache::ProviderCache;
use x402_facilitator::sig_down::SigDown;
use x402_facilitator::telemetry::Telemetry;

/// Upper bound on request body size. Payment payloads are a few hundred
/// bytes; anything close to this limit is garbage.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Initializes the x402 facilitator server.
///
/// - Loads `.env` variables.
/// - Initializes tracing and OpenTelemetry.
/// - Connects providers for all networks with configured RPC endpoints.
/// - Starts an Axum HTTP server with the protocol handlers.
///
/// Binds to the address specified by the `HOST` and `PORT` env vars.
#[tokio::main]
async fn main() {
    dotenv().ok();

    let _telemetry = Telemetry::register();

    let provider_cache = match ProviderCache::from_env().await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::error!("Failed to initialize providers: {}", e);
            std::process::exit(1);
        }
    };
    let facilitator = FacilitatorLocal::new(provider_cache);

    let app = Router::new()
        .route("/verify", post(handlers::post_verify))
        .route("/settle", post(handlers::post_settle))
        .route("/supported", get(handlers::get_supported))
        .route("/health", get(handlers::get_health))
        .layer(Extension(facilitator))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        otel.kind = "server",
                        otel.name = %format!("{} {}", request.method(), request.uri()),
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record(
                            "http.status_code",
                            tracing::field::display(response.status().as_u16()),
                        );
                        if response.status().is_success() {
                            span.set_status(Status::Ok);
                        } else {
                            span.set_status(Status::error(
                                response
                                    .status()
                                    .canonical_reason()
                                    .unwrap_or("unknown")
                                    .to_string(),
                            ));
                        }
                        tracing::info!(
                            "status={} elapsed={}ms",
                            response.status().as_u16(),
                            latency.as_millis()
                        );
                    },
                ),
        )
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::AllowOrigin::mirror_request())
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8080);
    let ip = match host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::error!("Invalid HOST {}: {}", host, e);
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::from((ip, port));
    tracing::info!("Starting x402 facilitator at http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let sig_down = match SigDown::try_new() {
        Ok(sig_down) => sig_down,
        Err(e) => {
            tracing::error!("Failed to register signal handlers: {}", e);
            std::process::exit(1);
        }
    };
    let cancellation_token = sig_down.cancellation_token();
    let graceful_shutdown = async move { cancellation_token.cancelled().await };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown)
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
