//! HTTP endpoints implemented by the x402 facilitator.
//!
//! These are the server-side handlers for processing client-submitted x402
//! payments: the protocol-critical endpoints (`/verify`, `/settle`), the
//! discovery endpoint (`/supported`), and a liveness probe (`/health`).
//!
//! Protocol-level rejections travel inside normal HTTP 200 envelopes with
//! `isValid: false` or `success: false` and a taxonomy reason string; only
//! infrastructure faults (malformed JSON, wrong method, clock failures)
//! escalate to 4xx/5xx.

use axum::http::StatusCode;
use axum::{Extension, Json, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::facilitator::Facilitator;
use crate::facilitator_local::FacilitatorLocal;
use crate::provider_cache::ProviderCache;
use crate::types::{
    ErrorResponse, SettleRequest, SettleResponse, VerifyRequest, VerifyResponse,
};

/// `POST /verify`: Facilitator-side verification of a proposed x402 payment.
///
/// Checks whether a given payment payload satisfies the declared payment
/// requirements, including signature validity, timing, nonce freshness, and
/// fund sufficiency. Responds with a [`VerifyResponse`]; rejections are
/// HTTP 200 with `isValid: false` and the rejection reason.
#[instrument(skip_all)]
pub async fn post_verify(
    Extension(facilitator): Extension<FacilitatorLocal<ProviderCache>>,
    Json(body): Json<VerifyRequest>,
) -> impl IntoResponse {
    match facilitator.verify(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = %error, "Verification failed");
            if error.is_infrastructure() {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("verification failed: {error}"),
                    }),
                )
                    .into_response()
            } else {
                (
                    StatusCode::OK,
                    Json(VerifyResponse::invalid(error.to_string(), error.payer())),
                )
                    .into_response()
            }
        }
    }
}

/// `POST /settle`: Facilitator-side execution of a valid x402 payment on-chain.
///
/// Given a valid [`SettleRequest`], attempts to execute the payment via
/// ERC-3009 `transferWithAuthorization` and returns a [`SettleResponse`] with
/// the transaction hash. Typically called after a successful `/verify` step.
#[instrument(skip_all)]
pub async fn post_settle(
    Extension(facilitator): Extension<FacilitatorLocal<ProviderCache>>,
    Json(body): Json<SettleRequest>,
) -> impl IntoResponse {
    match facilitator.settle(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = %error, "Settlement failed");
            if error.is_infrastructure() {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("settlement failed: {error}"),
                    }),
                )
                    .into_response()
            } else {
                (StatusCode::OK, Json(SettleResponse::failed(error.to_string()))).into_response()
            }
        }
    }
}

/// `GET /supported`: Lists the payment kinds this facilitator can process.
///
/// One entry per configured provider that has a canonical USDC deployment in
/// the chain registry.
#[instrument(skip_all)]
pub async fn get_supported(
    Extension(facilitator): Extension<FacilitatorLocal<ProviderCache>>,
) -> impl IntoResponse {
    match facilitator.supported().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Failed to list supported payment kinds");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to get supported kinds: {error}"),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /health`: Liveness probe.
#[instrument(skip_all)]
pub async fn get_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
