//! Core implementation of an [x402 protocol](https://www.x402.org) payment facilitator.
//!
//! The facilitator is a stateless network service that, on behalf of
//! payment-gated HTTP endpoints and paying clients, verifies client-signed
//! ERC-3009 `transferWithAuthorization` payment authorizations and settles
//! them by relaying the token transfer on an EVM chain. The facilitator holds
//! no user funds; it holds operator-owned signing keys used only to pay gas
//! when relaying.
//!
//! # Overview
//!
//! The x402 protocol enables HTTP-native payments using the
//! `402 Payment Required` status code. A merchant declares
//! [`PaymentRequirements`](types::PaymentRequirements), the client responds
//! with a signed [`PaymentPayload`](types::PaymentPayload), and the
//! facilitator answers two questions: does this authorization satisfy the
//! requirements (`/verify`), and, on request, move the funds (`/settle`).
//!
//! # Modules
//!
//! - [`chain`] — Per-network providers: the EVM verify/settle pipelines and
//!   the nonce replay cache.
//! - [`facilitator`] — The [`Facilitator`](facilitator::Facilitator) trait for
//!   payment verification and settlement.
//! - [`facilitator_local`] — The network-agnostic dispatcher over configured
//!   providers.
//! - [`handlers`] — HTTP endpoint handlers (`/verify`, `/settle`,
//!   `/supported`, `/health`).
//! - [`network`] — Registry of supported networks, chain IDs, and canonical
//!   USDC deployments.
//! - [`provider_cache`] — Environment-driven provider construction.
//! - [`telemetry`] — Tracing and OpenTelemetry bootstrap.
//! - [`timestamp`] — Unix timestamp type for authorization windows.
//! - [`types`] — Wire types for payloads, requirements, and responses.

pub mod chain;
pub mod facilitator;
pub mod facilitator_local;
pub mod handlers;
pub mod network;
pub mod provider_cache;
pub mod sig_down;
pub mod telemetry;
pub mod timestamp;
pub mod types;
