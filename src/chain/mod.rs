//! Blockchain-specific providers and the facilitator error taxonomy.
//!
//! A provider bundles everything needed to verify and settle payments on one
//! network: an RPC connection, the chain ID, a pool of relayer signers, and a
//! replay cache for ERC-3009 nonces. The facilitator dispatches to providers
//! through the [`NetworkProvider`] enum; adding a chain family is a variant
//! addition, not a type-hierarchy change.

pub mod evm;
pub mod nonce_store;

use std::time::SystemTimeError;

use crate::facilitator::Facilitator;
use crate::network::Network;
use crate::types::{
    MixedAddress, Scheme, SettleRequest, SettleResponse, SupportedPaymentKindsResponse,
    VerifyRequest, VerifyResponse,
};

/// Errors surfaced by payment verification and settlement.
///
/// Every variant carries the derived payer address when one is known, so the
/// HTTP layer can echo it back in the protocol-level response envelope.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorLocalError {
    /// The network is not supported by this facilitator.
    #[error("network not supported by this facilitator")]
    UnsupportedNetwork(Option<MixedAddress>),
    /// The payload's network does not match the expected network.
    #[error("network mismatch: expected {1}, got {2}")]
    NetworkMismatch(Option<MixedAddress>, Network, Network),
    /// The payload's scheme does not match the expected scheme.
    #[error("scheme mismatch: expected {1}, got {2}")]
    SchemeMismatch(Option<MixedAddress>, Scheme, Scheme),
    /// The `pay_to` recipient in the requirements doesn't match the `to` address in the payload.
    #[error("receiver mismatch: expected {2}, got {1}")]
    ReceiverMismatch(MixedAddress, String, String),
    /// The requirements name an asset outside the operator's whitelist.
    #[error("unsupported asset: {1} (only whitelisted USDC contracts are accepted)")]
    UnsupportedAsset(MixedAddress, String),
    /// The `validAfter`/`validBefore` fields on the authorization are not within bounds.
    #[error("{1}")]
    InvalidTiming(MixedAddress, String),
    /// The authorization nonce was already consumed by an earlier settlement.
    #[error("nonce already used (replay attack detected)")]
    NonceReplay(MixedAddress),
    /// The payload's `value` is not enough to meet the requirements.
    #[error("payment amount less than required")]
    InsufficientValue(MixedAddress),
    /// EIP-712 signature is invalid or recovered to an unexpected signer.
    #[error("invalid signature: {1}")]
    InvalidSignature(MixedAddress, String),
    /// The payer's on-chain balance is insufficient for the payment.
    #[error("payer has insufficient balance")]
    InsufficientFunds(MixedAddress),
    /// A wire field could not be converted into its on-chain representation.
    #[error("decoding error: {0}")]
    DecodingError(String),
    /// Low-level RPC interaction failure (balance probe, broadcast, receipt).
    #[error("contract call failed: {0}")]
    ContractCall(String),
    /// Failed to read the system clock while checking timing.
    #[error("can not read system clock")]
    ClockError(#[source] SystemTimeError),
}

impl FacilitatorLocalError {
    /// The payer derived before the failure, if any.
    pub fn payer(&self) -> Option<MixedAddress> {
        match self {
            FacilitatorLocalError::UnsupportedNetwork(payer)
            | FacilitatorLocalError::NetworkMismatch(payer, _, _)
            | FacilitatorLocalError::SchemeMismatch(payer, _, _) => payer.clone(),
            FacilitatorLocalError::ReceiverMismatch(payer, _, _)
            | FacilitatorLocalError::UnsupportedAsset(payer, _)
            | FacilitatorLocalError::InvalidTiming(payer, _)
            | FacilitatorLocalError::NonceReplay(payer)
            | FacilitatorLocalError::InsufficientValue(payer)
            | FacilitatorLocalError::InvalidSignature(payer, _)
            | FacilitatorLocalError::InsufficientFunds(payer) => Some(payer.clone()),
            FacilitatorLocalError::DecodingError(_)
            | FacilitatorLocalError::ContractCall(_)
            | FacilitatorLocalError::ClockError(_) => None,
        }
    }

    /// Whether the failure is an infrastructure fault rather than a
    /// protocol-level rejection. Infrastructure faults escalate to 5xx;
    /// everything else travels inside a normal HTTP 200 envelope.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, FacilitatorLocalError::ClockError(_))
    }
}

/// Common operations available on all network providers.
pub trait NetworkProviderOps {
    /// Addresses of the relayer signers configured for this provider.
    fn signer_addresses(&self) -> Vec<String>;

    /// The network this provider settles on.
    fn network(&self) -> Network;
}

/// A provider for a single configured network.
///
/// Only the EVM family is implemented. Solana networks are recognized on the
/// wire but never construct a provider, so requests targeting them resolve to
/// [`FacilitatorLocalError::UnsupportedNetwork`] at dispatch.
#[derive(Clone)]
pub enum NetworkProvider {
    Evm(evm::EvmProvider),
}

impl NetworkProviderOps for NetworkProvider {
    fn signer_addresses(&self) -> Vec<String> {
        match self {
            NetworkProvider::Evm(provider) => provider.signer_addresses(),
        }
    }

    fn network(&self) -> Network {
        match self {
            NetworkProvider::Evm(provider) => provider.network(),
        }
    }
}

impl Facilitator for NetworkProvider {
    type Error = FacilitatorLocalError;

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        match self {
            NetworkProvider::Evm(provider) => provider.verify(request).await,
        }
    }

    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        match self {
            NetworkProvider::Evm(provider) => provider.settle(request).await,
        }
    }

    async fn supported(&self) -> Result<SupportedPaymentKindsResponse, Self::Error> {
        match self {
            NetworkProvider::Evm(provider) => provider.supported().await,
        }
    }
}
