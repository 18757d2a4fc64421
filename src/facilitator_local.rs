//! Facilitator implementation dispatching x402 payments to per-network providers.
//!
//! [`FacilitatorLocal`] performs the network-agnostic checks that apply to
//! every payment (scheme match, network match, provider availability) and
//! routes the request to the provider configured for the payload's network.
//! The chain-specific validation pipeline lives in the providers themselves.

use tracing::instrument;

use crate::chain::FacilitatorLocalError;
use crate::facilitator::Facilitator;
use crate::network::Network;
use crate::types::{
    MixedAddress, PaymentPayload, PaymentRequirements, SettleRequest, SettleResponse,
    SupportedPaymentKindsResponse, VerifyRequest, VerifyResponse,
};

/// A generic map of configured network providers.
///
/// This allows querying providers by network and enumerating them for
/// `/supported`, and enables testing the dispatcher against stub providers.
pub trait ProviderMap {
    type Value;

    /// Returns the provider for the specified network, if configured.
    fn by_network(&self, network: Network) -> Option<&Self::Value>;

    /// Iterates over all configured providers.
    fn values(&self) -> impl Iterator<Item = &Self::Value> + Send;
}

/// A concrete [`Facilitator`] implementation that verifies and settles x402
/// payments using a network-keyed provider map.
///
/// Generic over the [`ProviderMap`] implementation, which enables testing or
/// customization beyond the default provider cache.
#[derive(Clone)]
pub struct FacilitatorLocal<A> {
    provider_map: A,
}

impl<A> FacilitatorLocal<A> {
    /// Creates a new [`FacilitatorLocal`] with the given provider map.
    pub fn new(provider_map: A) -> Self {
        FacilitatorLocal { provider_map }
    }
}

impl<A> FacilitatorLocal<A>
where
    A: ProviderMap,
{
    /// Cross-cutting checks shared by verification and settlement: the payload
    /// and requirements must agree on scheme and network, and a provider must
    /// exist for that network. The protocol version is enforced by typed
    /// decoding before a request ever reaches this point.
    fn provider_for(
        &self,
        request_payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<&A::Value, FacilitatorLocalError> {
        let payer: MixedAddress = request_payload.payload.authorization.from.into();
        if request_payload.scheme != requirements.scheme {
            return Err(FacilitatorLocalError::SchemeMismatch(
                Some(payer),
                requirements.scheme,
                request_payload.scheme,
            ));
        }
        if request_payload.network != requirements.network {
            return Err(FacilitatorLocalError::NetworkMismatch(
                Some(payer),
                requirements.network,
                request_payload.network,
            ));
        }
        self.provider_map
            .by_network(request_payload.network)
            .ok_or(FacilitatorLocalError::UnsupportedNetwork(Some(payer)))
    }
}

impl<A> Facilitator for FacilitatorLocal<A>
where
    A: ProviderMap + Sync,
    A::Value: Facilitator<Error = FacilitatorLocalError> + Sync,
{
    type Error = FacilitatorLocalError;

    /// Verifies a proposed x402 payment payload against the passed requirements.
    ///
    /// Called from the `/verify` HTTP endpoint on the facilitator. Performs no
    /// state mutation; calling it twice yields identical responses.
    #[instrument(skip_all, err, fields(network = %request.payment_payload.network))]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        let provider =
            self.provider_for(&request.payment_payload, &request.payment_requirements)?;
        provider.verify(request).await
    }

    /// Executes an x402 payment on-chain via the network's provider.
    ///
    /// Called from the `/settle` HTTP endpoint on the facilitator. The provider
    /// re-runs verification internally before broadcasting.
    #[instrument(skip_all, err, fields(network = %request.payment_payload.network))]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        let provider =
            self.provider_for(&request.payment_payload, &request.payment_requirements)?;
        provider.settle(request).await
    }

    /// Enumerates the payment kinds across all configured providers.
    async fn supported(&self) -> Result<SupportedPaymentKindsResponse, Self::Error> {
        let mut kinds = vec![];
        for provider in self.provider_map.values() {
            let supported = provider.supported().await.ok();
            let mut supported_kinds = supported.map(|k| k.kinds).unwrap_or_default();
            kinds.append(&mut supported_kinds);
        }
        Ok(SupportedPaymentKindsResponse { kinds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    use crate::network::USDCDeployment;
    use crate::timestamp::UnixTimestamp;
    use crate::types::{
        EvmAddress, EvmSignature, ExactEvmPayload, ExactEvmPayloadAuthorization,
        HexEncodedNonce, PaymentPayload, PaymentRequirements, Scheme, SupportedPaymentKind,
        TransactionHash, X402Version,
    };

    struct StubProvider {
        network: Network,
    }

    impl Facilitator for StubProvider {
        type Error = FacilitatorLocalError;

        async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
            let payer = request.payment_payload.payload.authorization.from;
            Ok(VerifyResponse::valid(payer.into()))
        }

        async fn settle(&self, _request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
            Ok(SettleResponse {
                success: true,
                transaction_hash: Some(TransactionHash::Evm([0xab; 32])),
                error: None,
            })
        }

        async fn supported(&self) -> Result<SupportedPaymentKindsResponse, Self::Error> {
            let deployment = USDCDeployment::by_network(self.network).unwrap();
            Ok(SupportedPaymentKindsResponse {
                kinds: vec![SupportedPaymentKind {
                    version: X402Version::V1,
                    scheme: Scheme::Exact,
                    network: self.network,
                    token: deployment.address().into(),
                    token_symbol: deployment.symbol.clone(),
                }],
            })
        }
    }

    struct StubProviderMap(HashMap<Network, StubProvider>);

    impl StubProviderMap {
        fn with_networks(networks: &[Network]) -> Self {
            Self(
                networks
                    .iter()
                    .map(|n| (*n, StubProvider { network: *n }))
                    .collect(),
            )
        }
    }

    impl ProviderMap for StubProviderMap {
        type Value = StubProvider;

        fn by_network(&self, network: Network) -> Option<&Self::Value> {
            self.0.get(&network)
        }

        fn values(&self) -> impl Iterator<Item = &Self::Value> {
            self.0.values()
        }
    }

    fn verify_request(payload_network: Network, requirements_network: Network) -> VerifyRequest {
        let from = EvmAddress::from_str("0x857b06519E91e3A54538791bDbb0E22373e36b66").unwrap();
        let to = EvmAddress::from_str("0x209693Bc6afc0C5328bA36FaF03C514EF312287C").unwrap();
        VerifyRequest {
            x402_version: X402Version::V1,
            payment_payload: PaymentPayload {
                x402_version: X402Version::V1,
                scheme: Scheme::Exact,
                network: payload_network,
                payload: ExactEvmPayload {
                    signature: EvmSignature([0u8; 65]),
                    authorization: ExactEvmPayloadAuthorization {
                        from,
                        to,
                        value: 25000u64.into(),
                        valid_after: UnixTimestamp::from_secs(1700000000),
                        valid_before: UnixTimestamp::from_secs(1700003600),
                        nonce: HexEncodedNonce([0x42; 32]),
                    },
                },
            },
            payment_requirements: PaymentRequirements {
                version: X402Version::V1,
                scheme: Scheme::Exact,
                network: requirements_network,
                pay_to: to.to_string(),
                max_amount_required: 25000u64.into(),
                resource: "https://api.example.com/weather".parse().unwrap(),
                description: "Weather report".into(),
                mime_type: "application/json".into(),
                max_timeout_seconds: 3600,
                asset: EvmAddress::from_str("0x036CbD53842c5426634e7929541eC2318f3dCF7e").unwrap(),
                output_schema: None,
                extra: None,
            },
        }
    }

    #[tokio::test]
    async fn dispatches_to_matching_provider() {
        let facilitator =
            FacilitatorLocal::new(StubProviderMap::with_networks(&[Network::BaseSepolia]));
        let request = verify_request(Network::BaseSepolia, Network::BaseSepolia);
        let response = facilitator.verify(&request).await.unwrap();
        assert!(response.is_valid);
        assert!(response.payer.is_some());
    }

    #[tokio::test]
    async fn rejects_network_mismatch_before_dispatch() {
        let facilitator = FacilitatorLocal::new(StubProviderMap::with_networks(&[
            Network::BaseSepolia,
            Network::Base,
        ]));
        let request = verify_request(Network::Base, Network::BaseSepolia);
        let error = facilitator.verify(&request).await.unwrap_err();
        match error {
            FacilitatorLocalError::NetworkMismatch(payer, expected, actual) => {
                assert!(payer.is_some());
                assert_eq!(expected, Network::BaseSepolia);
                assert_eq!(actual, Network::Base);
            }
            other => panic!("expected NetworkMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_unconfigured_network() {
        let facilitator =
            FacilitatorLocal::new(StubProviderMap::with_networks(&[Network::BaseSepolia]));
        let request = verify_request(Network::XdcMainnet, Network::XdcMainnet);
        let error = facilitator.verify(&request).await.unwrap_err();
        assert!(matches!(
            error,
            FacilitatorLocalError::UnsupportedNetwork(Some(_))
        ));
    }

    #[tokio::test]
    async fn settle_routes_like_verify() {
        let facilitator =
            FacilitatorLocal::new(StubProviderMap::with_networks(&[Network::BaseSepolia]));
        let verify = verify_request(Network::BaseSepolia, Network::BaseSepolia);
        let request = SettleRequest {
            payment_payload: verify.payment_payload,
            payment_requirements: verify.payment_requirements,
        };
        let response = facilitator.settle(&request).await.unwrap();
        assert!(response.success);
        assert!(response.transaction_hash.is_some());
    }

    #[tokio::test]
    async fn supported_lists_one_kind_per_provider() {
        let facilitator = FacilitatorLocal::new(StubProviderMap::with_networks(&[
            Network::BaseSepolia,
            Network::Base,
        ]));
        let response = facilitator.supported().await.unwrap();
        assert_eq!(response.kinds.len(), 2);
        let mut networks: Vec<String> =
            response.kinds.iter().map(|k| k.network.to_string()).collect();
        networks.sort();
        assert_eq!(networks, vec!["base", "base-sepolia"]);
    }
}
