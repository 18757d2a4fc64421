//! EVM provider: verification and settlement of ERC-3009 payment authorizations.
//!
//! Each provider bundles a JSON-RPC connection, the network's chain ID, a
//! rotating pool of relayer signers, the operator's asset whitelist, and the
//! local nonce replay cache. Verification is a fixed pipeline of checks that
//! short-circuits on the first failure; settlement re-runs verification and
//! then relays `transferWithAuthorization` on-chain, recording the nonce only
//! after the transaction is mined successfully.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet, NetworkWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, FixedBytes, Signature, U256};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolCall, SolStruct, eip712_domain};
use alloy::transports::http::Http;
use tracing::{Instrument, instrument};
use url::Url;

use crate::chain::nonce_store::NonceStore;
use crate::chain::{FacilitatorLocalError, NetworkProviderOps};
use crate::facilitator::Facilitator;
use crate::network::{Network, USDCDeployment};
use crate::timestamp::UnixTimestamp;
use crate::types::{
    EvmAddress, EvmSignature, ExactEvmPayload, HexEncodedNonce, MixedAddress, PaymentPayload,
    PaymentRequirements, Scheme, SettleRequest, SettleResponse, SupportedPaymentKind,
    SupportedPaymentKindsResponse, TransactionHash, TransferWithAuthorization, VerifyRequest,
    VerifyResponse, X402Version,
};

sol! {
    /// Minimal ERC-3009 + ERC-20 interface for USDC-style tokens.
    ///
    /// Only the functions actually used by the facilitator are declared.
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface USDC {
        function balanceOf(address account) external view returns (uint256);
        function transferWithAuthorization(
            address from,
            address to,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            bytes signature
        ) external;
    }
}

/// Timeout applied to every JSON-RPC request.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for a broadcast transaction to be mined.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed gas limit for `transferWithAuthorization`. Typical usage is
/// 50-70k; the headroom absorbs per-chain variance.
const SETTLE_GAS_LIMIT: u64 = 100_000;

/// The fully composed Ethereum provider type used in this project.
///
/// Combines multiple filler layers for gas, nonce, chain ID, blob gas, and wallet signing,
/// and wraps a [`RootProvider`] for actual JSON-RPC communication.
pub type InnerProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// A supported EVM network together with its numeric chain ID.
#[derive(Clone, Debug)]
pub struct EvmChain {
    pub network: Network,
    pub chain_id: u64,
}

impl TryFrom<Network> for EvmChain {
    type Error = FacilitatorLocalError;

    fn try_from(network: Network) -> Result<Self, Self::Error> {
        match network.chain_id() {
            Some(chain_id) => Ok(EvmChain { network, chain_id }),
            None => Err(FacilitatorLocalError::UnsupportedNetwork(None)),
        }
    }
}

/// A fully validated payment, ready to be relayed on-chain.
pub struct ExactEvmPayment {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: U256,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: HexEncodedNonce,
    pub signature: EvmSignature,
}

/// Per-network provider for verifying and settling ERC-3009 payments.
#[derive(Clone)]
pub struct EvmProvider {
    inner: InnerProvider,
    chain: EvmChain,
    /// Relayer addresses available for round-robin selection.
    signer_addresses: Arc<Vec<Address>>,
    /// Current position in round-robin signer rotation.
    signer_cursor: Arc<AtomicUsize>,
    /// Whitelisted token deployments, keyed by contract address.
    asset_whitelist: Arc<HashMap<Address, &'static USDCDeployment>>,
    /// Replay cache written only after successful settlement.
    nonce_store: Arc<NonceStore>,
}

impl EvmProvider {
    /// Connect a provider for `network` at `rpc_url`, signing with `wallet`.
    ///
    /// The wallet may carry multiple registered signers; settlement rotates
    /// through them. Spawns the nonce store sweeper on the current runtime.
    pub fn try_new(
        wallet: EthereumWallet,
        rpc_url: &str,
        network: Network,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let chain = EvmChain::try_from(network)?;
        let url = Url::parse(rpc_url)?;

        let http_client = reqwest::Client::builder().timeout(RPC_TIMEOUT).build()?;
        let transport = Http::with_client(http_client, url);
        let client = RpcClient::new(transport, false);

        let signer_addresses =
            NetworkWallet::<Ethereum>::signer_addresses(&wallet).collect::<Vec<_>>();
        if signer_addresses.is_empty() {
            return Err("at least one signer should be provided".into());
        }

        let inner: InnerProvider = ProviderBuilder::new().wallet(wallet).connect_client(client);

        let asset_whitelist: HashMap<Address, &'static USDCDeployment> =
            USDCDeployment::by_network(network)
                .into_iter()
                .map(|deployment| (deployment.address().0, deployment))
                .collect();

        let nonce_store = Arc::new(NonceStore::new());
        tokio::spawn(NonceStore::run_sweeper(Arc::clone(&nonce_store)));

        Ok(Self {
            inner,
            chain,
            signer_addresses: Arc::new(signer_addresses),
            signer_cursor: Arc::new(AtomicUsize::new(0)),
            asset_whitelist: Arc::new(asset_whitelist),
            nonce_store,
        })
    }

    /// Round-robin selection of the next relayer address.
    ///
    /// Lock-free; concurrent settlements may still land on the same signer and
    /// collide on its account nonce, which surfaces as a retryable broadcast
    /// failure.
    fn next_signer_address(&self) -> Address {
        debug_assert!(!self.signer_addresses.is_empty());
        if self.signer_addresses.len() == 1 {
            self.signer_addresses[0]
        } else {
            let next =
                self.signer_cursor.fetch_add(1, Ordering::Relaxed) % self.signer_addresses.len();
            self.signer_addresses[next]
        }
    }

    /// Runs all preconditions needed for a successful payment, in a fixed
    /// order so that the first failure decides the reported reason:
    /// receiver match, asset whitelist, validity window, nonce replay,
    /// amount sufficiency, EIP-712 signature, on-chain balance.
    #[instrument(skip_all, err)]
    async fn assert_valid_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<(USDC::USDCInstance<&InnerProvider>, ExactEvmPayment), FacilitatorLocalError> {
        let payment_payload = &payload.payload;
        let authorization = &payment_payload.authorization;
        let payer: MixedAddress = authorization.from.into();

        if payload.network != self.network() {
            return Err(FacilitatorLocalError::NetworkMismatch(
                Some(payer),
                self.network(),
                payload.network,
            ));
        }
        if requirements.network != self.network() {
            return Err(FacilitatorLocalError::NetworkMismatch(
                Some(payer),
                self.network(),
                requirements.network,
            ));
        }
        if payload.scheme != requirements.scheme {
            return Err(FacilitatorLocalError::SchemeMismatch(
                Some(payer),
                requirements.scheme,
                payload.scheme,
            ));
        }

        let payload_to = authorization.to;
        let requirements_to = EvmAddress::from_str(&requirements.pay_to).map_err(|_| {
            FacilitatorLocalError::DecodingError(format!(
                "invalid payTo address: {}",
                requirements.pay_to
            ))
        })?;
        if payload_to != requirements_to {
            return Err(FacilitatorLocalError::ReceiverMismatch(
                payer,
                payload_to.to_string(),
                requirements_to.to_string(),
            ));
        }

        let deployment = self
            .asset_whitelist
            .get(&requirements.asset.0)
            .copied()
            .ok_or_else(|| {
                FacilitatorLocalError::UnsupportedAsset(payer.clone(), requirements.asset.to_string())
            })?;

        assert_time(
            payer.clone(),
            authorization.valid_after,
            authorization.valid_before,
            requirements.max_timeout_seconds,
        )?;

        if self
            .nonce_store
            .is_used(&authorization.from, &authorization.nonce)?
        {
            return Err(FacilitatorLocalError::NonceReplay(payer));
        }

        let value: U256 = authorization.value.into();
        let amount_required: U256 = requirements.max_amount_required.into();
        assert_enough_value(&authorization.from, &value, &amount_required)?;

        let asset_address: Address = requirements.asset.into();
        let domain = eip712_domain! {
            name: deployment.eip712.name.clone(),
            version: deployment.eip712.version.clone(),
            chain_id: self.chain.chain_id,
            verifying_contract: asset_address,
        };
        assert_signature(payer, payment_payload, &domain)?;

        let contract = USDC::new(asset_address, &self.inner);
        assert_enough_balance(&contract, &authorization.from, value).await?;

        let payment = ExactEvmPayment {
            from: authorization.from,
            to: authorization.to,
            value,
            valid_after: authorization.valid_after,
            valid_before: authorization.valid_before,
            nonce: authorization.nonce,
            signature: payment_payload.signature,
        };

        Ok((contract, payment))
    }
}

impl NetworkProviderOps for EvmProvider {
    fn signer_addresses(&self) -> Vec<String> {
        self.signer_addresses.iter().map(|a| a.to_string()).collect()
    }

    fn network(&self) -> Network {
        self.chain.network
    }
}

impl Facilitator for EvmProvider {
    type Error = FacilitatorLocalError;

    /// Validates an EVM payment without submitting a transaction.
    ///
    /// Pure with respect to facilitator state: no nonce-store writes, the only
    /// network interaction is the balance probe.
    #[instrument(skip_all, err, fields(network = %self.network()))]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        let (_, payment) = self
            .assert_valid_payment(&request.payment_payload, &request.payment_requirements)
            .await?;
        Ok(VerifyResponse::valid(payment.from.into()))
    }

    /// Executes an EVM payment on-chain using ERC-3009 `transferWithAuthorization`.
    ///
    /// Re-runs the whole verify pipeline first, then selects a relayer,
    /// broadcasts a legacy-format transaction with a fixed gas limit, and
    /// waits for the receipt. The nonce store is written only when the
    /// receipt reports success, so failed or unmined settlements remain
    /// retryable; the chain itself is the authority on replays.
    #[instrument(skip_all, err, fields(network = %self.network()))]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        let (contract, payment) = self
            .assert_valid_payment(&request.payment_payload, &request.payment_requirements)
            .await?;

        let signer = self.next_signer_address();
        let transaction_nonce = self
            .inner
            .get_transaction_count(signer)
            .pending()
            .into_future()
            .instrument(tracing::info_span!("fetch_pending_nonce", signer = %signer, otel.kind = "client"))
            .await
            .map_err(|e| FacilitatorLocalError::ContractCall(format!("{e:?}")))?;
        let gas_price = self
            .inner
            .get_gas_price()
            .instrument(tracing::info_span!("get_gas_price", otel.kind = "client"))
            .await
            .map_err(|e| FacilitatorLocalError::ContractCall(format!("{e:?}")))?;

        let call = USDC::transferWithAuthorizationCall {
            from: payment.from.into(),
            to: payment.to.into(),
            value: payment.value,
            validAfter: payment.valid_after.into(),
            validBefore: payment.valid_before.into(),
            nonce: FixedBytes(payment.nonce.0),
            signature: Bytes::from(payment.signature.0),
        };
        let transaction = TransactionRequest::default()
            .with_from(signer)
            .with_to(*contract.address())
            .with_nonce(transaction_nonce)
            .with_gas_limit(SETTLE_GAS_LIMIT)
            .with_gas_price(gas_price)
            .with_input(call.abi_encode());

        let pending = self
            .inner
            .send_transaction(transaction)
            .instrument(tracing::info_span!("transferWithAuthorization",
                from = %payment.from,
                to = %payment.to,
                value = %payment.value,
                nonce = %payment.nonce,
                token_contract = %contract.address(),
                signer = %signer,
                otel.kind = "client",
            ))
            .await
            .map_err(|e| FacilitatorLocalError::ContractCall(format!("{e:?}")))?;
        let transaction_hash = *pending.tx_hash();

        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .into_future()
            .instrument(tracing::info_span!("get_receipt",
                transaction = %transaction_hash,
                otel.kind = "client",
            ))
            .await
            .map_err(|e| FacilitatorLocalError::ContractCall(format!("{e:?}")))?;

        if receipt.status() {
            // The transfer is already final on-chain at this point; losing the
            // local record only costs one chain-side replay rejection.
            if let Err(error) =
                self.nonce_store
                    .mark_used(&payment.from, &payment.nonce, payment.valid_before)
            {
                tracing::warn!(error = %error, "Failed to record settled nonce");
            }
            tracing::info!(
                tx = %receipt.transaction_hash,
                "transferWithAuthorization succeeded"
            );
            Ok(SettleResponse {
                success: true,
                transaction_hash: Some(TransactionHash::Evm(receipt.transaction_hash.0)),
                error: None,
            })
        } else {
            tracing::warn!(
                tx = %receipt.transaction_hash,
                "transferWithAuthorization reverted"
            );
            Ok(SettleResponse::failed("transaction reverted".to_string()))
        }
    }

    async fn supported(&self) -> Result<SupportedPaymentKindsResponse, Self::Error> {
        let kinds = self
            .asset_whitelist
            .values()
            .map(|deployment| SupportedPaymentKind {
                version: X402Version::V1,
                scheme: Scheme::Exact,
                network: self.network(),
                token: deployment.address().into(),
                token_symbol: deployment.symbol.clone(),
            })
            .collect();
        Ok(SupportedPaymentKindsResponse { kinds })
    }
}

/// Validates the authorization window against the current time.
///
/// The window must be well-formed (`validBefore > validAfter`), currently
/// open (`now` in `[validAfter, validBefore)`), and no longer than the
/// requirements' `maxTimeoutSeconds` when that bound is set.
#[instrument(skip_all, err)]
fn assert_time(
    payer: MixedAddress,
    valid_after: UnixTimestamp,
    valid_before: UnixTimestamp,
    max_timeout_seconds: u64,
) -> Result<(), FacilitatorLocalError> {
    if valid_before <= valid_after {
        return Err(FacilitatorLocalError::InvalidTiming(
            payer,
            format!(
                "invalid validity window: validBefore ({valid_before}) must be greater than validAfter ({valid_after})"
            ),
        ));
    }
    let now = UnixTimestamp::try_now().map_err(FacilitatorLocalError::ClockError)?;
    if now < valid_after {
        return Err(FacilitatorLocalError::InvalidTiming(
            payer,
            format!("payment not yet valid (validAfter: {valid_after}, now: {now})"),
        ));
    }
    if now >= valid_before {
        return Err(FacilitatorLocalError::InvalidTiming(
            payer,
            format!("payment expired (validBefore: {valid_before}, now: {now})"),
        ));
    }
    if max_timeout_seconds > 0 {
        let window = valid_before.as_secs() - valid_after.as_secs();
        if window > max_timeout_seconds {
            return Err(FacilitatorLocalError::InvalidTiming(
                payer,
                format!(
                    "payment validity window too long: {window} seconds (max allowed: {max_timeout_seconds} seconds)"
                ),
            ));
        }
    }
    Ok(())
}

/// Verifies the EIP-712 signature in the payment payload.
///
/// Recovers the signing address from the `TransferWithAuthorization` digest
/// and checks it matches the `from` address in the authorization. The
/// signature's `v` byte is accepted in both {0,1} and {27,28} forms.
#[instrument(skip_all, err)]
fn assert_signature(
    payer: MixedAddress,
    payload: &ExactEvmPayload,
    domain: &Eip712Domain,
) -> Result<(), FacilitatorLocalError> {
    let signature = Signature::from_raw_array(&payload.signature.0)
        .map_err(|e| FacilitatorLocalError::InvalidSignature(payer.clone(), format!("{e}")))?;
    let authorization = &payload.authorization;
    let transfer_with_authorization = TransferWithAuthorization {
        from: authorization.from.0,
        to: authorization.to.0,
        value: authorization.value.into(),
        validAfter: authorization.valid_after.into(),
        validBefore: authorization.valid_before.into(),
        nonce: FixedBytes(authorization.nonce.0),
    };
    let eip712_hash = transfer_with_authorization.eip712_signing_hash(domain);
    let recovered_address = signature
        .recover_address_from_prehash(&eip712_hash)
        .map_err(|e| FacilitatorLocalError::InvalidSignature(payer.clone(), format!("{e}")))?;
    let expected_address = authorization.from.0;
    if recovered_address != expected_address {
        Err(FacilitatorLocalError::InvalidSignature(
            payer,
            format!("address mismatch: recovered {recovered_address}, expected {expected_address}"),
        ))
    } else {
        Ok(())
    }
}

/// Verifies that the declared `value` in the payload covers the required amount.
#[instrument(skip_all, err, fields(sent = %sent, required = %required))]
fn assert_enough_value(
    payer: &EvmAddress,
    sent: &U256,
    required: &U256,
) -> Result<(), FacilitatorLocalError> {
    if sent < required {
        Err(FacilitatorLocalError::InsufficientValue((*payer).into()))
    } else {
        Ok(())
    }
}

/// Checks that the payer's on-chain token balance covers the authorized value.
///
/// Performs an `ERC20.balanceOf()` read call against the token contract.
#[instrument(skip_all, err, fields(sender = %sender, value = %value))]
async fn assert_enough_balance(
    contract: &USDC::USDCInstance<&InnerProvider>,
    sender: &EvmAddress,
    value: U256,
) -> Result<(), FacilitatorLocalError> {
    let balance = contract
        .balanceOf(sender.0)
        .call()
        .into_future()
        .instrument(tracing::info_span!(
            "fetch_token_balance",
            token_contract = %contract.address(),
            sender = %sender,
            otel.kind = "client"
        ))
        .await
        .map_err(|e| FacilitatorLocalError::ContractCall(format!("balance check failed: {e:?}")))?;

    if balance < value {
        Err(FacilitatorLocalError::InsufficientFunds((*sender).into()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::SignerSync;
    use alloy::signers::local::PrivateKeySigner;

    use crate::types::ExactEvmPayloadAuthorization;

    fn payer() -> MixedAddress {
        EvmAddress::from_str("0x857b06519E91e3A54538791bDbb0E22373e36b66")
            .unwrap()
            .into()
    }

    fn now_secs() -> u64 {
        UnixTimestamp::now().as_secs()
    }

    #[test]
    fn evm_chain_resolves_chain_ids() {
        let chain = EvmChain::try_from(Network::Base).unwrap();
        assert_eq!(chain.chain_id, 8453);
        assert!(matches!(
            EvmChain::try_from(Network::Solana),
            Err(FacilitatorLocalError::UnsupportedNetwork(None))
        ));
    }

    #[test]
    fn time_window_currently_open() {
        let result = assert_time(
            payer(),
            UnixTimestamp::from_secs(now_secs() - 10),
            UnixTimestamp::from_secs(now_secs() + 3600),
            3700,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn time_window_expired() {
        let result = assert_time(
            payer(),
            UnixTimestamp::from_secs(now_secs() - 3600),
            UnixTimestamp::from_secs(now_secs() - 1),
            0,
        );
        match result {
            Err(FacilitatorLocalError::InvalidTiming(_, reason)) => {
                assert!(reason.contains("payment expired"), "{reason}");
            }
            other => panic!("expected InvalidTiming, got {other:?}"),
        }
    }

    #[test]
    fn time_window_not_yet_valid() {
        let result = assert_time(
            payer(),
            UnixTimestamp::from_secs(now_secs() + 60),
            UnixTimestamp::from_secs(now_secs() + 3600),
            0,
        );
        match result {
            Err(FacilitatorLocalError::InvalidTiming(_, reason)) => {
                assert!(reason.contains("not yet valid"), "{reason}");
            }
            other => panic!("expected InvalidTiming, got {other:?}"),
        }
    }

    #[test]
    fn time_window_inverted() {
        let result = assert_time(
            payer(),
            UnixTimestamp::from_secs(now_secs() + 10),
            UnixTimestamp::from_secs(now_secs() - 10),
            0,
        );
        match result {
            Err(FacilitatorLocalError::InvalidTiming(_, reason)) => {
                assert!(reason.contains("invalid validity window"), "{reason}");
            }
            other => panic!("expected InvalidTiming, got {other:?}"),
        }
    }

    #[test]
    fn time_window_exceeds_timeout_bound() {
        let result = assert_time(
            payer(),
            UnixTimestamp::from_secs(now_secs() - 3600),
            UnixTimestamp::from_secs(now_secs() + 3600),
            3600,
        );
        match result {
            Err(FacilitatorLocalError::InvalidTiming(_, reason)) => {
                assert!(reason.contains("too long"), "{reason}");
            }
            other => panic!("expected InvalidTiming, got {other:?}"),
        }
        // A zero bound disables the window-length check.
        assert!(
            assert_time(
                payer(),
                UnixTimestamp::from_secs(now_secs() - 3600),
                UnixTimestamp::from_secs(now_secs() + 3600),
                0,
            )
            .is_ok()
        );
    }

    #[test]
    fn value_must_cover_required_amount() {
        let from = EvmAddress::from_str("0x857b06519E91e3A54538791bDbb0E22373e36b66").unwrap();
        assert!(assert_enough_value(&from, &U256::from(25000), &U256::from(25000)).is_ok());
        assert!(assert_enough_value(&from, &U256::from(30000), &U256::from(25000)).is_ok());
        assert!(matches!(
            assert_enough_value(&from, &U256::from(24999), &U256::from(25000)),
            Err(FacilitatorLocalError::InsufficientValue(_))
        ));
    }

    fn test_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
        eip712_domain! {
            name: "USD Coin",
            version: "2",
            chain_id: chain_id,
            verifying_contract: verifying_contract,
        }
    }

    fn signed_payload(
        signer: &PrivateKeySigner,
        authorization: ExactEvmPayloadAuthorization,
        domain: &Eip712Domain,
        v_offset: u8,
    ) -> ExactEvmPayload {
        let message = TransferWithAuthorization {
            from: authorization.from.0,
            to: authorization.to.0,
            value: authorization.value.into(),
            validAfter: authorization.valid_after.into(),
            validBefore: authorization.valid_before.into(),
            nonce: FixedBytes(authorization.nonce.0),
        };
        let digest = message.eip712_signing_hash(domain);
        let signature = signer.sign_hash_sync(&digest).unwrap();

        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
        bytes[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
        bytes[64] = signature.v() as u8 + v_offset;

        ExactEvmPayload {
            signature: EvmSignature(bytes),
            authorization,
        }
    }

    fn authorization_for(signer: &PrivateKeySigner) -> ExactEvmPayloadAuthorization {
        ExactEvmPayloadAuthorization {
            from: signer.address().into(),
            to: EvmAddress::from_str("0x209693Bc6afc0C5328bA36FaF03C514EF312287C").unwrap(),
            value: 25000u64.into(),
            valid_after: UnixTimestamp::from_secs(1700000000),
            valid_before: UnixTimestamp::from_secs(1700003600),
            nonce: HexEncodedNonce([0x42; 32]),
        }
    }

    #[test]
    fn signature_recovers_to_signer() {
        let signer = PrivateKeySigner::random();
        let token = Address::from([0x11; 20]);
        let domain = test_domain(84532, token);
        let payload = signed_payload(&signer, authorization_for(&signer), &domain, 0);
        let payer: MixedAddress = payload.authorization.from.into();
        assert!(assert_signature(payer, &payload, &domain).is_ok());
    }

    #[test]
    fn signature_v_byte_accepted_in_both_conventions() {
        let signer = PrivateKeySigner::random();
        let token = Address::from([0x11; 20]);
        let domain = test_domain(84532, token);
        let payer: MixedAddress = EvmAddress::from(signer.address()).into();
        // v as {0,1} and as {27,28} must both verify to the same address.
        for v_offset in [0u8, 27u8] {
            let payload =
                signed_payload(&signer, authorization_for(&signer), &domain, v_offset);
            assert!(
                assert_signature(payer.clone(), &payload, &domain).is_ok(),
                "v offset {v_offset} rejected"
            );
        }
    }

    #[test]
    fn tampered_fields_invalidate_signature() {
        let signer = PrivateKeySigner::random();
        let token = Address::from([0x11; 20]);
        let domain = test_domain(84532, token);
        let payer: MixedAddress = EvmAddress::from(signer.address()).into();

        // Tamper with each signed field after signing.
        let tampered: Vec<ExactEvmPayloadAuthorization> = {
            let base = authorization_for(&signer);
            let mut out = vec![];
            let mut a = base;
            a.to = EvmAddress::from(Address::from([0xaa; 20]));
            out.push(a);
            let mut a = base;
            a.value = 26000u64.into();
            out.push(a);
            let mut a = base;
            a.valid_after = UnixTimestamp::from_secs(1700000001);
            out.push(a);
            let mut a = base;
            a.valid_before = UnixTimestamp::from_secs(1700007200);
            out.push(a);
            let mut a = base;
            a.nonce = HexEncodedNonce([0x43; 32]);
            out.push(a);
            out
        };
        for authorization in tampered {
            let mut payload = signed_payload(&signer, authorization_for(&signer), &domain, 0);
            payload.authorization = authorization;
            assert!(matches!(
                assert_signature(payer.clone(), &payload, &domain),
                Err(FacilitatorLocalError::InvalidSignature(_, _))
            ));
        }

        // A different chain ID or verifying contract changes the domain.
        let payload = signed_payload(&signer, authorization_for(&signer), &domain, 0);
        let wrong_chain = test_domain(8453, token);
        assert!(matches!(
            assert_signature(payer.clone(), &payload, &wrong_chain),
            Err(FacilitatorLocalError::InvalidSignature(_, _))
        ));
        let wrong_contract = test_domain(84532, Address::from([0x22; 20]));
        assert!(matches!(
            assert_signature(payer.clone(), &payload, &wrong_contract),
            Err(FacilitatorLocalError::InvalidSignature(_, _))
        ));

        // Claiming a different `from` must not verify either.
        let mut payload = signed_payload(&signer, authorization_for(&signer), &domain, 0);
        payload.authorization.from =
            EvmAddress::from_str("0x209693Bc6afc0C5328bA36FaF03C514EF312287C").unwrap();
        assert!(matches!(
            assert_signature(payer, &payload, &domain),
            Err(FacilitatorLocalError::InvalidSignature(_, _))
        ));
    }
}
