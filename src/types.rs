//! Type definitions for the x402 protocol wire format.
//!
//! This mirrors the structures and validation logic of the official x402 SDKs.
//! The key objects are `PaymentPayload`, `PaymentRequirements`, `VerifyResponse`, and
//! `SettleResponse`, which encode payment intent, authorization, and the result of
//! verification/settlement.
//!
//! The module supports ERC-3009 style authorization for tokens (EIP-712 typed
//! signatures), and provides serialization logic compatible with external clients.
//! Request types reject unknown fields so that misnamed keys fail loudly instead of
//! being silently dropped.

use alloy::primitives::U256;
use alloy::{hex, sol};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display};
use std::str::FromStr;
use url::Url;

use crate::network::Network;
use crate::timestamp::UnixTimestamp;

/// Represents the protocol version. Currently only version 1 is supported.
///
/// Serialized as the integer `1` in payment payloads, and as the string `"1"`
/// in payment requirements and supported-kind listings (see [`version_string`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum X402Version {
    /// Version `1`.
    V1,
}

impl Serialize for X402Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            X402Version::V1 => serializer.serialize_u8(1),
        }
    }
}

impl Display for X402Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X402Version::V1 => write!(f, "1"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported x402Version: {0}")]
pub struct X402VersionError(pub u8);

impl TryFrom<u8> for X402Version {
    type Error = X402VersionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(X402Version::V1),
            _ => Err(X402VersionError(value)),
        }
    }
}

impl<'de> Deserialize<'de> for X402Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        X402Version::try_from(num).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for the string form of [`X402Version`], used by fields that
/// carry the version as `"1"` rather than `1` on the wire.
pub(crate) mod version_string {
    use super::X402Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        version: &X402Version,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<X402Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "1" => Ok(X402Version::V1),
            other => Err(serde::de::Error::custom(format!(
                "Unsupported version: {other}"
            ))),
        }
    }
}

/// Enumerates payment schemes. Only "exact" is supported in this implementation,
/// meaning the authorized amount must cover the required amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Exact,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scheme::Exact => "exact",
        };
        write!(f, "{}", s)
    }
}

/// Represents a 65-byte EVM signature used in EIP-712 typed data.
/// Serialized as 0x-prefixed hex string with 130 characters.
/// Used to authorize an ERC-3009 transferWithAuthorization.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct EvmSignature(pub [u8; 65]);

impl From<[u8; 65]> for EvmSignature {
    fn from(bytes: [u8; 65]) -> Self {
        EvmSignature(bytes)
    }
}

impl Debug for EvmSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvmSignature(0x{})", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for EvmSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        static SIG_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^0x[0-9a-fA-F]{130}$").expect("Invalid regex for EVM signature")
        });

        if SIG_REGEX.is_match(&s) {
            let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| {
                serde::de::Error::custom("Failed to decode EVM signature hex string")
            })?;

            let array: [u8; 65] = bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("Signature must be exactly 65 bytes"))?;

            Ok(EvmSignature(array))
        } else {
            Err(serde::de::Error::custom(
                "Invalid EVM signature format: must be 0x-prefixed and 130 hex chars",
            ))
        }
    }
}

impl Serialize for EvmSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex_string = format!("0x{}", hex::encode(self.0));
        serializer.serialize_str(&hex_string)
    }
}

/// Represents an EVM address.
///
/// Wrapper around `alloy::primitives::Address`, providing display/serialization support.
/// Rendered in EIP-55 checksummed hex; comparison is byte-wise, so input casing
/// never affects equality.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct EvmAddress(pub alloy::primitives::Address);

impl Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode EVM address")]
pub struct EvmAddressDecodingError;

impl FromStr for EvmAddress {
    type Err = EvmAddressDecodingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address =
            alloy::primitives::Address::from_str(s).map_err(|_| EvmAddressDecodingError)?;
        Ok(Self(address))
    }
}

impl From<EvmAddress> for alloy::primitives::Address {
    fn from(address: EvmAddress) -> Self {
        address.0
    }
}

impl From<alloy::primitives::Address> for EvmAddress {
    fn from(address: alloy::primitives::Address) -> Self {
        EvmAddress(address)
    }
}

/// Represents a 32-byte payer-chosen nonce, hex-encoded with 0x prefix.
/// Must be exactly 64 hex characters long.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct HexEncodedNonce(pub [u8; 32]);

impl Debug for HexEncodedNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexEncodedNonce(0x{})", hex::encode(self.0))
    }
}

impl Display for HexEncodedNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for HexEncodedNonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        static NONCE_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("Invalid nonce regex"));

        if !NONCE_REGEX.is_match(&s) {
            return Err(serde::de::Error::custom("Invalid nonce format"));
        }

        let bytes =
            hex::decode(&s[2..]).map_err(|_| serde::de::Error::custom("Invalid hex in nonce"))?;

        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid length for nonce"))?;

        Ok(HexEncodedNonce(array))
    }
}

impl Serialize for HexEncodedNonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex_string = format!("0x{}", hex::encode(self.0));
        serializer.serialize_str(&hex_string)
    }
}

/// A precise on-chain token amount in base units (e.g., USDC with 6 decimals).
///
/// Serialized as a stringified decimal integer to prevent precision loss,
/// e.g. `25000` becomes `"25000"` in JSON.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(pub U256);

impl Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TokenAmount> for U256 {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        TokenAmount(U256::from(value))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = U256::from_str_radix(&s, 10)
            .map_err(|_| serde::de::Error::custom("amount must be a non-negative integer"))?;
        Ok(TokenAmount(value))
    }
}

/// A tagged address on any supported chain, rendered on the wire as
/// `{"type": "evm" | "solana" | "offchain", "address": "..."}`.
///
/// EVM addresses are displayed in EIP-55 hex; Solana addresses in base58.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixedAddress {
    Evm(EvmAddress),
    Solana(String),
    Offchain(String),
}

impl From<alloy::primitives::Address> for MixedAddress {
    fn from(value: alloy::primitives::Address) -> Self {
        MixedAddress::Evm(value.into())
    }
}

impl From<EvmAddress> for MixedAddress {
    fn from(address: EvmAddress) -> Self {
        MixedAddress::Evm(address)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MixedAddressError {
    #[error("Not an EVM address")]
    NotEvmAddress,
    #[error("Invalid address format")]
    InvalidAddressFormat,
}

impl TryFrom<MixedAddress> for EvmAddress {
    type Error = MixedAddressError;

    fn try_from(value: MixedAddress) -> Result<Self, Self::Error> {
        match value {
            MixedAddress::Evm(address) => Ok(address),
            _ => Err(MixedAddressError::NotEvmAddress),
        }
    }
}

impl Display for MixedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixedAddress::Evm(address) => write!(f, "{}", address),
            MixedAddress::Solana(address) => write!(f, "{}", address),
            MixedAddress::Offchain(address) => write!(f, "{}", address),
        }
    }
}

impl Serialize for MixedAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (kind, address) = match self {
            MixedAddress::Evm(address) => ("evm", address.to_string()),
            MixedAddress::Solana(address) => ("solana", address.clone()),
            MixedAddress::Offchain(address) => ("offchain", address.clone()),
        };
        let mut s = serializer.serialize_struct("MixedAddress", 2)?;
        s.serialize_field("type", kind)?;
        s.serialize_field("address", &address)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for MixedAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            #[serde(rename = "type")]
            kind: String,
            address: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "evm" => {
                let address = EvmAddress::from_str(&raw.address)
                    .map_err(|_| serde::de::Error::custom("Invalid EVM address"))?;
                Ok(MixedAddress::Evm(address))
            }
            "solana" => Ok(MixedAddress::Solana(raw.address)),
            "offchain" => Ok(MixedAddress::Offchain(raw.address)),
            other => Err(serde::de::Error::custom(format!(
                "Unknown address type: {other}"
            ))),
        }
    }
}

/// A transaction hash on any supported chain, rendered on the wire as
/// `{"type": "evm", "hash": "0x..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionHash {
    Evm([u8; 32]),
}

impl Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionHash::Evm(hash) => write!(f, "0x{}", hex::encode(hash)),
        }
    }
}

impl Serialize for TransactionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TransactionHash", 2)?;
        match self {
            TransactionHash::Evm(hash) => {
                s.serialize_field("type", "evm")?;
                s.serialize_field("hash", &format!("0x{}", hex::encode(hash)))?;
            }
        }
        s.end()
    }
}

impl<'de> Deserialize<'de> for TransactionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            #[serde(rename = "type")]
            kind: String,
            hash: String,
        }

        static TX_HASH_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("invalid regex"));

        let raw = Raw::deserialize(deserializer)?;
        if raw.kind != "evm" {
            return Err(serde::de::Error::custom(format!(
                "Unknown transaction hash type: {}",
                raw.kind
            )));
        }
        if !TX_HASH_REGEX.is_match(&raw.hash) {
            return Err(serde::de::Error::custom("Invalid transaction hash format"));
        }
        let bytes = hex::decode(raw.hash.trim_start_matches("0x"))
            .map_err(|_| serde::de::Error::custom("Invalid hex in transaction hash"))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Transaction hash must be exactly 32 bytes"))?;
        Ok(TransactionHash::Evm(array))
    }
}

/// EIP-712 structured data for ERC-3009-based authorization.
/// Defines who can transfer how much of the token and when.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExactEvmPayloadAuthorization {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: TokenAmount,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: HexEncodedNonce,
}

/// Full payload required to authorize an ERC-3009 transfer:
/// includes the signature and the EIP-712 struct.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExactEvmPayload {
    pub signature: EvmSignature,
    pub authorization: ExactEvmPayloadAuthorization,
}

/// Describes a signed request to transfer a specific amount of funds on-chain.
/// Includes the scheme, network, and signed payload contents.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentPayload {
    pub x402_version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
    pub payload: ExactEvmPayload,
}

/// Requirements set by the payment-gated endpoint for an acceptable payment.
/// This includes the required amount, recipient, asset, network, and metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentRequirements {
    #[serde(with = "version_string")]
    pub version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
    /// Recipient address as declared by the merchant. Compared
    /// case-insensitively against the authorization's `to` field.
    pub pay_to: String,
    pub max_amount_required: TokenAmount,
    pub resource: Url,
    pub description: String,
    pub mime_type: String,
    /// Upper bound on the authorization validity window, in seconds.
    /// Zero disables the bound.
    pub max_timeout_seconds: u64,
    pub asset: EvmAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Wrapper for a payment payload and requirements sent to the facilitator
/// to be verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyRequest {
    pub x402_version: X402Version,
    pub payment_payload: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
}

/// Wrapper for a payment payload and requirements sent to the facilitator
/// for settlement. Unlike [`VerifyRequest`], the settle body carries no
/// top-level version field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettleRequest {
    pub payment_payload: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
}

/// Result returned by a facilitator after verifying a [`PaymentPayload`] against
/// the provided [`PaymentRequirements`].
///
/// Indicates whether the payment authorization is valid and identifies the payer.
/// If invalid, includes a reason describing why verification failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<MixedAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerifyResponse {
    /// Constructs a successful verification response with the given `payer` address.
    pub fn valid(payer: MixedAddress) -> Self {
        VerifyResponse {
            is_valid: true,
            payer: Some(payer),
            reason: None,
        }
    }

    /// Constructs a failed verification response with the given rejection
    /// `reason` and the payer address when one could be derived.
    pub fn invalid(reason: String, payer: Option<MixedAddress>) -> Self {
        VerifyResponse {
            is_valid: false,
            payer,
            reason: Some(reason),
        }
    }
}

/// Returned from a facilitator after attempting to settle a payment on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TransactionHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SettleResponse {
    /// Constructs a failed settlement response with the given error message.
    pub fn failed(error: String) -> Self {
        SettleResponse {
            success: false,
            transaction_hash: None,
            error: Some(error),
        }
    }
}

/// A (version, scheme, network, token) tuple the facilitator can verify and settle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupportedPaymentKind {
    #[serde(with = "version_string")]
    pub version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
    pub token: MixedAddress,
    pub token_symbol: String,
}

/// Response listing all supported payment kinds, served on `GET /supported`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupportedPaymentKindsResponse {
    pub kinds: Vec<SupportedPaymentKind>,
}

/// A simple error structure returned on unexpected or fatal server errors.
/// Used when no structured protocol-level response is appropriate.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

/// Metadata required to identify a token in EIP-712 typed data signatures.
///
/// These values must match the domain the payer signed against; they are
/// critical for signature validity and replay protection across token versions.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TokenDeploymentEip712 {
    pub name: String,
    pub version: String,
}

/// Represents a fungible token identified by its address and network,
/// used for selecting or matching assets across chains (e.g., USDC on Base).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TokenAsset {
    pub address: EvmAddress,
    pub network: Network,
}

impl Display for TokenAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // CAIP-19 https://chainagnostic.org/CAIPs/caip-19
        match self.network.chain_id() {
            Some(chain_id) => write!(f, "eip155:{}/erc20:{}", chain_id, self.address),
            None => write!(f, "{}:{}", self.network, self.address),
        }
    }
}

/// Describes a specific deployed ERC-20 token instance, including metadata
/// required for value formatting and EIP-712 signing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TokenDeployment {
    pub asset: TokenAsset,
    pub decimals: u8,
    pub symbol: String,
    pub eip712: TokenDeploymentEip712,
}

impl TokenDeployment {
    pub fn address(&self) -> EvmAddress {
        self.asset.address
    }

    pub fn network(&self) -> Network {
        self.asset.network
    }
}

sol!(
    /// Solidity-compatible struct definition for ERC-3009 `transferWithAuthorization`.
    ///
    /// This matches the EIP-3009 format used in EIP-712 typed data:
    /// it defines the authorization to transfer tokens from `from` to `to`
    /// for a specific `value`, valid only between `validAfter` and `validBefore`
    /// and identified by a unique `nonce`.
    ///
    /// Used to reconstruct the typed data message when verifying a client's signature.
    #[derive(Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verify_request_json() -> serde_json::Value {
        json!({
            "x402Version": 1,
            "paymentPayload": {
                "x402Version": 1,
                "scheme": "exact",
                "network": "base-sepolia",
                "payload": {
                    "signature": format!("0x{}", "ab".repeat(65)),
                    "authorization": {
                        "from": "0x857b06519E91e3A54538791bDbb0E22373e36b66",
                        "to": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                        "value": "25000",
                        "validAfter": "1700000000",
                        "validBefore": "1700003600",
                        "nonce": format!("0x{}", "01".repeat(32))
                    }
                }
            },
            "paymentRequirements": {
                "version": "1",
                "scheme": "exact",
                "network": "base-sepolia",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "maxAmountRequired": "25000",
                "resource": "https://api.example.com/weather",
                "description": "Weather report",
                "mimeType": "application/json",
                "maxTimeoutSeconds": 3600,
                "asset": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                "outputSchema": {"type": "object"},
                "extra": null
            }
        })
    }

    #[test]
    fn decodes_verify_request_wire_example() {
        let request: VerifyRequest = serde_json::from_value(verify_request_json()).unwrap();
        assert_eq!(request.x402_version, X402Version::V1);
        let payload = &request.payment_payload;
        assert_eq!(payload.scheme, Scheme::Exact);
        assert_eq!(payload.network, Network::BaseSepolia);
        let authorization = &payload.payload.authorization;
        assert_eq!(authorization.value, TokenAmount::from(25000u64));
        assert_eq!(authorization.valid_after, UnixTimestamp(1700000000));
        assert_eq!(authorization.valid_before, UnixTimestamp(1700003600));
        assert_eq!(authorization.nonce.0, [0x01; 32]);
        let requirements = &request.payment_requirements;
        assert_eq!(requirements.version, X402Version::V1);
        assert_eq!(requirements.max_timeout_seconds, 3600);
        assert_eq!(
            requirements.asset.to_string(),
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut value = verify_request_json();
        value["paymentPayload"]["payload"]["authorization"]["gasLimit"] = json!("100000");
        assert!(serde_json::from_value::<VerifyRequest>(value).is_err());

        let mut value = verify_request_json();
        value["paymentRequirements"]["surcharge"] = json!("1");
        assert!(serde_json::from_value::<VerifyRequest>(value).is_err());
    }

    #[test]
    fn settle_request_has_no_top_level_version() {
        let mut value = verify_request_json();
        let map = value.as_object_mut().unwrap();
        map.remove("x402Version");
        let request: SettleRequest = serde_json::from_value(value).unwrap();
        assert_eq!(request.payment_payload.network, Network::BaseSepolia);

        // The settle body rejects the verify body's extra field.
        assert!(serde_json::from_value::<SettleRequest>(verify_request_json()).is_err());
    }

    #[test]
    fn verify_response_wire_shape() {
        let address = "0x857b06519E91e3A54538791bDbb0E22373e36b66"
            .parse::<EvmAddress>()
            .unwrap();
        let payer: MixedAddress = address.into();
        let valid = serde_json::to_value(VerifyResponse::valid(payer.clone())).unwrap();
        assert_eq!(
            valid,
            json!({
                "isValid": true,
                "payer": {
                    "type": "evm",
                    // EIP-55 checksummed rendering of the payer address.
                    "address": address.to_string()
                }
            })
        );

        let invalid =
            serde_json::to_value(VerifyResponse::invalid("payment expired".into(), Some(payer)))
                .unwrap();
        assert_eq!(invalid["isValid"], json!(false));
        assert_eq!(invalid["reason"], json!("payment expired"));
    }

    #[test]
    fn settle_response_wire_shape() {
        let response = SettleResponse {
            success: true,
            transaction_hash: Some(TransactionHash::Evm([0xcd; 32])),
            error: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "transaction_hash": {
                    "type": "evm",
                    "hash": format!("0x{}", "cd".repeat(32))
                }
            })
        );

        let failed = serde_json::to_value(SettleResponse::failed("transaction reverted".into()))
            .unwrap();
        assert_eq!(
            failed,
            json!({"success": false, "error": "transaction reverted"})
        );
    }

    #[test]
    fn supported_kind_serializes_version_as_string() {
        let deployment = crate::network::USDCDeployment::by_network(Network::Base).unwrap();
        let kind = SupportedPaymentKind {
            version: X402Version::V1,
            scheme: Scheme::Exact,
            network: Network::Base,
            token: deployment.address().into(),
            token_symbol: deployment.symbol.clone(),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["version"], json!("1"));
        assert_eq!(value["token"]["type"], json!("evm"));
        assert_eq!(value["token_symbol"], json!("USDC"));
    }

    #[test]
    fn token_amount_parses_decimal_strings_only() {
        let amount: TokenAmount = serde_json::from_str("\"25000\"").unwrap();
        assert_eq!(amount, TokenAmount::from(25000u64));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"25000\"");
        assert!(serde_json::from_str::<TokenAmount>("\"0x61a8\"").is_err());
        assert!(serde_json::from_str::<TokenAmount>("\"-1\"").is_err());
        assert!(serde_json::from_str::<TokenAmount>("\"\"").is_err());
        assert!(serde_json::from_str::<TokenAmount>("25000").is_err());
    }

    #[test]
    fn mixed_address_round_trips() {
        let solana = MixedAddress::Solana("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into());
        let value = serde_json::to_value(&solana).unwrap();
        assert_eq!(value["type"], json!("solana"));
        let back: MixedAddress = serde_json::from_value(value).unwrap();
        assert_eq!(back, solana);

        let offchain = MixedAddress::Offchain("merchant-42".into());
        let back: MixedAddress =
            serde_json::from_value(serde_json::to_value(&offchain).unwrap()).unwrap();
        assert_eq!(back, offchain);

        assert!(
            serde_json::from_value::<MixedAddress>(json!({"type": "bitcoin", "address": "x"}))
                .is_err()
        );
    }

    #[test]
    fn signature_and_nonce_formats_are_validated() {
        assert!(serde_json::from_str::<EvmSignature>("\"0x1234\"").is_err());
        assert!(serde_json::from_str::<HexEncodedNonce>("\"0x01\"").is_err());
        let nonce: HexEncodedNonce =
            serde_json::from_str(&format!("\"0x{}\"", "ef".repeat(32))).unwrap();
        assert_eq!(nonce.0, [0xef; 32]);
    }
}
