//! Network definitions and known token deployments.
//!
//! This module defines supported networks and their chain IDs,
//! and provides statically known USDC deployments per network.
//! The registry is the source of truth for `/supported` output and for
//! the chain IDs used in EIP-712 domain construction.

use alloy::primitives::address;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::types::{TokenAsset, TokenDeployment, TokenDeploymentEip712};

/// Supported blockchain networks.
///
/// Used to differentiate between testnet and mainnet environments for the x402 protocol.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Base Sepolia testnet (chain ID 84532).
    #[serde(rename = "base-sepolia")]
    BaseSepolia,
    /// Base mainnet (chain ID 8453).
    #[serde(rename = "base")]
    Base,
    /// Avalanche Fuji testnet (chain ID 43113).
    #[serde(rename = "avalanche-fuji")]
    AvalancheFuji,
    /// Avalanche C-Chain mainnet (chain ID 43114).
    #[serde(rename = "avalanche")]
    Avalanche,
    /// Polygon Amoy testnet (chain ID 80002).
    #[serde(rename = "polygon-amoy")]
    PolygonAmoy,
    /// Polygon mainnet (chain ID 137).
    #[serde(rename = "polygon")]
    Polygon,
    /// Sei mainnet (chain ID 1329).
    #[serde(rename = "sei")]
    Sei,
    /// Sei testnet (chain ID 1328).
    #[serde(rename = "sei-testnet")]
    SeiTestnet,
    /// XDC mainnet (chain ID 50).
    #[serde(rename = "xdc")]
    XdcMainnet,
    /// Solana mainnet.
    #[serde(rename = "solana")]
    Solana,
    /// Solana devnet.
    #[serde(rename = "solana-devnet")]
    SolanaDevnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Network::BaseSepolia => "base-sepolia",
            Network::Base => "base",
            Network::AvalancheFuji => "avalanche-fuji",
            Network::Avalanche => "avalanche",
            Network::PolygonAmoy => "polygon-amoy",
            Network::Polygon => "polygon",
            Network::Sei => "sei",
            Network::SeiTestnet => "sei-testnet",
            Network::XdcMainnet => "xdc",
            Network::Solana => "solana",
            Network::SolanaDevnet => "solana-devnet",
        };
        write!(f, "{}", s)
    }
}

/// The chain family a [`Network`] belongs to.
///
/// EVM networks settle via ERC-3009 `transferWithAuthorization`; Solana
/// networks are recognized on the wire but have no provider implementation.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFamily {
    Evm,
    Solana,
}

impl From<Network> for NetworkFamily {
    fn from(network: Network) -> Self {
        match network {
            Network::BaseSepolia
            | Network::Base
            | Network::AvalancheFuji
            | Network::Avalanche
            | Network::PolygonAmoy
            | Network::Polygon
            | Network::Sei
            | Network::SeiTestnet
            | Network::XdcMainnet => NetworkFamily::Evm,
            Network::Solana | Network::SolanaDevnet => NetworkFamily::Solana,
        }
    }
}

impl Network {
    /// Return the numeric EVM chain ID associated with the network,
    /// or `None` for non-EVM networks.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::BaseSepolia => Some(84532),
            Network::Base => Some(8453),
            Network::AvalancheFuji => Some(43113),
            Network::Avalanche => Some(43114),
            Network::PolygonAmoy => Some(80002),
            Network::Polygon => Some(137),
            Network::Sei => Some(1329),
            Network::SeiTestnet => Some(1328),
            Network::XdcMainnet => Some(50),
            Network::Solana | Network::SolanaDevnet => None,
        }
    }

    /// Human-readable network name, used in startup logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::BaseSepolia => "Base Sepolia",
            Network::Base => "Base",
            Network::AvalancheFuji => "Avalanche Fuji",
            Network::Avalanche => "Avalanche C-Chain",
            Network::PolygonAmoy => "Polygon Amoy",
            Network::Polygon => "Polygon",
            Network::Sei => "Sei",
            Network::SeiTestnet => "Sei Testnet",
            Network::XdcMainnet => "XDC",
            Network::Solana => "Solana",
            Network::SolanaDevnet => "Solana Devnet",
        }
    }

    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[
            Network::BaseSepolia,
            Network::Base,
            Network::AvalancheFuji,
            Network::Avalanche,
            Network::PolygonAmoy,
            Network::Polygon,
            Network::Sei,
            Network::SeiTestnet,
            Network::XdcMainnet,
            Network::Solana,
            Network::SolanaDevnet,
        ]
    }
}

/// EIP-712 domain metadata shared by the canonical USDC deployments.
///
/// The `transferWithAuthorization` domain is fixed by the protocol;
/// a single character difference here makes signature recovery
/// silently mismatch with no chain-side hint.
fn usdc_eip712() -> TokenDeploymentEip712 {
    TokenDeploymentEip712 {
        name: "USD Coin".into(),
        version: "2".into(),
    }
}

fn usdc_deployment(network: Network, address: alloy::primitives::Address) -> USDCDeployment {
    USDCDeployment(TokenDeployment {
        asset: TokenAsset {
            address: address.into(),
            network,
        },
        decimals: 6,
        symbol: "USDC".into(),
        eip712: usdc_eip712(),
    })
}

/// Lazily initialized known USDC deployment on Base Sepolia.
static USDC_BASE_SEPOLIA: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::BaseSepolia,
        address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
    )
});

/// Lazily initialized known USDC deployment on Base mainnet.
static USDC_BASE: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::Base,
        address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    )
});

/// Lazily initialized known USDC deployment on Avalanche Fuji.
static USDC_AVALANCHE_FUJI: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::AvalancheFuji,
        address!("0x5425890298aed601595a70AB815c96711a31Bc65"),
    )
});

/// Lazily initialized known USDC deployment on Avalanche C-Chain.
static USDC_AVALANCHE: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::Avalanche,
        address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    )
});

/// Lazily initialized known USDC deployment on Polygon Amoy.
static USDC_POLYGON_AMOY: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::PolygonAmoy,
        address!("0x41e94eb019c0762f9bfcf9fb1e58725bfb0e7582"),
    )
});

/// Lazily initialized known USDC deployment on Polygon mainnet.
static USDC_POLYGON: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::Polygon,
        address!("0x3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
    )
});

/// Lazily initialized known USDC deployment on XDC mainnet.
static USDC_XDC: Lazy<USDCDeployment> = Lazy::new(|| {
    usdc_deployment(
        Network::XdcMainnet,
        address!("0xD4B5f10D61916Bd6E0860144a91Ac658dE8a1437"),
    )
});

/// A known USDC deployment as a wrapper around [`TokenDeployment`].
#[derive(Clone, Debug)]
pub struct USDCDeployment(pub TokenDeployment);

impl Deref for USDCDeployment {
    type Target = TokenDeployment;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&USDCDeployment> for TokenDeployment {
    fn from(deployment: &USDCDeployment) -> Self {
        deployment.0.clone()
    }
}

impl USDCDeployment {
    /// Return the known USDC deployment for the given network, if any.
    ///
    /// Networks without a recorded canonical deployment (Sei, Solana) yield
    /// `None` and are absent from `/supported`.
    pub fn by_network<N: Borrow<Network>>(network: N) -> Option<&'static USDCDeployment> {
        match network.borrow() {
            Network::BaseSepolia => Some(&USDC_BASE_SEPOLIA),
            Network::Base => Some(&USDC_BASE),
            Network::AvalancheFuji => Some(&USDC_AVALANCHE_FUJI),
            Network::Avalanche => Some(&USDC_AVALANCHE),
            Network::PolygonAmoy => Some(&USDC_POLYGON_AMOY),
            Network::Polygon => Some(&USDC_POLYGON),
            Network::XdcMainnet => Some(&USDC_XDC),
            Network::Sei | Network::SeiTestnet | Network::Solana | Network::SolanaDevnet => None,
        }
    }
}
