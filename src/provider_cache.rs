//! Provider cache and environment-driven initialization.
//!
//! This module builds the per-network providers at process start from
//! environment variables: relayer private keys and one RPC endpoint per
//! network. Networks without a configured RPC URL are skipped with a warning.
//!
//! Environment variables used:
//! - `EVM_PRIVATE_KEY` — a single relayer private key,
//! - `EVM_PRIVATE_KEYS` — comma-separated relayer key pool (takes precedence),
//! - `RPC_URL_BASE`, `RPC_URL_BASE_SEPOLIA`, ... — RPC endpoints per network.
//!
//! Example usage:
//! ```ignore
//! let provider_cache = ProviderCache::from_env().await?;
//! let provider = provider_cache.by_network(Network::Base);
//! ```

use alloy::network::EthereumWallet;
use alloy::signers::local::PrivateKeySigner;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::chain::evm::EvmProvider;
use crate::chain::{NetworkProvider, NetworkProviderOps};
use crate::facilitator_local::ProviderMap;
use crate::network::{Network, NetworkFamily};

const ENV_EVM_PRIVATE_KEY: &str = "EVM_PRIVATE_KEY";
const ENV_EVM_PRIVATE_KEYS: &str = "EVM_PRIVATE_KEYS";

/// The RPC URL environment variable for a network.
fn rpc_env_var(network: Network) -> &'static str {
    match network {
        Network::BaseSepolia => "RPC_URL_BASE_SEPOLIA",
        Network::Base => "RPC_URL_BASE",
        Network::AvalancheFuji => "RPC_URL_AVALANCHE_FUJI",
        Network::Avalanche => "RPC_URL_AVALANCHE",
        Network::PolygonAmoy => "RPC_URL_POLYGON_AMOY",
        Network::Polygon => "RPC_URL_POLYGON",
        Network::Sei => "RPC_URL_SEI",
        Network::SeiTestnet => "RPC_URL_SEI_TESTNET",
        Network::XdcMainnet => "RPC_URL_XDC",
        Network::Solana => "RPC_URL_SOLANA",
        Network::SolanaDevnet => "RPC_URL_SOLANA_DEVNET",
    }
}

/// A cache of pre-initialized network providers keyed by network.
///
/// Use [`ProviderCache::from_env`] to load credentials and connect using
/// environment variables. Construction fails fast on missing keys or bad
/// key material, so misconfiguration surfaces at startup rather than on the
/// first settlement.
#[derive(Clone)]
pub struct ProviderCache {
    providers: HashMap<Network, NetworkProvider>,
}

impl ProviderCache {
    /// Constructs a new [`ProviderCache`] from environment variables.
    ///
    /// Requires relayer keys in `EVM_PRIVATE_KEYS` (or `EVM_PRIVATE_KEY`) and
    /// builds one provider per network that has its RPC URL configured.
    pub async fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let wallet = evm_wallet_from_env()?;
        let mut providers = HashMap::new();
        for network in Network::variants() {
            let env_var = rpc_env_var(*network);
            let Ok(rpc_url) = env::var(env_var) else {
                tracing::warn!("No RPC URL configured for {} (skipped)", network);
                continue;
            };
            match NetworkFamily::from(*network) {
                NetworkFamily::Evm => {
                    let provider = EvmProvider::try_new(wallet.clone(), &rpc_url, *network)?;
                    tracing::info!(
                        "Initialized provider for {} (chain ID: {}) at {} using {:?}",
                        network.display_name(),
                        network.chain_id().unwrap_or_default(),
                        rpc_url,
                        provider.signer_addresses(),
                    );
                    providers.insert(*network, NetworkProvider::Evm(provider));
                }
                NetworkFamily::Solana => {
                    tracing::warn!(
                        "Solana provider is not implemented; skipping {}",
                        network
                    );
                }
            }
        }
        Ok(Self { providers })
    }
}

impl ProviderMap for ProviderCache {
    type Value = NetworkProvider;

    fn by_network(&self, network: Network) -> Option<&NetworkProvider> {
        self.providers.get(&network)
    }

    fn values(&self) -> impl Iterator<Item = &NetworkProvider> {
        self.providers.values()
    }
}

/// Constructs an [`EthereumWallet`] carrying the relayer key pool.
///
/// `EVM_PRIVATE_KEYS` holds a comma-separated list and takes precedence over
/// the single-key `EVM_PRIVATE_KEY`. Every key in the pool is registered with
/// the wallet; settlement rotates across them.
pub fn evm_wallet_from_env() -> Result<EthereumWallet, Box<dyn std::error::Error>> {
    let raw_keys = env::var(ENV_EVM_PRIVATE_KEYS)
        .or_else(|_| env::var(ENV_EVM_PRIVATE_KEY))
        .map_err(|_| "no EVM private keys configured")?;
    let keys: Vec<_> = raw_keys
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect();
    if keys.is_empty() {
        return Err("no EVM private keys configured".into());
    }

    let mut iter = keys.into_iter();
    let first_key = iter
        .next()
        .expect("iterator contains at least one element by construction");
    let first_signer = PrivateKeySigner::from_str(&first_key)
        .map_err(|err| -> Box<dyn std::error::Error> { Box::new(err) })?;
    let mut wallet = EthereumWallet::from(first_signer);

    for key in iter {
        let signer = PrivateKeySigner::from_str(&key)
            .map_err(|err| -> Box<dyn std::error::Error> { Box::new(err) })?;
        wallet.register_signer(signer);
    }

    Ok(wallet)
}
