//! Replay cache for ERC-3009 authorization nonces.
//!
//! The store remembers (payer, nonce) pairs that were consumed by a successful
//! settlement, so an immediate resubmission of the same authorization is
//! rejected without a chain round-trip. The token contract's
//! `_authorizationStates` mapping remains the authority: entries here expire
//! shortly after the authorization itself does, and losing an entry only costs
//! one reverted transaction.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::chain::FacilitatorLocalError;
use crate::timestamp::UnixTimestamp;
use crate::types::{EvmAddress, HexEncodedNonce};

/// How long an entry outlives its authorization's `validBefore`.
/// The grace compensates for late RPC acks and clock skew between the
/// facilitator and the chain.
const NONCE_RETENTION_SECS: u64 = 3600;

/// Interval between background sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tracks when a nonce was first seen and when its record can be dropped.
#[derive(Debug, Clone, Copy)]
struct NonceEntry {
    #[allow(dead_code)] // Retained for operator debugging.
    first_seen: UnixTimestamp,
    expires_at: UnixTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NonceKey {
    from: alloy::primitives::Address,
    nonce: [u8; 32],
}

/// Concurrent map of consumed authorization nonces.
///
/// Readers (verification) and writers (settlement completion, the sweeper)
/// serialize on a single reader/writer lock around a plain map.
#[derive(Debug, Default)]
pub struct NonceStore {
    entries: RwLock<HashMap<NonceKey, NonceEntry>>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the nonce has been recorded as consumed for this payer and the
    /// record has not yet expired.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorLocalError::ClockError`] if the system clock
    /// cannot be read.
    pub fn is_used(
        &self,
        from: &EvmAddress,
        nonce: &HexEncodedNonce,
    ) -> Result<bool, FacilitatorLocalError> {
        let now = UnixTimestamp::try_now().map_err(FacilitatorLocalError::ClockError)?;
        let key = NonceKey {
            from: from.0,
            nonce: nonce.0,
        };
        let entries = self.entries.read().expect("nonce store lock poisoned");
        let used = match entries.get(&key) {
            Some(entry) => now <= entry.expires_at,
            None => false,
        };
        Ok(used)
    }

    /// Record a nonce as consumed. Called only after an on-chain settlement
    /// succeeded; failed settlements never reach this point, so the same
    /// authorization stays retryable.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorLocalError::ClockError`] if the system clock
    /// cannot be read.
    pub fn mark_used(
        &self,
        from: &EvmAddress,
        nonce: &HexEncodedNonce,
        valid_before: UnixTimestamp,
    ) -> Result<(), FacilitatorLocalError> {
        let now = UnixTimestamp::try_now().map_err(FacilitatorLocalError::ClockError)?;
        let key = NonceKey {
            from: from.0,
            nonce: nonce.0,
        };
        let entry = NonceEntry {
            first_seen: now,
            expires_at: valid_before + NONCE_RETENTION_SECS,
        };
        let mut entries = self.entries.write().expect("nonce store lock poisoned");
        entries.insert(key, entry);
        Ok(())
    }

    /// Drop all expired entries, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorLocalError::ClockError`] if the system clock
    /// cannot be read.
    pub fn evict_expired(&self) -> Result<usize, FacilitatorLocalError> {
        let now = UnixTimestamp::try_now().map_err(FacilitatorLocalError::ClockError)?;
        let mut entries = self.entries.write().expect("nonce store lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok(before - entries.len())
    }

    /// Number of recorded entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().expect("nonce store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the periodic sweeper until the store is dropped by all other holders.
    pub async fn run_sweeper(store: Arc<NonceStore>) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if Arc::strong_count(&store) == 1 {
                break;
            }
            match store.evict_expired() {
                Ok(removed) if removed > 0 => {
                    tracing::debug!(removed, remaining = store.len(), "Swept expired nonces");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "Nonce sweep skipped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payer() -> EvmAddress {
        EvmAddress::from_str("0x857b06519E91e3A54538791bDbb0E22373e36b66").unwrap()
    }

    fn nonce(byte: u8) -> HexEncodedNonce {
        HexEncodedNonce([byte; 32])
    }

    #[test]
    fn fresh_nonce_is_unused() {
        let store = NonceStore::new();
        assert!(!store.is_used(&payer(), &nonce(1)).unwrap());
    }

    #[test]
    fn marked_nonce_is_used_until_retention_elapses() {
        let store = NonceStore::new();
        let valid_before = UnixTimestamp::now() + 3600;
        store.mark_used(&payer(), &nonce(1), valid_before).unwrap();
        assert!(store.is_used(&payer(), &nonce(1)).unwrap());
        // A different nonce or payer is unaffected.
        assert!(!store.is_used(&payer(), &nonce(2)).unwrap());
        let other = EvmAddress::from_str("0x209693Bc6afc0C5328bA36FaF03C514EF312287C").unwrap();
        assert!(!store.is_used(&other, &nonce(1)).unwrap());
    }

    #[test]
    fn expired_entry_reads_as_unused() {
        let store = NonceStore::new();
        // validBefore long enough in the past that the retention grace elapsed too.
        let expired = UnixTimestamp::from_secs(
            UnixTimestamp::now().as_secs() - 2 * NONCE_RETENTION_SECS,
        );
        store.mark_used(&payer(), &nonce(1), expired).unwrap();
        assert!(!store.is_used(&payer(), &nonce(1)).unwrap());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let store = NonceStore::new();
        let expired = UnixTimestamp::from_secs(
            UnixTimestamp::now().as_secs() - 2 * NONCE_RETENTION_SECS,
        );
        store.mark_used(&payer(), &nonce(1), expired).unwrap();
        store
            .mark_used(&payer(), &nonce(2), UnixTimestamp::now() + 3600)
            .unwrap();
        assert_eq!(store.len(), 2);

        let removed = store.evict_expired().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.is_used(&payer(), &nonce(2)).unwrap());
    }
}
