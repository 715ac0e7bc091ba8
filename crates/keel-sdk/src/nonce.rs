//! Per-sender nonce sequencing

use std::sync::Arc;

use dashmap::DashMap;
use keel_primitives::Address;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::BlockId;
use crate::{ChainClient, SdkError};

/// Serializes nonce resolution per sender.
///
/// Each sender has an async lock guarding the last nonce handed out. A
/// [`NonceReservation`] holds that lock until it is committed or dropped,
/// so two builds for the same sender never observe the same value. Builds
/// for different senders do not contend.
#[derive(Debug, Default)]
pub struct NonceManager {
    senders: DashMap<Address, Arc<Mutex<Option<u64>>>>,
}

/// A nonce held for one build.
///
/// Committing records the nonce as issued. Dropping without committing
/// releases the lock and leaves the sequence unchanged.
#[derive(Debug)]
pub struct NonceReservation {
    address: Address,
    nonce: u64,
    last_issued: OwnedMutexGuard<Option<u64>>,
}

impl NonceManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, address: &Address) -> Arc<Mutex<Option<u64>>> {
        self.senders.entry(*address).or_default().clone()
    }

    /// Reserve the next nonce for `address`.
    ///
    /// Waits for any other reservation of the same sender, then yields
    /// `max(pending transaction count, last issued + 1)`.
    pub async fn reserve(
        &self,
        client: &ChainClient,
        address: &Address,
    ) -> Result<NonceReservation, SdkError> {
        let last_issued = self.slot(address).lock_owned().await;
        let chain_count = client.get_nonce(address, BlockId::Pending).await?;

        let nonce = match *last_issued {
            Some(last) => {
                let next = last
                    .checked_add(1)
                    .ok_or_else(|| SdkError::Validation(format!("nonce overflow for {}", address)))?;
                next.max(chain_count)
            }
            None => chain_count,
        };

        tracing::info!("reserved nonce {} for {}", nonce, address);
        Ok(NonceReservation {
            address: *address,
            nonce,
            last_issued,
        })
    }

    /// Last nonce issued to `address`, if any.
    ///
    /// Waits while a reservation for the sender is open.
    pub async fn last_issued(&self, address: &Address) -> Option<u64> {
        let slot = self.senders.get(address).map(|s| s.value().clone())?;
        let last = *slot.lock().await;
        last
    }

    /// Forget the sequence for `address`; the next reservation trusts the chain
    pub async fn reset(&self, address: &Address) {
        if let Some(slot) = self.senders.get(address).map(|s| s.value().clone()) {
            *slot.lock().await = None;
        }
    }
}

impl NonceReservation {
    /// The reserved nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Sender the nonce belongs to
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Record the nonce as issued and release the lock
    pub fn commit(mut self) {
        *self.last_issued = Some(self.nonce);
    }
}
