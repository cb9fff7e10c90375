//! Secret Rendezvous Registry.
//!
//! Pairs one asynchronous producer (the issuance cycle triggered by a
//! lifecycle event) with one synchronous consumer (a retrieval request from
//! inside the application instance), per application identity. The registry
//! map has its own mutex; each slot synchronizes its hand-off independently
//! with a mutex and a [`Notify`].
//!
//! Slot policy: capacity one. `produce` never blocks; producing onto an
//! unconsumed value overwrites it and logs a warning, since a repeated
//! `TASK_RUNNING` event is a deliberate regeneration. `consume` empties the
//! slot and is bounded by a caller-supplied deadline.

use bellhop_vault::CredentialToken;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::warn;

/// What an issuance cycle left in the slot.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The carrier token, ready to hand to the application
    Issued(CredentialToken),
    /// The cycle failed; consumers get the reason instead of waiting out
    /// their deadline
    Failed(String),
}

#[derive(Debug, Default)]
struct Slot {
    pending: Mutex<Option<Delivery>>,
    notify: Notify,
}

/// Process-wide map from application identity to its hand-off slot.
///
/// Slots are created lazily, at most once per identity, and live for the
/// process lifetime.
#[derive(Debug, Default)]
pub struct RendezvousRegistry {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl RendezvousRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotently create the slot for `identity`.
    pub fn ensure_slot(&self, identity: &str) {
        let _ = self.slot(identity);
    }

    fn slot(&self, identity: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(identity.to_string())
                .or_insert_with(|| Arc::new(Slot::default())),
        )
    }

    /// Leave `delivery` in the identity's slot. Never blocks.
    pub fn produce(&self, identity: &str, delivery: Delivery) {
        let slot = self.slot(identity);
        let previous = slot
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(delivery);
        if previous.is_some() {
            warn!(app_id = %identity, "overwriting undelivered credential");
        }
        slot.notify.notify_one();
    }

    /// Wait until a delivery is available for `identity`, then take it.
    ///
    /// Returns `None` when `deadline` expires first. The slot is emptied on
    /// success, so delivery is exactly-once for one producer/one consumer.
    pub async fn consume(&self, identity: &str, deadline: Duration) -> Option<Delivery> {
        let slot = self.slot(identity);
        tokio::time::timeout(deadline, async move {
            loop {
                let taken = slot
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(delivery) = taken {
                    return delivery;
                }
                // notify_one stores a permit, so a produce racing between the
                // check above and this await is not lost.
                slot.notify.notified().await;
            }
        })
        .await
        .ok()
    }
}
