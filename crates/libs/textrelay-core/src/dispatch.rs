use crate::recipient::RecipientEntry;
use crate::router::CallbackRouter;
use crate::status::{CorrelationKey, DispatchState, StatusStore};
use crate::transport::{OutcomeHandler, TransportProvider};
use serde::Serialize;
use std::sync::Arc;

pub const NO_TRANSPORT: &str = "no transport available";

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub generation: u64,
    /// Recipients in the batch snapshot, one slot each.
    pub slots: usize,
    /// Recipients handed to the transport.
    pub attempted: usize,
    /// Recipients the transport refused synchronously.
    pub rejected: usize,
    pub transport_available: bool,
}

impl DispatchReport {
    pub fn keys(&self) -> impl Iterator<Item = CorrelationKey> + '_ {
        (0..self.slots).map(|slot| CorrelationKey::new(self.generation, slot as u32))
    }
}

/// Fires one outbound unit per recipient and seeds their states.
///
/// Dispatch never waits for delivery; outcomes arrive later through the
/// [`CallbackRouter`] that the transport was acquired with.
pub struct DispatchCoordinator {
    store: Arc<StatusStore>,
    router: CallbackRouter,
    provider: Arc<dyn TransportProvider>,
}

impl DispatchCoordinator {
    pub fn new(store: Arc<StatusStore>, provider: Arc<dyn TransportProvider>) -> Self {
        let router = CallbackRouter::new(store.clone());
        Self { store, router, provider }
    }

    pub fn router(&self) -> &CallbackRouter {
        &self.router
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn dispatch(&self, recipients: &[RecipientEntry], message: &str) -> DispatchReport {
        let snapshot: Vec<String> =
            recipients.iter().map(|entry| entry.normalized_address().to_owned()).collect();
        let generation = self.store.begin_generation(snapshot.len());

        let handler: Arc<dyn OutcomeHandler> = Arc::new(self.router.clone());
        let Some(transport) = self.provider.acquire(handler) else {
            log::warn!("g{generation}: {NO_TRANSPORT}, failing {} recipient(s)", snapshot.len());
            self.store.fail_all(generation, NO_TRANSPORT);
            return DispatchReport {
                generation,
                slots: snapshot.len(),
                attempted: 0,
                rejected: 0,
                transport_available: false,
            };
        };

        let mut rejected = 0;
        for (slot, address) in snapshot.iter().enumerate() {
            let key = CorrelationKey::new(generation, slot as u32);
            if let Err(err) = transport.send(address, message, key) {
                rejected += 1;
                log::warn!("{key}: transport rejected {address}: {err}");
                let reason = err.reason();
                self.store.update(key, |current| {
                    (!current.is_terminal()).then(|| DispatchState::failed(reason))
                });
            } else {
                log::debug!("{key}: handed {address} to transport");
            }
        }

        log::info!(
            "g{generation}: dispatched to {} recipient(s), {rejected} rejected",
            snapshot.len()
        );
        DispatchReport {
            generation,
            slots: snapshot.len(),
            attempted: snapshot.len(),
            rejected,
            transport_available: true,
        }
    }
}
