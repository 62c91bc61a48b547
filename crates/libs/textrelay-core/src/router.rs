use crate::status::{CorrelationKey, DispatchState, StatusStore, StoreUpdate};
use crate::transport::{Outcome, OutcomeHandler};
use std::sync::Arc;

/// What happened to one routed outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    Applied { from: DispatchState, to: DispatchState },
    /// Accepted but the state did not move (repeat `Sent`, late `Sent` after `Delivered`).
    Unchanged,
    /// Key from a superseded or reset batch.
    Stale { live: u64 },
    /// The slot already failed.
    Terminal,
    UnknownSlot,
}

impl Disposition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Transition table for one slot. `None` means "leave it alone".
///
/// `Sent` never overwrites `Delivered`: a confirmation that arrives before its
/// sent report is already the stronger signal.
pub fn next_state(current: &DispatchState, outcome: &Outcome) -> Option<DispatchState> {
    use DispatchState as S;
    match (current, outcome) {
        (S::Failed { .. }, _) => None,
        (_, Outcome::TransportFailure { reason }) => Some(S::failed(reason.clone())),
        (_, Outcome::DeliveryConfirmed) => Some(S::Delivered),
        (S::Delivered, Outcome::Sent) => None,
        (S::Pending | S::Sent, Outcome::Sent) => Some(S::Sent),
    }
}

/// Applies transport outcomes to the live generation's slots.
#[derive(Clone, Debug)]
pub struct CallbackRouter {
    store: Arc<StatusStore>,
}

impl CallbackRouter {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn route(&self, key: CorrelationKey, outcome: &Outcome) -> Disposition {
        let mut terminal = false;
        let update = self.store.update(key, |current| {
            terminal = current.is_terminal();
            next_state(current, outcome)
        });

        let disposition = match update {
            StoreUpdate::Changed { from, to } => Disposition::Applied { from, to },
            StoreUpdate::Unchanged(_) if terminal => Disposition::Terminal,
            StoreUpdate::Unchanged(_) => Disposition::Unchanged,
            StoreUpdate::Stale { live } => Disposition::Stale { live },
            StoreUpdate::UnknownSlot => Disposition::UnknownSlot,
        };

        match &disposition {
            Disposition::Applied { from, to } => {
                log::debug!("{key}: {} -> {} on {outcome:?}", from.label(), to.label());
            }
            Disposition::Stale { live } => {
                log::debug!("{key}: discarding {outcome:?} from superseded batch (live g{live})");
            }
            Disposition::Terminal => {
                log::debug!("{key}: discarding {outcome:?}, slot already failed");
            }
            Disposition::UnknownSlot => {
                log::warn!("{key}: discarding {outcome:?} for a slot this batch never minted");
            }
            Disposition::Unchanged => {}
        }
        disposition
    }
}

impl OutcomeHandler for CallbackRouter {
    fn on_outcome(&self, key: CorrelationKey, outcome: Outcome) {
        self.route(key, &outcome);
    }
}
