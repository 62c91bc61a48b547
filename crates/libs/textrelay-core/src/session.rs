//! The caller-owned state container tying the recipient list, the message body
//! and the live batch's delivery states together.
//!
//! A [`Session`] is created and owned by the presentation layer; independent
//! sessions share nothing. Edits go through the mutation entry points on the
//! owning thread, while outcomes stream into the shared status store from the
//! transport. [`SessionWatch`] joins both sides into one observable snapshot.

use crate::address::AddressPolicy;
use crate::config::SessionConfig;
use crate::dispatch::{DispatchCoordinator, DispatchReport};
use crate::error::RelayError;
use crate::recipient::{RecipientEntry, RecipientSet, EMPTY_RECIPIENT};
use crate::router::CallbackRouter;
use crate::status::{CorrelationKey, DispatchState, StatusStore, StatusTable};
use crate::transport::TransportProvider;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RecipientStatus {
    #[serde(flatten)]
    pub entry: RecipientEntry,
    /// `None` until the entry is part of a dispatched batch.
    pub delivery: Option<DispatchState>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub message: String,
    pub ready: bool,
    /// Generation of the batch the recipients are bound to, if any.
    pub generation: Option<u64>,
    pub recipients: Vec<RecipientStatus>,
}

impl SessionSnapshot {
    /// Every bound recipient has been delivered or has failed.
    pub fn is_settled(&self) -> bool {
        self.recipients
            .iter()
            .filter_map(|recipient| recipient.delivery.as_ref())
            .all(DispatchState::is_settled)
    }
}

/// Control-side half of the snapshot, republished on every edit.
#[derive(Clone, Debug, Default)]
struct RecipientView {
    message: String,
    ready: bool,
    batch: Option<u64>,
    entries: Vec<RecipientEntry>,
    bindings: Vec<Option<u32>>,
}

fn assemble(view: &RecipientView, table: &StatusTable) -> SessionSnapshot {
    let live_batch = view.batch.filter(|generation| *generation == table.generation());
    let recipients = view
        .entries
        .iter()
        .zip(&view.bindings)
        .map(|(entry, binding)| RecipientStatus {
            entry: entry.clone(),
            delivery: live_batch.zip(*binding).and_then(|(generation, slot)| {
                table.get(CorrelationKey::new(generation, slot)).cloned()
            }),
        })
        .collect();

    SessionSnapshot {
        message: view.message.clone(),
        ready: view.ready,
        generation: live_batch,
        recipients,
    }
}

pub struct Session {
    message: String,
    recipients: RecipientSet,
    /// Slot of the live batch each entry was sent as; moves with the entry.
    bindings: Vec<Option<u32>>,
    batch: Option<u64>,
    coordinator: DispatchCoordinator,
    view: watch::Sender<RecipientView>,
}

impl Session {
    pub fn new(provider: Arc<dyn TransportProvider>, policy: Arc<dyn AddressPolicy>) -> Self {
        let store = Arc::new(StatusStore::new());
        let recipients = RecipientSet::new(policy);
        let bindings = vec![None; recipients.len()];
        let (view, _rx) = watch::channel(RecipientView::default());
        let session = Self {
            message: String::new(),
            recipients,
            bindings,
            batch: None,
            coordinator: DispatchCoordinator::new(store, provider),
            view,
        };
        session.publish();
        session
    }

    pub fn from_config(provider: Arc<dyn TransportProvider>, config: &SessionConfig) -> Self {
        Self::new(provider, config.address_policy())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recipients(&self) -> &RecipientSet {
        &self.recipients
    }

    /// Router to hand to transports constructed outside the session.
    pub fn router(&self) -> CallbackRouter {
        self.coordinator.router().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.recipients.is_ready(&self.message)
    }

    /// Removal is offered while more than one entry is left.
    pub fn can_remove(&self) -> bool {
        self.recipients.len() > 1
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.publish();
    }

    pub fn add_recipient(&mut self) {
        self.recipients.add();
        self.bindings.push(None);
        self.publish();
    }

    /// Replaces an entry's input. An edited entry no longer matches what was
    /// sent, so it loses its slot binding.
    pub fn update_recipient(&mut self, index: usize, text: &str) {
        self.recipients.update(index, text);
        self.bindings[index] = None;
        self.publish();
    }

    pub fn format_recipient(&mut self, index: usize) {
        self.recipients.format(index);
        self.publish();
    }

    pub fn remove_recipient(&mut self, index: usize) {
        self.recipients.remove(index);
        self.bindings.remove(index);
        self.publish();
    }

    pub fn dispatch(&mut self) -> Result<DispatchReport, RelayError> {
        if let Some(reason) = self.not_ready_reason() {
            return Err(RelayError::not_ready(reason));
        }

        let report = self.coordinator.dispatch(self.recipients.entries(), &self.message);
        self.bindings = (0..report.slots as u32).map(Some).collect();
        self.batch = Some(report.generation);
        self.publish();
        Ok(report)
    }

    /// Clears the body and the list and retires the live batch; callbacks still
    /// in flight for it are discarded when they arrive.
    pub fn reset(&mut self) {
        self.message.clear();
        self.recipients.reset();
        self.bindings = vec![None; self.recipients.len()];
        self.batch = None;
        let retired = self.coordinator.store().retire();
        log::debug!("session reset, live generation now g{retired}");
        self.publish();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let view = self.view.borrow();
        assemble(&view, &self.coordinator.store().snapshot())
    }

    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            view: self.view.subscribe(),
            status: self.coordinator.store().subscribe(),
        }
    }

    fn not_ready_reason(&self) -> Option<String> {
        if let Some(issue) = RecipientSet::message_issue(&self.message) {
            return Some(issue.to_owned());
        }
        if self.recipients.is_empty() {
            return Some("no recipients".to_owned());
        }
        self.recipients.entries().iter().enumerate().find_map(|(index, entry)| {
            if entry.is_dispatchable() {
                return None;
            }
            let message = match entry.validation_message() {
                "" => EMPTY_RECIPIENT,
                message => message,
            };
            Some(format!("recipient {}: {message}", index + 1))
        })
    }

    fn publish(&self) {
        self.view.send_replace(RecipientView {
            message: self.message.clone(),
            ready: self.is_ready(),
            batch: self.batch,
            entries: self.recipients.entries().to_vec(),
            bindings: self.bindings.clone(),
        });
    }
}

/// Subscription to a session's combined snapshot.
pub struct SessionWatch {
    view: watch::Receiver<RecipientView>,
    status: watch::Receiver<StatusTable>,
}

impl SessionWatch {
    /// Current snapshot; marks both sides as seen.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        let view = self.view.borrow_and_update();
        let table = self.status.borrow_and_update();
        assemble(&view, &table)
    }

    /// Waits until the recipient list, the message or a delivery state changes.
    pub async fn changed(&mut self) -> Result<(), RelayError> {
        tokio::select! {
            changed = self.view.changed() => changed.map_err(|_| RelayError::Closed),
            changed = self.status.changed() => changed.map_err(|_| RelayError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NanpPolicy;
    use crate::transport::{Outcome, Unavailable};

    fn session() -> Session {
        Session::new(Arc::new(Unavailable), Arc::new(NanpPolicy))
    }

    #[test]
    fn starts_with_one_empty_entry_and_not_ready() {
        let session = session();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.recipients.len(), 1);
        assert!(!snapshot.ready);
        assert_eq!(snapshot.generation, None);
        assert!(!session.can_remove());
    }

    #[test]
    fn dispatch_refuses_when_not_ready() {
        let mut session = session();
        session.update_recipient(0, "5551234567");
        let err = session.dispatch().unwrap_err();
        assert_eq!(err, RelayError::not_ready("message cannot be empty"));

        session.set_message("hi");
        session.add_recipient();
        let err = session.dispatch().unwrap_err();
        assert_eq!(err, RelayError::not_ready("recipient 2: cannot be empty"));
    }

    #[test]
    fn bindings_follow_entries_across_removal() {
        let mut session = session();
        session.set_message("hi");
        session.update_recipient(0, "5551234567");
        session.add_recipient();
        session.update_recipient(1, "5559876543");
        let report = session.dispatch().expect("dispatch");

        session
            .router()
            .route(CorrelationKey::new(report.generation, 1), &Outcome::Sent);
        session.remove_recipient(0);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.recipients.len(), 1);
        assert_eq!(snapshot.recipients[0].entry.normalized_address(), "5559876543");
        assert_eq!(
            snapshot.recipients[0].delivery,
            Some(DispatchState::failed("no transport available"))
        );
    }

    #[test]
    fn editing_after_dispatch_unbinds_the_entry() {
        let mut session = session();
        session.set_message("hi");
        session.update_recipient(0, "5551234567");
        session.dispatch().expect("dispatch");
        session.update_recipient(0, "5559876543");
        assert_eq!(session.snapshot().recipients[0].delivery, None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = session();
        session.set_message("hi");
        session.update_recipient(0, "5551234567");
        session.dispatch().expect("dispatch");
        session.reset();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.message, "");
        assert_eq!(snapshot.generation, None);
        assert_eq!(snapshot.recipients.len(), 1);
        assert_eq!(snapshot.recipients[0].delivery, None);
    }
}
