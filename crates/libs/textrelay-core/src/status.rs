//! Per-batch delivery state.
//!
//! Every dispatch opens a new *generation*. Each recipient in that batch gets a
//! [`CorrelationKey`] made of the generation and its position in the batch
//! snapshot, never the position in the live, editable recipient list. The
//! [`StatusStore`] only ever holds the table of the live generation, so a key
//! from an earlier batch cannot reach a newer batch's slot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Generation 0 is never minted; it marks a store that has not dispatched yet.
pub const NO_GENERATION: u64 = 0;

fn mint_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey {
    pub generation: u64,
    pub slot: u32,
}

impl CorrelationKey {
    pub fn new(generation: u64, slot: u32) -> Self {
        Self { generation, slot }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}/s{}", self.generation, self.slot)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchState {
    Pending,
    Sent,
    Delivered,
    Failed { reason: String },
}

impl DispatchState {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }

    /// `Failed` absorbs every later outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Nothing further is expected for this recipient in the normal course.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed { .. })
    }

    pub fn label(&self) -> String {
        match self {
            Self::Pending => "pending".to_owned(),
            Self::Sent => "sent".to_owned(),
            Self::Delivered => "delivered".to_owned(),
            Self::Failed { reason } => format!("failed: {reason}"),
        }
    }
}

/// States of one generation, indexed by slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusTable {
    generation: u64,
    states: Vec<DispatchState>,
}

impl StatusTable {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn states(&self) -> &[DispatchState] {
        &self.states
    }

    /// The state behind `key`, or `None` if the key belongs to another generation.
    pub fn get(&self, key: CorrelationKey) -> Option<&DispatchState> {
        if key.generation != self.generation {
            return None;
        }
        self.states.get(key.slot as usize)
    }
}

/// Result of a conditional update through [`StatusStore::update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreUpdate {
    Changed { from: DispatchState, to: DispatchState },
    Unchanged(DispatchState),
    Stale { live: u64 },
    UnknownSlot,
}

/// Concurrency-safe slot table for the live generation.
///
/// All writes run inside the watch channel's write lock, so concurrent
/// callbacks never interleave on a slot and readers never see a half-applied
/// update. Subscribers are woken after every effective change.
#[derive(Debug)]
pub struct StatusStore {
    tx: watch::Sender<StatusTable>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusTable::default());
        Self { tx }
    }

    pub fn live_generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Opens a fresh generation with `slots` entries, all `Pending`.
    ///
    /// The previous generation's table is dropped; its keys become stale.
    pub fn begin_generation(&self, slots: usize) -> u64 {
        let generation = mint_generation();
        self.tx.send_replace(StatusTable {
            generation,
            states: vec![DispatchState::Pending; slots],
        });
        log::debug!("generation {generation} opened with {slots} slot(s)");
        generation
    }

    /// Retires the live generation without dispatching anything.
    pub fn retire(&self) -> u64 {
        self.begin_generation(0)
    }

    pub fn get(&self, key: CorrelationKey) -> Option<DispatchState> {
        self.tx.borrow().get(key).cloned()
    }

    pub fn snapshot(&self) -> StatusTable {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusTable> {
        self.tx.subscribe()
    }

    /// Marks every slot of `generation` failed, if it is still live.
    pub fn fail_all(&self, generation: u64, reason: &str) -> bool {
        self.tx.send_if_modified(|table| {
            if table.generation != generation {
                return false;
            }
            for state in &mut table.states {
                *state = DispatchState::failed(reason);
            }
            !table.states.is_empty()
        })
    }

    /// Atomically reads the state behind `key` and replaces it with what `next`
    /// returns. `next` returning `None`, or the same state, leaves the slot alone.
    pub fn update<F>(&self, key: CorrelationKey, next: F) -> StoreUpdate
    where
        F: FnOnce(&DispatchState) -> Option<DispatchState>,
    {
        let mut outcome = StoreUpdate::UnknownSlot;
        self.tx.send_if_modified(|table| {
            if key.generation != table.generation {
                outcome = StoreUpdate::Stale { live: table.generation };
                return false;
            }
            let Some(current) = table.states.get_mut(key.slot as usize) else {
                return false;
            };
            match next(&*current) {
                Some(to) if to != *current => {
                    let from = std::mem::replace(current, to.clone());
                    outcome = StoreUpdate::Changed { from, to };
                    true
                }
                _ => {
                    outcome = StoreUpdate::Unchanged(current.clone());
                    false
                }
            }
        });
        outcome
    }
}
