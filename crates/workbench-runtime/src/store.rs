#![forbid(unsafe_code)]

//! Consistent-read layout store.
//!
//! Readers load the published [`Layout`] wait-free through `arc-swap`.
//! Writers go through a FIFO navigation queue: a navigation first reserves a
//! slot with [`LayoutStore::begin`] (while its guards and resolvers run
//! elsewhere), then supplies a pure layout transformation with
//! [`LayoutStore::complete`] or withdraws with [`LayoutStore::cancel`].
//! Dropping a [`NavigationTicket`] withdraws it as well.
//!
//! Ready transformations at the head of the queue are applied in order to a
//! private working layout. The working layout is published only once the
//! queue has drained, so a reader never sees a layout that some queued
//! navigation would still change.
//!
//! Outcomes are kept for the most recent `outcome_capacity` settled
//! navigations; older ones are evicted whether taken or not.
//!
//! ```
//! use workbench_layout::{Layout, ViewOptions};
//! use workbench_runtime::{LayoutStore, NavigationOutcome};
//!
//! let store = LayoutStore::new(Layout::new(), 8);
//! let ticket = store
//!     .navigate("open", |layout| {
//!         layout.add_view("view.1", "part.initial", &ViewOptions::default())
//!     })
//!     .unwrap();
//! assert_eq!(store.take_outcome(ticket), Some(NavigationOutcome::Applied));
//! assert!(store.layout().view("view.1").is_some());
//! ```

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwap;
use workbench_layout::{Layout, LayoutError};

use crate::error::StoreError;

/// Settled outcomes retained by [`LayoutStore::new`].
pub const DEFAULT_OUTCOME_CAPACITY: usize = 256;

/// A pure layout transformation queued by a navigation.
pub type LayoutOp = Box<dyn FnOnce(&Layout) -> Result<Layout, LayoutError> + Send>;

/// Identifies a navigation after its ticket has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketId(u64);

impl TicketId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A reserved slot in the navigation queue.
///
/// Consumed by [`LayoutStore::complete`] or [`LayoutStore::cancel`]. A ticket
/// dropped without either is cancelled, so an abandoned navigation never
/// holds back the ones queued after it.
#[must_use = "a ticket blocks the queue until it is completed, cancelled or dropped"]
pub struct NavigationTicket {
    id: TicketId,
    label: String,
    store: Weak<Shared>,
}

impl NavigationTicket {
    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn issued_by(&self, shared: &Arc<Shared>) -> bool {
        std::ptr::eq(self.store.as_ptr(), Arc::as_ptr(shared))
    }

    fn disarm(&mut self) {
        self.store = Weak::new();
    }
}

impl Drop for NavigationTicket {
    fn drop(&mut self) {
        if let Some(shared) = self.store.upgrade() {
            tracing::debug!(
                target: "workbench.store",
                ticket = self.id.0,
                label = %self.label,
                "navigation ticket dropped"
            );
            let _ = shared.settle(self.id, Slot::Cancelled);
        }
    }
}

impl std::fmt::Debug for NavigationTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationTicket")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PartialEq for NavigationTicket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.label == other.label && self.store.ptr_eq(&other.store)
    }
}

impl Eq for NavigationTicket {}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    Applied,
    Rejected(LayoutError),
    /// The transformation panicked; the working layout was left as it was.
    Panicked(String),
    Cancelled,
}

enum Slot {
    Pending,
    Ready(LayoutOp),
    Cancelled,
}

struct Entry {
    id: TicketId,
    label: String,
    slot: Slot,
}

#[derive(Default)]
struct Queue {
    entries: VecDeque<Entry>,
    /// Result of the operations applied since the last publication.
    working: Option<Layout>,
    outcomes: BTreeMap<TicketId, NavigationOutcome>,
    next_id: u64,
    /// Set while some thread is applying the head of the queue.
    draining: bool,
}

impl Queue {
    fn head_settled(&self) -> bool {
        self.entries
            .front()
            .is_some_and(|head| !matches!(head.slot, Slot::Pending))
    }

    fn record(&mut self, id: TicketId, outcome: NavigationOutcome, capacity: usize) {
        let _ = self.outcomes.insert(id, outcome);
        // Ticket ids grow monotonically, so the first key is the oldest.
        while self.outcomes.len() > capacity {
            let _ = self.outcomes.pop_first();
        }
    }
}

struct Shared {
    published: ArcSwap<Layout>,
    queue: Mutex<Queue>,
    generation: AtomicU64,
    max_pending: usize,
    outcome_capacity: usize,
}

impl Shared {
    fn settle(&self, id: TicketId, slot: Slot) -> Result<(), StoreError> {
        let mut queue = self.lock();
        let entry = queue
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(StoreError::UnknownTicket { ticket: id.0 })?;
        entry.slot = slot;
        if queue.draining {
            // The draining thread re-examines the head after every operation.
            return Ok(());
        }
        queue.draining = true;
        self.drain(queue);
        Ok(())
    }

    /// Apply settled entries at the head of the queue; publish once empty.
    ///
    /// Operations run without the queue lock held, so they may settle other
    /// tickets and readers are never blocked behind them.
    fn drain<'a>(&'a self, mut queue: MutexGuard<'a, Queue>) {
        while queue.head_settled() {
            let Some(entry) = queue.entries.pop_front() else {
                break;
            };
            let outcome = match entry.slot {
                Slot::Ready(op) => {
                    let current = match queue.working.take() {
                        Some(working) => working,
                        None => Layout::clone(&self.published.load()),
                    };
                    drop(queue);
                    let result = catch_unwind(AssertUnwindSafe(|| op(&current)));
                    queue = self.lock();
                    match result {
                        Ok(Ok(next)) => {
                            queue.working = Some(next);
                            NavigationOutcome::Applied
                        }
                        Ok(Err(error)) => {
                            tracing::debug!(
                                target: "workbench.store",
                                ticket = entry.id.0,
                                label = %entry.label,
                                error = %error,
                                "navigation rejected"
                            );
                            queue.working = Some(current);
                            NavigationOutcome::Rejected(error)
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!(
                                target: "workbench.store",
                                ticket = entry.id.0,
                                label = %entry.label,
                                panic = %message,
                                "navigation panicked"
                            );
                            queue.working = Some(current);
                            NavigationOutcome::Panicked(message)
                        }
                    }
                }
                Slot::Cancelled => NavigationOutcome::Cancelled,
                Slot::Pending => continue,
            };
            queue.record(entry.id, outcome, self.outcome_capacity);
        }
        queue.draining = false;

        if queue.entries.is_empty()
            && let Some(layout) = queue.working.take()
        {
            if *self.published.load_full() == layout {
                return;
            }
            self.published.store(Arc::new(layout));
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            tracing::info!(target: "workbench.store", generation, "layout published");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

pub struct LayoutStore {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutStore")
            .field("generation", &self.generation())
            .field("pending", &self.pending())
            .field("max_pending", &self.shared.max_pending)
            .field("outcome_capacity", &self.shared.outcome_capacity)
            .finish_non_exhaustive()
    }
}

impl LayoutStore {
    #[must_use]
    pub fn new(layout: Layout, max_pending: usize) -> Self {
        Self::with_outcome_capacity(layout, max_pending, DEFAULT_OUTCOME_CAPACITY)
    }

    /// Like [`new`](Self::new), keeping at most `outcome_capacity` untaken
    /// outcomes.
    #[must_use]
    pub fn with_outcome_capacity(layout: Layout, max_pending: usize, outcome_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                published: ArcSwap::from_pointee(layout),
                queue: Mutex::new(Queue::default()),
                generation: AtomicU64::new(0),
                max_pending,
                outcome_capacity,
            }),
        }
    }

    /// The currently published layout.
    #[must_use]
    pub fn layout(&self) -> Arc<Layout> {
        self.shared.published.load_full()
    }

    /// Borrow the published layout without touching its reference count.
    #[must_use]
    pub fn load_ref(&self) -> arc_swap::Guard<Arc<Layout>> {
        self.shared.published.load()
    }

    /// Number of publications so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Navigations reserved but not yet settled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Settled outcomes not yet taken or evicted.
    #[must_use]
    pub fn retained_outcomes(&self) -> usize {
        self.shared.lock().outcomes.len()
    }

    /// Reserve a slot at the tail of the queue.
    pub fn begin(&self, label: impl Into<String>) -> Result<NavigationTicket, StoreError> {
        let label = label.into();
        let max_pending = self.shared.max_pending;
        let mut queue = self.shared.lock();
        if queue.entries.len() >= max_pending {
            tracing::warn!(
                target: "workbench.store",
                label = %label,
                max_pending,
                "navigation queue full"
            );
            return Err(StoreError::QueueFull { max_pending });
        }
        let id = TicketId(queue.next_id);
        queue.next_id += 1;
        queue.entries.push_back(Entry {
            id,
            label: label.clone(),
            slot: Slot::Pending,
        });
        tracing::debug!(target: "workbench.store", ticket = id.0, label = %label, "navigation queued");
        Ok(NavigationTicket {
            id,
            label,
            store: Arc::downgrade(&self.shared),
        })
    }

    /// Supply the transformation for a reserved slot.
    ///
    /// A ticket issued by another store is rejected with
    /// [`StoreError::UnknownTicket`] and cancelled in the store that issued it.
    pub fn complete<F>(&self, ticket: NavigationTicket, op: F) -> Result<TicketId, StoreError>
    where
        F: FnOnce(&Layout) -> Result<Layout, LayoutError> + Send + 'static,
    {
        self.settle(ticket, Slot::Ready(Box::new(op)))
    }

    /// Withdraw a reserved slot.
    pub fn cancel(&self, ticket: NavigationTicket) -> Result<TicketId, StoreError> {
        self.settle(ticket, Slot::Cancelled)
    }

    /// Reserve and complete in one step.
    pub fn navigate<F>(&self, label: impl Into<String>, op: F) -> Result<TicketId, StoreError>
    where
        F: FnOnce(&Layout) -> Result<Layout, LayoutError> + Send + 'static,
    {
        let ticket = self.begin(label)?;
        self.complete(ticket, op)
    }

    /// Queue a navigation that replaces the whole layout.
    pub fn replace(&self, label: impl Into<String>, layout: Layout) -> Result<TicketId, StoreError> {
        self.navigate(label, move |_| Ok(layout))
    }

    /// Outcome of a settled navigation; `None` while it is still queued,
    /// once taken, or after it has been evicted.
    pub fn take_outcome(&self, id: TicketId) -> Option<NavigationOutcome> {
        self.shared.lock().outcomes.remove(&id)
    }

    fn settle(&self, mut ticket: NavigationTicket, slot: Slot) -> Result<TicketId, StoreError> {
        let id = ticket.id;
        if !ticket.issued_by(&self.shared) {
            return Err(StoreError::UnknownTicket { ticket: id.0 });
        }
        ticket.disarm();
        self.shared.settle(id, slot)?;
        Ok(id)
    }
}
