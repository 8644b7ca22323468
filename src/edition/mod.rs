// Edition status tracking
//
// An editor never mutates an item read from a provider. It works on a
// `Duplicate<T>`: a working copy which remembers its origin and keeps a
// modified/valid status pair. Status transitions are relayed by the
// `EditionTracker` to every registered consumer.

use crate::metrics::Metrics;
use crate::models::{Action, ItemKind, Menu, ObjectItem, Profile};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast;

/// Status transition of a working copy.
///
/// Only emitted when the value actually changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditionChange {
    ModifiedChanged {
        id: String,
        kind: ItemKind,
        modified: bool,
    },

    ValidChanged {
        id: String,
        kind: ItemKind,
        valid: bool,
    },
}

impl EditionChange {
    pub fn id(&self) -> &str {
        match self {
            EditionChange::ModifiedChanged { id, .. } | EditionChange::ValidChanged { id, .. } => id,
        }
    }
}

/// Per-kind behavior needed to track an item under edition.
pub trait Duplicable: fmt::Debug + Send + Sync + Sized + 'static {
    fn edition_id(&self) -> &str;

    fn edition_kind(&self) -> ItemKind;

    /// Copy every per-kind field into a new value.
    ///
    /// Returns `None` for kinds which cannot be duplicated.
    fn try_duplicate(&self) -> Option<Self>;

    /// Field-by-field comparison. Called as `origin.are_equal(current)`.
    fn are_equal(&self, other: &Self) -> bool;

    fn is_valid(&self) -> bool;
}

impl Duplicable for Profile {
    fn edition_id(&self) -> &str {
        self.id()
    }

    fn edition_kind(&self) -> ItemKind {
        ItemKind::Profile
    }

    fn try_duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }

    fn are_equal(&self, other: &Self) -> bool {
        Profile::are_equal(self, other)
    }

    fn is_valid(&self) -> bool {
        Profile::is_valid(self)
    }
}

impl Duplicable for Action {
    fn edition_id(&self) -> &str {
        self.id()
    }

    fn edition_kind(&self) -> ItemKind {
        ItemKind::Action
    }

    fn try_duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }

    fn are_equal(&self, other: &Self) -> bool {
        Action::are_equal(self, other)
    }

    fn is_valid(&self) -> bool {
        Action::is_valid(self)
    }
}

impl Duplicable for Menu {
    fn edition_id(&self) -> &str {
        self.id()
    }

    fn edition_kind(&self) -> ItemKind {
        ItemKind::Menu
    }

    fn try_duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }

    fn are_equal(&self, other: &Self) -> bool {
        Menu::are_equal(self, other)
    }

    fn is_valid(&self) -> bool {
        Menu::is_valid(self)
    }
}

impl Duplicable for ObjectItem {
    fn edition_id(&self) -> &str {
        self.id()
    }

    fn edition_kind(&self) -> ItemKind {
        self.kind()
    }

    fn try_duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }

    fn are_equal(&self, other: &Self) -> bool {
        ObjectItem::are_equal(self, other)
    }

    fn is_valid(&self) -> bool {
        ObjectItem::is_valid(self)
    }
}

/// Receives status transitions of every working copy of a tracker.
///
/// Called synchronously, with no tracker lock held. A consumer may itself
/// trigger another status check; the tracker does no cycle detection.
#[cfg_attr(test, mockall::automock)]
pub trait EditionConsumer: Send + Sync {
    fn on_edition_change(&self, change: &EditionChange);
}

impl<F> EditionConsumer for F
where
    F: Fn(&EditionChange) + Send + Sync,
{
    fn on_edition_change(&self, change: &EditionChange) {
        self(change)
    }
}

/// Handle returned by [`EditionTracker::register_consumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

struct TrackerInner {
    consumers: Mutex<Vec<(ConsumerId, Arc<dyn EditionConsumer>)>>,
    next_consumer_id: AtomicU64,
    change_tx: broadcast::Sender<EditionChange>,
    finalized: AtomicBool,
    metrics: Arc<Metrics>,
}

/// Observer registry for edition status transitions.
///
/// One tracker belongs to an editing context (an editor session or the
/// application). It creates the [`Duplicate`] working copies and relays
/// their status transitions:
/// - to consumers registered with [`register_consumer()`](Self::register_consumer)
/// - to broadcast receivers obtained with [`subscribe()`](Self::subscribe)
///
/// Cloning the tracker gives another handle on the same registry.
///
/// Using a tracker after [`shutdown()`](Self::shutdown) is a programming
/// error: it asserts in debug builds and is logged and ignored otherwise.
#[derive(Clone)]
pub struct EditionTracker {
    inner: Arc<TrackerInner>,
}

impl EditionTracker {
    /// Create a tracker with a broadcast buffer of 100 events
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(Metrics::new()))
    }

    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(TrackerInner {
                consumers: Mutex::new(Vec::new()),
                next_consumer_id: AtomicU64::new(1),
                change_tx,
                finalized: AtomicBool::new(false),
                metrics,
            }),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    pub fn is_active(&self) -> bool {
        !self.inner.finalized.load(Ordering::Acquire)
    }

    /// Tear the tracker down: consumers are released and every later
    /// operation is refused.
    pub fn shutdown(&self) {
        if self.inner.finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        let released = {
            let mut consumers = self.lock_consumers();
            let count = consumers.len();
            consumers.clear();
            count
        };
        tracing::debug!("Edition tracker shut down, {} consumers released", released);
    }

    fn ensure_active(&self, operation: &str) -> bool {
        let active = self.is_active();
        debug_assert!(active, "edition tracker used after shutdown: {operation}");
        if !active {
            tracing::error!("Edition tracker used after shutdown: {}", operation);
        }
        active
    }

    fn lock_consumers(&self) -> std::sync::MutexGuard<'_, Vec<(ConsumerId, Arc<dyn EditionConsumer>)>> {
        self.inner
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a working copy of `origin`.
    ///
    /// The copy starts with `modified == false` and `valid == true`. The
    /// valid status is not computed here: callers must only duplicate items
    /// they know to be valid, or run
    /// [`check_edition_status()`](Duplicate::check_edition_status) right away.
    ///
    /// Returns `None` when the item kind cannot be duplicated.
    pub fn duplicate<T: Duplicable>(&self, origin: &Arc<T>) -> Option<Duplicate<T>> {
        if !self.ensure_active("duplicate") {
            return None;
        }

        let Some(current) = origin.try_duplicate() else {
            tracing::warn!(
                "{} {} does not support duplication",
                origin.edition_kind(),
                origin.edition_id()
            );
            return None;
        };

        if !origin.is_valid() {
            tracing::debug!(
                "Duplicating invalid {} {}: reported valid until checked",
                origin.edition_kind(),
                origin.edition_id()
            );
        }

        self.inner.metrics.record_duplication();
        Some(Duplicate {
            current,
            origin: Some(Arc::downgrade(origin)),
            modified: false,
            valid: true,
            tracker: self.clone(),
        })
    }

    /// Start editing a brand new item which has no origin.
    pub fn new_item<T: Duplicable>(&self, item: T) -> Duplicate<T> {
        self.ensure_active("new_item");
        self.inner.metrics.record_duplication();
        Duplicate {
            current: item,
            origin: None,
            modified: false,
            valid: true,
            tracker: self.clone(),
        }
    }

    /// Add a consumer to the fan-out list.
    pub fn register_consumer(&self, consumer: Arc<dyn EditionConsumer>) -> ConsumerId {
        let id = ConsumerId(self.inner.next_consumer_id.fetch_add(1, Ordering::Relaxed));
        if self.ensure_active("register_consumer") {
            self.lock_consumers().push((id, consumer));
            tracing::debug!("Registered edition consumer {:?}", id);
        }
        id
    }

    /// Remove a consumer. Returns `false` if it was not registered.
    pub fn unregister_consumer(&self, id: ConsumerId) -> bool {
        let mut consumers = self.lock_consumers();
        let before = consumers.len();
        consumers.retain(|(cid, _)| *cid != id);
        let removed = consumers.len() != before;
        if removed {
            tracing::debug!("Unregistered edition consumer {:?}", id);
        }
        removed
    }

    pub fn consumer_count(&self) -> usize {
        self.lock_consumers().len()
    }

    /// Subscribe to status transitions through a broadcast channel.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<EditionChange> {
        self.inner.change_tx.subscribe()
    }

    fn propagate(&self, change: &EditionChange) {
        if !self.is_active() {
            return;
        }

        // Snapshot so that consumers may register, unregister or recheck
        // while being notified.
        let consumers: Vec<Arc<dyn EditionConsumer>> = self
            .lock_consumers()
            .iter()
            .map(|(_, consumer)| Arc::clone(consumer))
            .collect();

        for consumer in consumers {
            consumer.on_edition_change(change);
            self.inner.metrics.record_notification();
        }

        // Ignore send errors - it's OK if no one is listening
        let _ = self.inner.change_tx.send(change.clone());
    }
}

impl Default for EditionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EditionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditionTracker")
            .field("consumers", &self.consumer_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Working copy of an item under edition.
///
/// `modified` is "current differs from origin", `valid` is the per-kind
/// validity of the current state. Both are recomputed by
/// [`check_edition_status()`](Self::check_edition_status), which
/// [`edit()`](Self::edit) runs after every mutation.
///
/// The status check is not recursive: for an item whose children are
/// edited as their own working copies, the caller checks each of them.
#[derive(Debug)]
pub struct Duplicate<T: Duplicable> {
    current: T,
    origin: Option<Weak<T>>,
    modified: bool,
    valid: bool,
    tracker: EditionTracker,
}

impl<T: Duplicable> Duplicate<T> {
    pub fn get(&self) -> &T {
        &self.current
    }

    /// The baseline this copy is compared with, if it is still alive.
    pub fn origin(&self) -> Option<Arc<T>> {
        self.origin.as_ref().and_then(Weak::upgrade)
    }

    /// Rebind the comparison baseline, e.g. after the copy has been saved.
    ///
    /// Status is not rechecked here.
    pub fn set_origin(&mut self, origin: Option<&Arc<T>>) {
        self.origin = origin.map(Arc::downgrade);
    }

    /// Last computed modification status; never recomputes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Last computed validity status; never recomputes.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Explicitly set the modification status.
    ///
    /// Meant for copies without origin, whose status is never derived from a
    /// comparison.
    pub fn set_modified(&mut self, modified: bool) -> Option<EditionChange> {
        if !self.tracker.ensure_active("set_modified") {
            return None;
        }
        self.transition_modified(modified)
    }

    /// Recompute the modified and valid status.
    ///
    /// With a live origin, `modified` becomes "not equal to origin"; without
    /// one it keeps its last value. `valid` is always re-evaluated. Returns
    /// the transitions, which have already been relayed to consumers.
    pub fn check_edition_status(&mut self) -> Vec<EditionChange> {
        if !self.tracker.ensure_active("check_edition_status") {
            return Vec::new();
        }
        self.tracker.inner.metrics.record_status_check();

        let mut changes = Vec::new();

        if let Some(origin) = self.origin() {
            let modified = !origin.are_equal(&self.current);
            changes.extend(self.transition_modified(modified));
        } else if self.origin.is_some() {
            tracing::debug!(
                "Origin of {} {} has been dropped, modified status kept",
                self.current.edition_kind(),
                self.current.edition_id()
            );
        }

        let valid = self.current.is_valid();
        changes.extend(self.transition_valid(valid));

        changes
    }

    /// Apply a mutation and recheck the status.
    pub fn edit<F>(&mut self, edit_fn: F) -> Vec<EditionChange>
    where
        F: FnOnce(&mut T),
    {
        edit_fn(&mut self.current);
        self.check_edition_status()
    }

    /// Make a snapshot of the current state the new origin.
    ///
    /// Returns the snapshot; the caller keeps it alive (typically by storing
    /// it in place of the saved item), as the copy only holds a weak
    /// reference.
    pub fn commit(&mut self) -> Option<Arc<T>> {
        let snapshot = Arc::new(self.current.try_duplicate()?);
        self.set_origin(Some(&snapshot));
        self.check_edition_status();
        Some(snapshot)
    }

    pub fn into_inner(self) -> T {
        self.current
    }

    fn transition_modified(&mut self, modified: bool) -> Option<EditionChange> {
        if self.modified == modified {
            return None;
        }
        self.modified = modified;
        tracing::debug!(
            "{} {} modified={}",
            self.current.edition_kind(),
            self.current.edition_id(),
            modified
        );
        let change = EditionChange::ModifiedChanged {
            id: self.current.edition_id().to_string(),
            kind: self.current.edition_kind(),
            modified,
        };
        self.tracker.propagate(&change);
        Some(change)
    }

    fn transition_valid(&mut self, valid: bool) -> Option<EditionChange> {
        if self.valid == valid {
            return None;
        }
        self.valid = valid;
        tracing::debug!(
            "{} {} valid={}",
            self.current.edition_kind(),
            self.current.edition_id(),
            valid
        );
        let change = EditionChange::ValidChanged {
            id: self.current.edition_id().to_string(),
            kind: self.current.edition_kind(),
            valid,
        };
        self.tracker.propagate(&change);
        Some(change)
    }
}
