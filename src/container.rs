//! # Loadable Observable Container
//!
//! A [`LoadableContainer`] is a mutable cell holding an optional value plus an
//! optional [`LoadState`] tag. It is designed to be handed to a consumer
//! *before* its value is known: the producer that fulfills the request later
//! populates the very same cell, and every subscribed observer is notified of
//! the change without having to re-request or re-subscribe.
//!
//! The container is a cheap-clone handle (cloning it clones the handle, not
//! the cell), so several collaborators can hold the same cell: typically a
//! presentation layer reading and observing it, and a background producer
//! mutating it.
//!
//! The container itself never fails. A failed producing operation is signaled
//! by setting the state to [`LoadState::Error`]; the last-known value is left
//! untouched unless the producer explicitly calls
//! [`clear_value`](LoadableContainer::clear_value).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use uuid::Uuid;

use crate::loading::LoadState;

/// Identifies which field of a [`LoadableContainer`] changed, passed to every
/// observer callback on notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Changed {
    /// The contained value was stored, replaced or cleared.
    Value,
    /// The load state tag changed.
    State,
}

type ObserverFn = Arc<dyn Fn(Changed) + Send + Sync>;

struct Cell<V> {
    value: Option<V>,
    state: Option<LoadState>,
}

struct Inner<V> {
    cell: RwLock<Cell<V>>,
    observers: RwLock<Vec<(Uuid, ObserverFn)>>,
    // Serializes mutations: one set call completes, including its
    // notifications, before the next begins. Never held during reads.
    mutation: Mutex<()>,
}

/// A mutable, observable cell holding an optional value of type `V` and an
/// optional [`LoadState`].
///
/// All methods are synchronous and non-blocking (notification is O(number of
/// observers)). Mutation and observation are safe from different tasks;
/// mutations are serialized so observers never see a torn (value, state)
/// pair.
///
/// Observer callbacks run synchronously on whatever task performed the set.
/// A callback must not synchronously mutate the container it observes (the
/// mutation guard is not reentrant); post such work to an executor instead,
/// see [`MainContext`](crate::dispatch::MainContext).
pub struct LoadableContainer<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for LoadableContainer<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle equality: two handles are equal when they refer to the same cell.
impl<V> PartialEq for LoadableContainer<V> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<V> Eq for LoadableContainer<V> {}

impl<V> core::fmt::Debug for LoadableContainer<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cell = read_lock(&self.inner.cell);
        f.debug_struct("LoadableContainer")
            .field("has_value", &cell.value.is_some())
            .field("state", &cell.state)
            .finish_non_exhaustive()
    }
}

impl<V> Default for LoadableContainer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LoadableContainer<V> {
    /// Creates an empty container: no value, no state ("not yet requested").
    pub fn new() -> Self {
        Self::from_cell(Cell {
            value: None,
            state: None,
        })
    }

    /// Creates a container already populated with `value` and state
    /// [`LoadState::Loaded`].
    ///
    /// Useful when the producer only hands out containers once the data has
    /// been retrieved, so a container without a value is never observed.
    pub fn loaded(value: V) -> Self {
        Self::from_cell(Cell {
            value: Some(value),
            state: Some(LoadState::Loaded),
        })
    }

    fn from_cell(cell: Cell<V>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cell: RwLock::new(cell),
                observers: RwLock::new(Vec::new()),
                mutation: Mutex::new(()),
            }),
        }
    }

    /// Returns the current load state, `None` if loading has not started.
    /// Never blocks on producer work.
    pub fn get_state(&self) -> Option<LoadState> {
        read_lock(&self.inner.cell).state
    }

    /// Whether a value is currently present, without cloning it.
    pub fn has_value(&self) -> bool {
        read_lock(&self.inner.cell).value.is_some()
    }

    /// Stores `state` and notifies every observer with [`Changed::State`].
    ///
    /// No transition legality is checked: any state may follow any other.
    pub fn set_state(&self, state: LoadState) {
        let _guard = mutation_lock(&self.inner.mutation);
        write_lock(&self.inner.cell).state = Some(state);
        self.notify(Changed::State);
    }

    /// Stores `value`, sets the state to [`LoadState::Loaded`], and notifies
    /// every observer: [`Changed::Value`] first, then [`Changed::State`] when
    /// the state was not already `Loaded`. Replacing the value of an
    /// already-loaded container therefore notifies exactly once, for the
    /// value.
    pub fn set_value(&self, value: V) {
        let _guard = mutation_lock(&self.inner.mutation);
        let state_changed = {
            let mut cell = write_lock(&self.inner.cell);
            cell.value = Some(value);
            let state_changed = cell.state != Some(LoadState::Loaded);
            cell.state = Some(LoadState::Loaded);
            state_changed
        };
        self.notify(Changed::Value);
        if state_changed {
            self.notify(Changed::State);
        }
    }

    /// Removes the contained value and notifies observers with
    /// [`Changed::Value`]. The state is left untouched.
    ///
    /// A producer that wants "value absent" semantics after a failure calls
    /// this explicitly; [`set_state`](Self::set_state)`(Error)` alone
    /// preserves the stale-but-present value.
    pub fn clear_value(&self) {
        let _guard = mutation_lock(&self.inner.mutation);
        write_lock(&self.inner.cell).value = None;
        self.notify(Changed::Value);
    }

    /// Registers `callback` to be invoked with the changed field on every
    /// subsequent mutation. Returns a [`Subscription`] handle whose
    /// [`unsubscribe`](Subscription::unsubscribe) removes the registration.
    ///
    /// Subscribing does not retroactively notify: the observer only sees
    /// changes made after this call. Multiple subscriptions from the same
    /// observer are independent.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<V>
    where
        F: Fn(Changed) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        write_lock(&self.inner.observers).push((id, Arc::new(callback)));
        log::debug!("LoadableContainer::subscribe - registered observer {id}");
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of currently-registered observers.
    pub fn observer_count(&self) -> usize {
        read_lock(&self.inner.observers).len()
    }

    /// Creates a non-owning handle to this cell, suitable for registries that
    /// must not keep containers alive past their last real consumer.
    pub fn downgrade(&self) -> WeakContainer<V> {
        WeakContainer(Arc::downgrade(&self.inner))
    }

    /// Invokes every currently-registered callback with `changed`.
    ///
    /// A callback that panics is isolated: the panic is caught and logged,
    /// and the remaining callbacks still run.
    fn notify(&self, changed: Changed) {
        let observers: Vec<(Uuid, ObserverFn)> = read_lock(&self.inner.observers).clone();
        for (id, callback) in observers {
            if catch_unwind(AssertUnwindSafe(|| (*callback)(changed))).is_err() {
                log::warn!(
                    "LoadableContainer::notify - observer {id} panicked on {changed:?}, dropping the fault"
                );
            }
        }
    }
}

impl<V: Clone> LoadableContainer<V> {
    /// Returns a clone of the current value, `None` until the first load
    /// completes. Never blocks on producer work.
    pub fn get_value(&self) -> Option<V> {
        read_lock(&self.inner.cell).value.clone()
    }

    /// Reads value and state as one consistent pair: the returned pair is
    /// never torn across a concurrent mutation.
    pub fn snapshot(&self) -> (Option<V>, Option<LoadState>) {
        let cell = read_lock(&self.inner.cell);
        (cell.value.clone(), cell.state)
    }
}

/// A non-owning handle to a [`LoadableContainer`].
pub struct WeakContainer<V>(Weak<Inner<V>>);

impl<V> Clone for WeakContainer<V> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<V> WeakContainer<V> {
    /// Attempts to recover a strong handle; `None` once every strong handle
    /// has been dropped.
    pub fn upgrade(&self) -> Option<LoadableContainer<V>> {
        self.0.upgrade().map(|inner| LoadableContainer { inner })
    }
}

/// Handle returned by [`LoadableContainer::subscribe`].
///
/// Disposal is explicit: dropping the handle leaves the observer registered
/// for the life of the container; call [`unsubscribe`](Self::unsubscribe) to
/// remove it. The handle holds only a weak reference, so it never keeps the
/// container alive.
pub struct Subscription<V> {
    id: Uuid,
    inner: Weak<Inner<V>>,
}

impl<V> Subscription<V> {
    /// Token identifying this registration.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Removes this registration. Other observers, including other
    /// subscriptions made by the same observer, remain registered.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            write_lock(&inner.observers).retain(|(id, _)| *id != self.id);
            log::debug!("Subscription::unsubscribe - removed observer {}", self.id);
        }
    }
}

// Lock poisoning can only result from an observer or a value-drop panicking;
// the cell contents stay coherent in both cases, so recover the guard.
fn mutation_lock(m: &Mutex<()>) -> std::sync::MutexGuard<'_, ()> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
fn read_lock<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}
fn write_lock<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
