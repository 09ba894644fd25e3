use std::{
    collections::VecDeque,
    fmt, mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use log::{debug, warn};

use crate::{
    codec::decode_value,
    registry::{ApplyCallback, SnapshotProvider},
    CodecError, InstanceKey, SyncRole, Synk, SynkError, SynkPacket, SynkValue,
};

/// Callback fired with the new value whenever a Property's value changes
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Property::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverKey(u64);

enum PropertyImpl<T: SynkValue> {
    Authority(AuthorityProperty<T>),
    Replica(ReplicaProperty<T>),
}

impl<T: SynkValue> PropertyImpl<T> {
    fn name(&self) -> &str {
        match self {
            PropertyImpl::Authority(_) => "Authority",
            PropertyImpl::Replica(_) => "Replica",
        }
    }

    fn cell(&self) -> &Arc<FieldCell<T>> {
        match self {
            PropertyImpl::Authority(inner) => &inner.cell,
            PropertyImpl::Replica(inner) => &inner.cell,
        }
    }
}

/// A synchronized field of one instance.
///
/// On the authority, every `set` that changes the value is sent to all
/// registered send handlers, and the field takes part in snapshots for new
/// clients. On a replica, the value follows packets routed through
/// [`Synk::handle_inbound_data`], and local `set`s never leave the process.
///
/// Dropping the Property leaves its registry entries in place but inert; call
/// [`Synk::deregister_instance`] to clear them.
pub struct Property<T: SynkValue> {
    inner: PropertyImpl<T>,
}

impl<T: SynkValue> Property<T> {
    /// Declare a field named `var_name` on `instance`, registering it with
    /// `synk` according to its role. Declaring the same name twice on one
    /// instance replaces the earlier registration.
    pub fn new(
        synk: &Synk,
        instance: InstanceKey,
        var_name: impl Into<String>,
        default_value: T,
    ) -> Self {
        let cell = Arc::new(FieldCell::new(instance, var_name.into(), default_value));

        let inner = match synk.role() {
            SyncRole::Authority => {
                synk.write_registry().insert_snapshot_provider(
                    &instance,
                    &cell.var_name,
                    snapshot_provider(&cell),
                );
                PropertyImpl::Authority(AuthorityProperty {
                    cell,
                    synk: synk.clone(),
                    outbound: Mutex::new(Outbound {
                        draining: false,
                        pending: VecDeque::new(),
                    }),
                })
            }
            SyncRole::Replica => {
                synk.write_registry().insert_apply_callback(
                    &instance,
                    &cell.var_name,
                    apply_callback(&cell),
                );
                PropertyImpl::Replica(ReplicaProperty {
                    cell,
                    warn_on_write: synk.config().warn_on_replica_write,
                })
            }
        };

        Self { inner }
    }

    /// Current value
    pub fn get(&self) -> T {
        T::clone(&*self.cell().read().current)
    }

    /// Borrow the current value without cloning it. No lock is held while `f`
    /// runs, so `f` may write to this Property; it keeps seeing the value
    /// from before its own write.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let current = self.cell().read().current.clone();
        f(&*current)
    }

    /// Write a new value.
    ///
    /// Writing the value the field already holds does nothing and returns
    /// `Ok(false)`. On the authority a real change is broadcast to every send
    /// handler, and a handler failure is returned after the value has been
    /// updated. On a replica the change stays local.
    ///
    /// Send handlers always receive the writes of a field in the order they
    /// were committed, and observers run after the send handlers have seen
    /// the change. A write made while the same field is still broadcasting
    /// (from an observer, a send handler or another thread) is queued behind
    /// it: it returns `Ok(true)` right away, and the call that started the
    /// broadcast sends it and reports any handler failure.
    pub fn set(&self, value: T) -> Result<bool, SynkError> {
        match &self.inner {
            PropertyImpl::Authority(inner) => inner.set(value),
            PropertyImpl::Replica(inner) => Ok(inner.set(value)),
        }
    }

    /// Call `observer` with the new value after every change, whether from a
    /// local write or an inbound packet
    pub fn subscribe<F>(&self, observer: F) -> ObserverKey
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let mut state = self.cell().write();
        let key = ObserverKey(state.next_observer);
        state.next_observer += 1;
        state.observers.push((key, observer));
        key
    }

    /// Returns whether the observer was still subscribed
    pub fn unsubscribe(&self, key: ObserverKey) -> bool {
        let mut state = self.cell().write();
        let before = state.observers.len();
        state.observers.retain(|(observer_key, _)| *observer_key != key);
        state.observers.len() != before
    }

    pub fn var_name(&self) -> &str {
        &self.cell().var_name
    }

    pub fn instance(&self) -> InstanceKey {
        self.cell().instance
    }

    pub fn role(&self) -> SyncRole {
        match &self.inner {
            PropertyImpl::Authority(_) => SyncRole::Authority,
            PropertyImpl::Replica(_) => SyncRole::Replica,
        }
    }

    pub fn default_value(&self) -> &T {
        &self.cell().default_value
    }

    /// Whether the field currently holds its default value
    pub fn is_default(&self) -> bool {
        self.cell().is_default()
    }

    fn cell(&self) -> &Arc<FieldCell<T>> {
        self.inner.cell()
    }
}

impl<T: SynkValue + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("kind", &self.inner.name())
            .field("instance", &self.instance())
            .field("var_name", &self.var_name())
            .field("value", &self.get())
            .finish()
    }
}

struct AuthorityProperty<T: SynkValue> {
    cell: Arc<FieldCell<T>>,
    synk: Synk,
    outbound: Mutex<Outbound<T>>,
}

/// Committed changes waiting to be broadcast, oldest first
struct Outbound<T> {
    draining: bool,
    pending: VecDeque<Change<T>>,
}

struct Change<T> {
    wire: String,
    value: T,
    observers: Vec<Observer<T>>,
}

impl<T: SynkValue> AuthorityProperty<T> {
    fn set(&self, value: T) -> Result<bool, SynkError> {
        if *self.cell.read().current == value {
            return Ok(false);
        }

        // Encode before committing so a codec failure leaves the field as it was
        let wire = SynkPacket::for_value(&self.cell.var_name, &value)?.encode()?;

        {
            // commit and enqueue under one lock so queue order is commit order
            let mut outbound = self.outbound();
            let Some(observers) = self.cell.replace(value.clone()) else {
                return Ok(false);
            };
            outbound.pending.push_back(Change {
                wire,
                value,
                observers,
            });
            if outbound.draining {
                debug!(
                    "Authority Property: {:?} of {} changed during a broadcast, queued",
                    self.cell.var_name, self.cell.instance
                );
                return Ok(true);
            }
            outbound.draining = true;
        }

        debug!(
            "Authority Property: {:?} of {} changed, broadcasting",
            self.cell.var_name, self.cell.instance
        );
        self.drain()?;
        Ok(true)
    }

    /// Broadcast queued changes until none are left, notifying observers of
    /// each one after its broadcast
    fn drain(&self) -> Result<(), SynkError> {
        loop {
            let change = {
                let mut outbound = self.outbound();
                match outbound.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        outbound.draining = false;
                        return Ok(());
                    }
                }
            };

            if let Err(err) = self.synk.dispatch(&self.cell.instance, &change.wire) {
                let skipped = {
                    let mut outbound = self.outbound();
                    outbound.draining = false;
                    mem::take(&mut outbound.pending)
                };
                if !skipped.is_empty() {
                    warn!(
                        "Authority Property: broadcast of {:?} of {} failed, dropping {} queued change(s)",
                        self.cell.var_name,
                        self.cell.instance,
                        skipped.len()
                    );
                }
                notify(&change.observers, &change.value);
                for change in skipped {
                    notify(&change.observers, &change.value);
                }
                return Err(err);
            }

            notify(&change.observers, &change.value);
        }
    }

    fn outbound(&self) -> MutexGuard<'_, Outbound<T>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ReplicaProperty<T: SynkValue> {
    cell: Arc<FieldCell<T>>,
    warn_on_write: bool,
}

impl<T: SynkValue> ReplicaProperty<T> {
    fn set(&self, value: T) -> bool {
        if self.warn_on_write {
            warn!(
                "Replica Property: {:?} of {} set locally, the change will not reach the authority",
                self.cell.var_name, self.cell.instance
            );
        }
        self.cell.apply(value)
    }
}

/// State shared between a Property and the closures it registers
struct FieldCell<T: SynkValue> {
    instance: InstanceKey,
    var_name: String,
    default_value: T,
    state: RwLock<FieldState<T>>,
}

struct FieldState<T: SynkValue> {
    current: Arc<T>,
    observers: Vec<(ObserverKey, Observer<T>)>,
    next_observer: u64,
}

impl<T: SynkValue> FieldCell<T> {
    fn new(instance: InstanceKey, var_name: String, default_value: T) -> Self {
        Self {
            instance,
            var_name,
            state: RwLock::new(FieldState {
                current: Arc::new(default_value.clone()),
                observers: Vec::new(),
                next_observer: 0,
            }),
            default_value,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FieldState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FieldState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_default(&self) -> bool {
        *self.read().current == self.default_value
    }

    /// Store `value` if it differs from the current one, returning the
    /// observers to notify once the lock is released
    fn replace(&self, value: T) -> Option<Vec<Observer<T>>> {
        let mut state = self.write();
        if *state.current == value {
            return None;
        }
        state.current = Arc::new(value);
        Some(
            state
                .observers
                .iter()
                .map(|(_, observer)| observer.clone())
                .collect(),
        )
    }

    /// Replace and notify. Returns whether the value changed.
    fn apply(&self, value: T) -> bool {
        match self.replace(value.clone()) {
            Some(observers) => {
                notify(&observers, &value);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Result<Option<SynkPacket>, CodecError> {
        let state = self.read();
        if *state.current == self.default_value {
            return Ok(None);
        }
        SynkPacket::for_value(&self.var_name, &*state.current).map(Some)
    }
}

fn notify<T>(observers: &[Observer<T>], value: &T) {
    for observer in observers {
        observer(value);
    }
}

fn snapshot_provider<T: SynkValue>(cell: &Arc<FieldCell<T>>) -> SnapshotProvider {
    let cell: Weak<FieldCell<T>> = Arc::downgrade(cell);
    Arc::new(move || -> Result<Option<SynkPacket>, CodecError> {
        match cell.upgrade() {
            Some(cell) => cell.snapshot(),
            None => Ok(None),
        }
    })
}

fn apply_callback<T: SynkValue>(cell: &Arc<FieldCell<T>>) -> ApplyCallback {
    let weak: Weak<FieldCell<T>> = Arc::downgrade(cell);
    let var_name = cell.var_name.clone();
    let instance = cell.instance;
    Arc::new(move |data: &str| -> Result<(), CodecError> {
        let Some(cell) = weak.upgrade() else {
            warn!(
                "Replica Property: {:?} of {} was dropped, ignoring update",
                var_name, instance
            );
            return Ok(());
        };
        let value: T = decode_value(data)?;
        cell.apply(value);
        Ok(())
    })
}
