//! Per-instance signal handler.
//!
//! A [`SignalHandler`] is a registry of named signals. Listeners connect to a
//! registered name under a [`ListenerId`] and are invoked synchronously, on the
//! emitting thread, whenever a payload carrying that name is signalled.
//!
//! Dispatch runs on a snapshot of the connections taken under the registry lock;
//! the lock is never held while a callback runs, so callbacks may connect,
//! disconnect or signal again on the same handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::audio_controls::errors::ControlError;

/// A payload that can be dispatched through a [`SignalHandler`].
pub trait Signal: Send + Sync + 'static {
    /// Every signal name this payload type can be dispatched under.
    const NAMES: &'static [&'static str];

    /// Name of the signal this payload is dispatched under.
    fn name(&self) -> &'static str;
}

/// Process-unique identity of a signal listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates a fresh identity.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the identity.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked for every dispatched payload.
pub type SignalCallback<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Connection<S> {
    listener: ListenerId,
    callback: SignalCallback<S>,
    /// Cleared on disconnect so an in-flight snapshot skips the callback.
    active: Arc<AtomicBool>,
}

impl<S> Connection<S> {
    fn new(listener: ListenerId, callback: SignalCallback<S>) -> Self {
        Self {
            listener,
            callback,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl<S> Clone for Connection<S> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener,
            callback: Arc::clone(&self.callback),
            active: Arc::clone(&self.active),
        }
    }
}

type Registry<S> = HashMap<&'static str, Vec<Connection<S>>>;

fn lock_registry<S>(signals: &Mutex<Registry<S>>) -> MutexGuard<'_, Registry<S>> {
    signals.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove_connection<S>(signals: &mut Registry<S>, name: &str, listener: ListenerId) -> bool {
    let Some(connections) = signals.get_mut(name) else {
        return false;
    };

    match connections.iter().position(|c| c.listener == listener) {
        Some(index) => {
            connections.remove(index).deactivate();
            true
        }
        None => false,
    }
}

/// Registry of named signals with synchronous fan-out.
pub struct SignalHandler<S> {
    signals: Arc<Mutex<Registry<S>>>,
}

/// Non-owning handle to a [`SignalHandler`], able to disconnect listeners for as
/// long as the handler is alive.
pub(crate) struct WeakSignalHandler<S> {
    signals: Weak<Mutex<Registry<S>>>,
}

impl<S> WeakSignalHandler<S> {
    /// Disconnects `listener` from `name`. Returns `false` once the handler is gone.
    pub(crate) fn disconnect(&self, name: &str, listener: ListenerId) -> bool {
        let Some(signals) = self.signals.upgrade() else {
            return false;
        };
        remove_connection(&mut lock_registry(&signals), name, listener)
    }
}

impl<S: Signal> SignalHandler<S> {
    /// Creates a handler with no registered signals.
    pub fn new() -> Self {
        Self {
            signals: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a handler with every name in `names` registered.
    pub fn with_signals(names: &[&'static str]) -> Result<Self, ControlError> {
        let handler = Self::new();
        for &name in names {
            handler.add_signal(name)?;
        }
        Ok(handler)
    }

    /// Creates a handler with every name of `S` registered.
    pub fn for_payload() -> Result<Self, ControlError> {
        Self::with_signals(S::NAMES)
    }

    /// Registers a signal name.
    pub fn add_signal(&self, name: &'static str) -> Result<(), ControlError> {
        let mut signals = self.lock();
        if signals.contains_key(name) {
            return Err(ControlError::DuplicateSignal(name.to_string()));
        }
        signals.insert(name, Vec::new());
        Ok(())
    }

    /// Whether `name` has been registered.
    pub fn has_signal(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Connects `listener` to the signal `name`.
    ///
    /// Connecting a listener that is already connected to `name` replaces its
    /// callback.
    pub fn connect<F>(
        &self,
        name: &str,
        listener: ListenerId,
        callback: F,
    ) -> Result<(), ControlError>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let mut signals = self.lock();
        let connections = signals
            .get_mut(name)
            .ok_or_else(|| ControlError::UnknownSignal(name.to_string()))?;

        let connection = Connection::new(listener, Arc::new(callback));
        match connections.iter_mut().find(|c| c.listener == listener) {
            Some(existing) => {
                existing.deactivate();
                *existing = connection;
            }
            None => connections.push(connection),
        }
        Ok(())
    }

    /// Disconnects `listener` from the signal `name`.
    ///
    /// Returns `false` if the listener was not connected.
    pub fn disconnect(&self, name: &str, listener: ListenerId) -> bool {
        remove_connection(&mut self.lock(), name, listener)
    }

    /// Disconnects `listener` from every signal, returning how many connections
    /// were removed.
    pub fn disconnect_all(&self, listener: ListenerId) -> usize {
        let mut signals = self.lock();
        let mut removed = 0;
        for connections in signals.values_mut() {
            connections.retain(|c| {
                if c.listener == listener {
                    c.deactivate();
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        removed
    }

    /// Number of listeners connected to `name`.
    pub fn connection_count(&self, name: &str) -> usize {
        self.lock().get(name).map_or(0, Vec::len)
    }

    /// Dispatches `payload` to every listener connected to its name.
    pub fn signal(&self, payload: &S) {
        let name = payload.name();
        let snapshot = self.lock().get(name).cloned();
        let Some(snapshot) = snapshot else {
            log::warn!("Signal \"{name}\" emitted but never registered");
            return;
        };

        for connection in snapshot {
            if connection.active.load(Ordering::Acquire) {
                (connection.callback)(payload);
            }
        }
    }

    pub(crate) fn downgrade(&self) -> WeakSignalHandler<S> {
        WeakSignalHandler {
            signals: Arc::downgrade(&self.signals),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<S>> {
        lock_registry(&self.signals)
    }
}

impl<S: Signal> Default for SignalHandler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signal> fmt::Debug for SignalHandler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signals = self.lock();
        let mut map = f.debug_map();
        for (name, connections) in signals.iter() {
            map.entry(name, &connections.len());
        }
        map.finish()
    }
}
