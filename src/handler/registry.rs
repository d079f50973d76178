//! Callback registry for fanning inbound messages out to subscribers.
//!
//! The registry maps a message tag to the callbacks registered for it,
//! one per subscriber. Dispatch snapshots the callbacks for the tag before
//! invoking any of them, so a callback may add or remove registrations
//! (including its own) without disturbing the delivery in progress.
//!
//! # Example
//!
//! ```
//! use cozmo_link::handler::{CallbackRegistry, SubscriberId};
//! use cozmo_link::message::{Inbound, Ping};
//!
//! let registry = CallbackRegistry::new();
//! let me = SubscriberId::next();
//!
//! registry
//!     .register(me, |ping: &Ping| {
//!         println!("ping {}", ping.counter);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let ping = Inbound::from(Ping { counter: 1, time_sent_ms: 0.0, is_response: false });
//! assert_eq!(registry.dispatch(&ping), 1);
//!
//! registry.unregister::<Ping>(me).unwrap();
//! assert!(registry.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{LinkError, Result};
use crate::message::{Inbound, InboundKind, InboundMessage};

/// Error a callback may report. Logged by the registry, never propagated.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for callback functions.
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Identity of a subscriber, the second half of a registration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Source for [`SubscriberId::next`]. Starts above the reserved ids.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriberId {
    /// Reserved for the connection's built-in listeners. Not constructible
    /// outside the crate, so callers cannot remove them.
    pub(crate) const CONNECTION: SubscriberId = SubscriberId(0);

    /// Allocate a fresh id, distinct from every other id handed out by
    /// this function in the process.
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-chosen raw id.
    ///
    /// Returns `None` for `0`, which is reserved for the connection.
    pub const fn from_raw(raw: u64) -> Option<Self> {
        if raw == Self::CONNECTION.0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw id value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait for type-erased callbacks stored in the registry.
pub trait Callback: Send + Sync + 'static {
    /// Handle an inbound message.
    fn call(&self, message: &Inbound) -> CallbackResult;
}

/// Wrapper that unwraps the union variant before calling the closure.
pub struct TypedCallback<F, M>
where
    F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
    M: InboundMessage,
{
    callback: F,
    _phantom: PhantomData<fn(&M)>,
}

impl<F, M> TypedCallback<F, M>
where
    F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
    M: InboundMessage,
{
    /// Create a new typed callback.
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _phantom: PhantomData,
        }
    }
}

impl<F, M> Callback for TypedCallback<F, M>
where
    F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
    M: InboundMessage,
{
    fn call(&self, message: &Inbound) -> CallbackResult {
        // Registrations are keyed by M::KIND, so this only misses if the
        // registry is handed a message of a different kind directly.
        match M::extract(message) {
            Some(payload) => (self.callback)(payload),
            None => Ok(()),
        }
    }
}

/// One registered callback.
struct Registration {
    subscriber: SubscriberId,
    callback: Arc<dyn Callback>,
}

/// Registry mapping message tags to subscriber callbacks.
///
/// Shared between the read loop (dispatch) and caller threads
/// (register/unregister); all access goes through one mutex that is never
/// held while a callback runs.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Mutex<HashMap<InboundKind, Vec<Registration>>>,
}

impl CallbackRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for payloads of type `M` on behalf of `subscriber`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::DuplicateRegistration`] if the subscriber already
    /// has a callback for `M`.
    pub fn register<M, F>(&self, subscriber: SubscriberId, callback: F) -> Result<()>
    where
        M: InboundMessage,
        F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock();
        let entries = callbacks.entry(M::KIND).or_default();

        if entries.iter().any(|r| r.subscriber == subscriber) {
            return Err(LinkError::DuplicateRegistration {
                kind: M::KIND,
                subscriber,
            });
        }

        entries.push(Registration {
            subscriber,
            callback: Arc::new(TypedCallback::new(callback)),
        });
        Ok(())
    }

    /// Remove the subscriber's callback for payloads of type `M`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotRegistered`] if there is no such registration.
    pub fn unregister<M: InboundMessage>(&self, subscriber: SubscriberId) -> Result<()> {
        self.unregister_kind(M::KIND, subscriber)
    }

    /// Remove the subscriber's callback for a message tag.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotRegistered`] if there is no such registration.
    pub fn unregister_kind(&self, kind: InboundKind, subscriber: SubscriberId) -> Result<()> {
        let not_registered = || LinkError::NotRegistered { kind, subscriber };
        let mut callbacks = self.callbacks.lock();

        let entries = callbacks.get_mut(&kind).ok_or_else(not_registered)?;
        let position = entries
            .iter()
            .position(|r| r.subscriber == subscriber)
            .ok_or_else(not_registered)?;
        entries.remove(position);

        if entries.is_empty() {
            callbacks.remove(&kind);
        }
        Ok(())
    }

    /// Check whether the subscriber has a callback for payloads of type `M`.
    pub fn is_registered<M: InboundMessage>(&self, subscriber: SubscriberId) -> bool {
        self.callbacks
            .lock()
            .get(&M::KIND)
            .is_some_and(|entries| entries.iter().any(|r| r.subscriber == subscriber))
    }

    /// Number of subscribers for a message tag.
    pub fn subscriber_count(&self, kind: InboundKind) -> usize {
        self.callbacks.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.callbacks.lock().values().map(Vec::len).sum()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Deliver a message to every callback registered for its tag.
    ///
    /// Callbacks registered when dispatch begins are each invoked exactly
    /// once. Errors and panics are logged per subscriber and do not stop
    /// delivery to the others.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, message: &Inbound) -> usize {
        let kind = message.kind();
        let snapshot: Vec<(SubscriberId, Arc<dyn Callback>)> = match self.callbacks.lock().get(&kind)
        {
            Some(entries) => entries
                .iter()
                .map(|r| (r.subscriber, Arc::clone(&r.callback)))
                .collect(),
            None => return 0,
        };

        for (subscriber, callback) in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| callback.call(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Callback for {} (subscriber {}) failed: {}", kind, subscriber, e);
                }
                Err(_) => {
                    tracing::error!("Callback for {} (subscriber {}) panicked", kind, subscriber);
                }
            }
        }

        snapshot.len()
    }
}
