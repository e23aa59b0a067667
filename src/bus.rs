//! Change notification between execution contexts.
//!
//! A [`ChangeHub`] is the shared medium (the role browser storage events play
//! between tabs). Each context attaches once and gets an [`InstanceBus`]
//! tagged with its instance id. A broadcast reaches every attached bus
//! *except* the writer's own; a writer that wants its own subscribers to react
//! calls [`InstanceBus::notify_local`] explicitly.
//!
//! Delivery is fire-and-forget and carries no ordering guarantee relative to
//! polling. Subscribers should treat an event as "something changed, re-read"
//! rather than trusting its payload.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::Document;

/// Error a subscriber may report; it is logged and otherwise ignored.
pub type HandlerError = Box<dyn Error + Send + Sync>;

type Handler = dyn Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync;

/// Notification that the stored document changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Storage key that changed.
    pub key: String,
    /// Serialized document after the change, if any.
    pub new_value: Option<String>,
    /// Serialized document before the change, if known.
    pub old_value: Option<String>,
}

impl ChangeEvent {
    /// Parse `new_value`. Returns `None` when absent or malformed.
    #[must_use]
    pub fn new_document(&self) -> Option<Document> {
        self.new_value
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

struct BusInner {
    instance_id: String,
    next_handler: AtomicU64,
    handlers: Mutex<Vec<(u64, Arc<Handler>)>>,
}

impl BusInner {
    fn dispatch(&self, event: &ChangeEvent) {
        let handlers: Vec<Arc<Handler>> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            if let Err(e) = handler(event) {
                warn!(instance = %self.instance_id, error = %e, "change subscriber failed");
            }
        }
    }
}

/// The medium shared by all contexts.
#[derive(Clone, Default)]
pub struct ChangeHub {
    buses: Arc<Mutex<Vec<Weak<BusInner>>>>,
}

impl fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHub")
            .field("attached", &self.attached())
            .finish()
    }
}

impl ChangeHub {
    /// Create a hub with no attached contexts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a context and return its bus.
    pub fn attach(&self, instance_id: impl Into<String>) -> InstanceBus {
        let inner = Arc::new(BusInner {
            instance_id: instance_id.into(),
            next_handler: AtomicU64::new(0),
            handlers: Mutex::new(Vec::new()),
        });
        self.buses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&inner));
        InstanceBus {
            inner,
            hub: self.clone(),
        }
    }

    /// Number of live attached buses.
    #[must_use]
    pub fn attached(&self) -> usize {
        self.buses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|b| b.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every attached context except `origin`.
    pub fn broadcast(&self, origin: &str, event: &ChangeEvent) {
        let targets: Vec<Arc<BusInner>> = {
            let mut buses = self.buses.lock().unwrap_or_else(PoisonError::into_inner);
            buses.retain(|b| b.strong_count() > 0);
            buses
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|b| b.instance_id != origin)
                .collect()
        };
        for bus in targets {
            bus.dispatch(event);
        }
    }
}

/// One context's view of the hub.
#[derive(Clone)]
pub struct InstanceBus {
    inner: Arc<BusInner>,
    hub: ChangeHub,
}

impl fmt::Debug for InstanceBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceBus")
            .field("instance_id", &self.inner.instance_id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl InstanceBus {
    /// Identifier of the owning context.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    /// Register `handler`; it stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.inner.next_handler.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `event` to this context's own subscribers.
    pub fn notify_local(&self, event: &ChangeEvent) {
        self.inner.dispatch(event);
    }

    /// Deliver `event` to every other context.
    pub fn publish(&self, event: &ChangeEvent) {
        self.hub.broadcast(&self.inner.instance_id, event);
    }
}

/// Handle keeping a subscriber registered.
#[must_use = "dropping a Subscription unsubscribes the handler"]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    /// Remove the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
