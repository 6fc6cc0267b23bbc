//! Publish/subscribe hub for simulation events
//!
//! Subscribers register an [`EventFilter`] for one event kind, optionally
//! narrowed by a predicate, and receive matching events on their own
//! bounded queue. Publishing never blocks: a full subscriber queue defers
//! in order (see [`crate::queue`]).

use crate::queue::{RequestQueue, RequestSender};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Kind of the events [`EntityManager`](crate::EntityManager) turns into
/// despawns. The payload is the entity's [`to_bits`](crate::Entity::to_bits).
pub const DESPAWN_REQUEST: &str = "despawn-request";

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub data: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

pub type EventPredicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Selects events of one kind, optionally by predicate.
#[derive(Clone)]
pub struct EventFilter {
    kind: String,
    predicate: Option<EventPredicate>,
}

impl EventFilter {
    /// Every event of `kind`.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            predicate: None,
        }
    }

    /// Events of `kind` passing `predicate`.
    pub fn with_predicate<F>(kind: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn event_kind(&self) -> &str {
        &self.kind
    }

    pub fn test(&self, event: &Event) -> bool {
        event.kind == self.kind && self.predicate.as_ref().map_or(true, |p| p(event))
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("kind", &self.kind)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

struct Subscriber {
    id: u64,
    filter: EventFilter,
    active: Weak<AtomicBool>,
    sender: RequestSender<Event>,
}

struct BusInner {
    name: String,
    capacity: usize,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
}

/// Shared event hub; clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Bus whose subscribers each get a queue of `capacity` events.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                name: name.into(),
                capacity,
                next_id: AtomicU64::new(0),
                subscribers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = RequestQueue::bounded("event-subscriber", self.inner.capacity);
        let active = Arc::new(AtomicBool::new(true));
        let kind = filter.event_kind().to_string();

        self.inner
            .subscribers
            .write()
            .entry(kind.clone())
            .or_default()
            .push(Subscriber {
                id,
                filter,
                active: Arc::downgrade(&active),
                sender: queue.sender(),
            });
        debug!(bus = self.name(), kind = kind.as_str(), id, "subscribed");

        Subscription {
            id,
            kind,
            active,
            queue,
        }
    }

    /// Stop delivering to `subscription`. Dropping the subscription has the
    /// same effect at the next publish of its kind.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let Some(list) = subscribers.get_mut(&subscription.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != subscription.id);
        before != list.len()
    }

    pub fn publish(&self, kind: impl Into<String>, data: Value) -> usize {
        self.publish_event(Event::new(kind, data))
    }

    /// Deliver `event` to every active subscriber whose filter accepts it.
    /// Returns how many received it.
    pub fn publish_event(&self, event: Event) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();
        {
            let subscribers = self.inner.subscribers.read();
            let Some(list) = subscribers.get(&event.kind) else {
                return 0;
            };
            for subscriber in list {
                let Some(active) = subscriber.active.upgrade() else {
                    gone.push(subscriber.id);
                    continue;
                };
                if !active.load(Ordering::Relaxed) || !subscriber.filter.test(&event) {
                    continue;
                }
                if subscriber.sender.push(event.clone()) {
                    delivered += 1;
                } else {
                    gone.push(subscriber.id);
                }
            }
        }
        if !gone.is_empty() {
            if let Some(list) = self.inner.subscribers.write().get_mut(&event.kind) {
                list.retain(|s| !gone.contains(&s.id));
            }
        }
        trace!(bus = self.name(), kind = event.kind.as_str(), delivered, "published");
        delivered
    }

    /// Live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .get(kind)
            .map_or(0, |list| list.iter().filter(|s| s.active.strong_count() > 0).count())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").field("name", &self.inner.name).finish()
    }
}

/// Receiving end of a subscription.
pub struct Subscription {
    id: u64,
    kind: String,
    active: Arc<AtomicBool>,
    queue: RequestQueue<Event>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Resume delivery. Events published while inactive are not replayed.
    pub fn activate(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Take the events delivered so far, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        self.queue.drain_pending()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard undelivered events, returning how many.
    pub fn clear(&self) -> usize {
        self.queue.clear()
    }
}
