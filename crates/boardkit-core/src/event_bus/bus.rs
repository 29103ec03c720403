//! Event Bus implementation.
//!
//! Provides the generic [`EventBus`] and the handles used to detach from it.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::BusEvent;

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone)]
pub enum EventFilter<C> {
    /// Receive all events.
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<C>),
}

impl<C> Default for EventFilter<C> {
    fn default() -> Self {
        EventFilter::All
    }
}

impl<C: PartialEq> EventFilter<C> {
    /// Check if an event matches this filter
    pub fn matches<E: BusEvent<Category = C>>(&self, event: &E) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

/// Type alias for event handler functions
type EventHandler<E> = Box<dyn Fn(E) + Send + Sync>;

type HandlerMap<E> =
    HashMap<SubscriptionId, (EventFilter<<E as BusEvent>::Category>, EventHandler<E>)>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast.
    pub channel_capacity: usize,
    /// Whether to keep event history.
    pub enable_history: bool,
    /// Maximum number of events to retain in history.
    pub max_history_size: usize,
    /// How long to retain events in history.
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            enable_history: false,
            max_history_size: 1000,
            history_retention: Duration::from_secs(300),
        }
    }
}

/// Event with timestamp for history
#[derive(Debug, Clone)]
struct TimestampedEvent<E> {
    event: E,
    timestamp: Instant,
}

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
    /// Channel is closed
    #[error("Event channel is closed")]
    ChannelClosed,
}

/// Detaches a handler from its bus when dropped.
///
/// The guard only holds a weak reference, so it never keeps the bus alive.
#[must_use = "dropping the guard detaches the handler immediately"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    detach: Option<Box<dyn FnOnce(SubscriptionId) -> bool + Send + Sync>>,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detaches now. Returns true if the handler was still registered.
    pub fn detach(mut self) -> bool {
        self.detach.take().is_some_and(|detach| detach(self.id))
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// Event bus for distributing events of type `E`
pub struct EventBus<E: BusEvent> {
    /// Broadcast channel sender
    sender: broadcast::Sender<E>,
    /// Registered synchronous handlers
    handlers: Arc<RwLock<HandlerMap<E>>>,
    /// Event history (optional)
    history: Arc<RwLock<VecDeque<TimestampedEvent<E>>>>,
    /// Configuration
    config: EventBusConfig,
}

impl<E: BusEvent> EventBus<E> {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(VecDeque::new())),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of async receivers that will receive the event,
    /// or an error if nobody at all is listening.
    pub fn publish(&self, event: E) -> Result<usize, EventBusError> {
        if self.config.enable_history {
            self.add_to_history(&event);
        }

        // Call synchronous handlers
        let handlers = self.handlers.read();
        for (filter, handler) in handlers.values() {
            if filter.matches(&event) {
                handler(event.clone());
            }
        }

        // Send via broadcast channel for async receivers
        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) => {
                if handlers.is_empty() {
                    Err(EventBusError::NoSubscribers)
                } else {
                    Ok(0)
                }
            }
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler runs on the publishing thread, so it should return quickly.
    pub fn subscribe<F>(&self, filter: EventFilter<E::Category>, handler: F) -> SubscriptionId
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let mut handlers = self.handlers.write();
        handlers.insert(id, (filter, Box::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Subscribe and get a guard that unsubscribes when dropped.
    pub fn subscribe_scoped<F>(
        &self,
        filter: EventFilter<E::Category>,
        handler: F,
    ) -> SubscriptionGuard
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let id = self.subscribe(filter, handler);
        let weak: Weak<RwLock<HandlerMap<E>>> = Arc::downgrade(&self.handlers);
        SubscriptionGuard {
            id,
            detach: Some(Box::new(move |id| {
                weak.upgrade()
                    .is_some_and(|handlers| remove_handler::<E>(&handlers, id))
            })),
        }
    }

    /// Get a receiver for manual event polling
    ///
    /// Useful in async contexts that consume events in a tokio task.
    pub fn receiver(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove_handler::<E>(&self.handlers, id)
    }

    /// Get the number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get recent event history (if enabled)
    ///
    /// Returns events since the given instant, or all history if None.
    pub fn history(&self, since: Option<Instant>) -> Vec<E> {
        if !self.config.enable_history {
            return Vec::new();
        }

        let history = self.history.read();
        match since {
            Some(since) => history
                .iter()
                .filter(|e| e.timestamp >= since)
                .map(|e| e.event.clone())
                .collect(),
            None => history.iter().map(|e| e.event.clone()).collect(),
        }
    }

    /// Clear event history
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Add an event to history, maintaining size and age limits
    fn add_to_history(&self, event: &E) {
        let mut history = self.history.write();
        let now = Instant::now();

        history.push_back(TimestampedEvent {
            event: event.clone(),
            timestamp: now,
        });

        let retention = self.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.duration_since(e.timestamp) > retention)
        {
            history.pop_front();
        }

        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

fn remove_handler<E: BusEvent>(handlers: &RwLock<HandlerMap<E>>, id: SubscriptionId) -> bool {
    let removed = handlers.write().remove(&id).is_some();
    if removed {
        tracing::debug!("Subscription {} removed", id);
    }
    removed
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Edited { state: u64 },
        Progress { percent: u8 },
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestCategory {
        Document,
        Build,
    }

    impl BusEvent for TestEvent {
        type Category = TestCategory;

        fn category(&self) -> TestCategory {
            match self {
                TestEvent::Edited { .. } => TestCategory::Document,
                TestEvent::Progress { .. } => TestCategory::Build,
            }
        }
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::<TestEvent>::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(matches!(
            bus.publish(TestEvent::Edited { state: 1 }),
            Err(EventBusError::NoSubscribers)
        ));
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::<TestEvent>::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_scoped_subscription_detaches_on_drop() {
        let bus = EventBus::<TestEvent>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        let guard = bus.subscribe_scoped(EventFilter::All, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(TestEvent::Edited { state: 1 }).ok();
        drop(guard);
        bus.publish(TestEvent::Edited { state: 2 }).ok();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_guard_outliving_bus() {
        let bus = EventBus::<TestEvent>::new();
        let guard = bus.subscribe_scoped(EventFilter::All, |_| {});
        drop(bus);
        assert!(!guard.detach());
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::<TestEvent>::new();
        let document_count = Arc::new(AtomicUsize::new(0));
        let build_count = Arc::new(AtomicUsize::new(0));

        let dc = document_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![TestCategory::Document]),
            move |_| {
                dc.fetch_add(1, Ordering::SeqCst);
            },
        );

        let bc = build_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![TestCategory::Build]),
            move |_| {
                bc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(TestEvent::Edited { state: 3 }).ok();
        bus.publish(TestEvent::Progress { percent: 40 }).ok();
        bus.publish(TestEvent::Progress { percent: 80 }).ok();

        assert_eq!(document_count.load(Ordering::SeqCst), 1);
        assert_eq!(build_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_history_max_size() {
        let config = EventBusConfig {
            enable_history: true,
            max_history_size: 5,
            ..Default::default()
        };
        let bus = EventBus::with_config(config);

        for i in 0..10 {
            bus.publish(TestEvent::Progress { percent: i }).ok();
        }

        let history = bus.history(None);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0], TestEvent::Progress { percent: 5 });

        bus.clear_history();
        assert!(bus.history(None).is_empty());
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::<TestEvent>::new();
        let mut receiver = bus.receiver();

        assert_eq!(bus.publish(TestEvent::Edited { state: 7 }).ok(), Some(1));

        match receiver.recv().await {
            Ok(TestEvent::Edited { state }) => assert_eq!(state, 7),
            other => panic!("Wrong event received: {:?}", other),
        }
    }
}
