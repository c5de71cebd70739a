//! Topic-based publish/subscribe bus for notifications leaving the core.
//!
//! Built on [`tokio::sync::broadcast`] channels so that every subscriber
//! receives every message and a slow subscriber never blocks the tick.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::World`] | Detections, referee and geometry updates forwarded from the world model |
//! | [`Topic::Strategy`] | Mode changes and role assignments |
//! | [`Topic::Dispatch`] | Commands that could not be produced or sent |
//!
//! Every event is also copied onto a global channel so that consumers like
//! the WebSocket feed can follow all topics with one receiver.

use striker_types::Event;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// World model notifications.
    World,
    /// Output of the strategy engine.
    Strategy,
    /// Command production and transmission problems.
    Dispatch,
}

/// Shared event bus.  Clone it cheaply; all clones share the same channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    all: broadcast::Sender<Event>,
    world: broadcast::Sender<Event>,
    strategy: broadcast::Sender<Event>,
    dispatch: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus; `capacity` applies to every channel independently.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (all, _) = broadcast::channel(capacity);
        let (world, _) = broadcast::channel(capacity);
        let (strategy, _) = broadcast::channel(capacity);
        let (dispatch, _) = broadcast::channel(capacity);
        Self {
            all,
            world,
            strategy,
            dispatch,
        }
    }

    /// Publish `event` on `topic` and on the global channel.
    ///
    /// Returns the number of topic receivers that were handed the event.
    /// Having no subscriber is a normal condition and yields `0`.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        let _ = self.all.send(event.clone());
        self.topic_sender(topic).send(event).unwrap_or(0)
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Subscribe to every event regardless of topic.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.all.subscribe()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::World => &self.world,
            Topic::Strategy => &self.strategy,
            Topic::Dispatch => &self.dispatch,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// * `Err(RecvError::Lagged(n))` – the subscriber fell behind and `n`
    ///   messages were dropped.  The caller decides whether to continue.
    /// * `Err(RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Copy every event from `rx` onto `topic` until `shutdown` flips to `true`
/// or the source channel closes.
///
/// Used with `World::subscribe()` to put world notifications on
/// [`Topic::World`].
pub async fn forward(
    mut rx: broadcast::Receiver<Event>,
    bus: EventBus,
    topic: Topic,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(event) => {
                    bus.publish_to(topic, event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(?topic, lagged_by = n, "forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!(?topic, "forwarder stopped");
}
