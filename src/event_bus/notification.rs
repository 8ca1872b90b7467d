//! Fan-out notification topics. Handlers observe; they never mutate the
//! published event.

use tracing::debug;

use crate::error::EngineResult;

use super::{IdAllocator, SubscriptionId};

type Handler<E> = Box<dyn Fn(&E) -> EngineResult<()> + Send + Sync>;

/// A single notification topic for event type `E`.
///
/// Publishing with no subscribers is not an error. A handler's error is
/// surfaced to the publisher but does not prevent other subscribers'
/// handlers from also running.
pub struct NotificationTopic<E> {
    name: &'static str,
    ids: IdAllocator,
    subscribers: Vec<(SubscriptionId, Handler<E>)>,
}

impl<E> NotificationTopic<E> {
    /// Create a new topic. `name` is used only for logging.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ids: IdAllocator::default(),
            subscribers: Vec::new(),
        }
    }

    /// Register a handler, invoked in registration order on every publish.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) -> EngineResult<()> + Send + Sync + 'static,
    {
        let id = self.ids.next();
        debug!(topic = self.name, subscription = ?id, "subscribe");
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Detach a previously registered handler. No-op if already detached.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Invoke every subscriber in registration order. The first handler
    /// error is returned to the caller after all handlers have run.
    pub fn publish(&self, event: &E) -> EngineResult<()> {
        debug!(topic = self.name, subscribers = self.subscribers.len(), "publish");
        let mut first_err = None;
        for (_, handler) in &self.subscribers {
            if let Err(err) = handler(event) {
                tracing::warn!(topic = self.name, error = %err, "notification handler failed");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
