//! Recoverable resources: counters that subscribe to rest events and
//! self-restore. See `SPEC_FULL.md` §3 "Recoverable resource".

use std::sync::{Arc, Mutex};

use crate::error::{EngineError, EngineResult};
use crate::event_bus::{NotificationTopic, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestType {
    ShortRest,
    LongRest,
    TurnStart,
}

#[derive(Debug, Clone)]
pub struct RestEvent {
    pub character_id: String,
    pub rest_type: RestType,
}

/// Shared mutable counter state, cloned into the subscription closure so
/// the resource can be restored from inside the bus callback.
#[derive(Debug, Clone, Copy)]
struct Counter {
    current: u32,
    maximum: u32,
}

/// A counter bound to a character that restores on matching rest events.
/// Detached on construction; call [`RecoverableResource::apply`] to
/// subscribe it to a bus.
pub struct RecoverableResource {
    pub character_id: String,
    pub reset_type: RestType,
    state: Arc<Mutex<Counter>>,
    subscription: Option<SubscriptionId>,
}

impl RecoverableResource {
    #[must_use]
    pub fn new(character_id: impl Into<String>, maximum: u32, reset_type: RestType) -> Self {
        Self {
            character_id: character_id.into(),
            reset_type,
            state: Arc::new(Mutex::new(Counter {
                current: maximum,
                maximum,
            })),
            subscription: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.state.lock().unwrap().current
    }

    #[must_use]
    pub fn maximum(&self) -> u32 {
        self.state.lock().unwrap().maximum
    }

    pub fn consume(&mut self, amount: u32) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        if amount > state.current {
            return Err(EngineError::resource_exhausted(format!(
                "recoverable resource for {}",
                self.character_id
            )));
        }
        state.current -= amount;
        Ok(())
    }

    /// Whether a rest of `event.rest_type` restores this resource.
    /// A long rest restores both long-rest and short-rest resources; a
    /// short rest restores only short-rest resources; `turn_start` only
    /// matches `turn_start` resources.
    fn satisfied_by(&self, event: &RestEvent) -> bool {
        if event.character_id != self.character_id {
            return false;
        }
        match (self.reset_type, event.rest_type) {
            (RestType::ShortRest, RestType::ShortRest | RestType::LongRest) => true,
            (RestType::LongRest, RestType::LongRest) => true,
            (RestType::TurnStart, RestType::TurnStart) => true,
            _ => false,
        }
    }

    /// Subscribe to `bus`, restoring to full whenever a matching rest
    /// event is published. No-op if already applied.
    pub fn apply(&mut self, bus: &mut NotificationTopic<RestEvent>) -> EngineResult<()> {
        if self.subscription.is_some() {
            return Err(EngineError::already_exists("recoverable resource already applied"));
        }
        let state = self.state.clone();
        let character_id = self.character_id.clone();
        let reset_type = self.reset_type;
        let id = bus.subscribe(move |event: &RestEvent| {
            if event.character_id != character_id {
                return Ok(());
            }
            let matches = match (reset_type, event.rest_type) {
                (RestType::ShortRest, RestType::ShortRest | RestType::LongRest) => true,
                (RestType::LongRest, RestType::LongRest) => true,
                (RestType::TurnStart, RestType::TurnStart) => true,
                _ => false,
            };
            if matches {
                let mut state = state.lock().unwrap();
                state.current = state.maximum;
            }
            Ok(())
        });
        self.subscription = Some(id);
        Ok(())
    }

    /// Unsubscribe from `bus`. Idempotent when already detached.
    pub fn remove(&mut self, bus: &mut NotificationTopic<RestEvent>) {
        if let Some(id) = self.subscription.take() {
            bus.unsubscribe(id);
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.subscription.is_some()
    }
}
