//! Staged chains: modifiers register into a fixed stage ordering and run in
//! `(stage, registration order within stage)` sequence against a shared
//! event value. Grounded on the prioritized-modifier evaluation pattern used
//! for combat-results-table resolution elsewhere in this lineage, adapted
//! here to a fixed named-stage ordering instead of a numeric priority field.

use tracing::debug;

use crate::error::EngineResult;

use super::{IdAllocator, SubscriptionId};

/// Fixed execution order for chained-event modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Base,
    Features,
    Conditions,
    Equipment,
    Spells,
    Situational,
    Final,
}

impl Stage {
    /// All stages in execution order.
    pub const ORDER: [Stage; 7] = [
        Stage::Base,
        Stage::Features,
        Stage::Conditions,
        Stage::Equipment,
        Stage::Spells,
        Stage::Situational,
        Stage::Final,
    ];
}

type Modifier<E> = Box<dyn Fn(E) -> EngineResult<E> + Send + Sync>;

/// A chain carries an event value through its stages. Built by
/// [`ChainTopic::publish_with_chain`], consumed by [`Chain::execute`].
pub struct Chain<E> {
    topic_name: &'static str,
    entries: Vec<(Stage, Modifier<E>)>,
}

impl<E> Chain<E> {
    fn new(topic_name: &'static str) -> Self {
        Self {
            topic_name,
            entries: Vec::new(),
        }
    }

    /// Register a modifier into the given stage. Modifiers in the same
    /// stage run in the order they were added.
    pub fn add<F>(&mut self, stage: Stage, modifier: F)
    where
        F: Fn(E) -> EngineResult<E> + Send + Sync + 'static,
    {
        self.entries.push((stage, Box::new(modifier)));
    }

    /// Run every registered modifier in `(stage, registration order)`
    /// sequence, threading the event value through each. The first error
    /// aborts execution and is returned.
    pub fn execute(mut self, event: E) -> EngineResult<E> {
        self.entries
            .sort_by_key(|(stage, _)| Stage::ORDER.iter().position(|s| s == stage).unwrap_or(0));
        debug!(
            topic = self.topic_name,
            modifiers = self.entries.len(),
            "chain execute"
        );
        let mut current = event;
        for (stage, modifier) in &self.entries {
            match modifier(current) {
                Ok(next) => current = next,
                Err(err) => {
                    tracing::warn!(
                        topic = self.topic_name,
                        stage = ?stage,
                        error = %err,
                        "chain modifier failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(current)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type Registrar<E> = Box<dyn Fn(&mut Chain<E>) + Send + Sync>;

/// A chained topic: subscribers register a function that, given a fresh
/// [`Chain`], may add stage-scoped modifiers.
pub struct ChainTopic<E> {
    name: &'static str,
    ids: IdAllocator,
    registrars: Vec<(SubscriptionId, Registrar<E>)>,
}

impl<E> ChainTopic<E> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ids: IdAllocator::default(),
            registrars: Vec::new(),
        }
    }

    /// Register a function invoked on every `publish_with_chain` to
    /// contribute modifiers into the chain.
    pub fn subscribe_with_chain<F>(&mut self, registrar: F) -> SubscriptionId
    where
        F: Fn(&mut Chain<E>) + Send + Sync + 'static,
    {
        let id = self.ids.next();
        debug!(topic = self.name, subscription = ?id, "subscribe_with_chain");
        self.registrars.push((id, Box::new(registrar)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.registrars.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Invite every registrar to contribute modifiers, returning the
    /// resulting chain. Call [`Chain::execute`] to run it.
    #[must_use]
    pub fn publish_with_chain(&self) -> Chain<E> {
        let mut chain = Chain::new(self.name);
        for (_, registrar) in &self.registrars {
            registrar(&mut chain);
        }
        chain
    }

    #[must_use]
    pub fn registrar_count(&self) -> usize {
        self.registrars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_run_in_stage_order_regardless_of_registration_order() {
        let mut topic: ChainTopic<Vec<&'static str>> = ChainTopic::new("test.order");
        topic.subscribe_with_chain(|chain| {
            chain.add(Stage::Final, |mut e: Vec<&'static str>| {
                e.push("final");
                Ok(e)
            });
        });
        topic.subscribe_with_chain(|chain| {
            chain.add(Stage::Base, |mut e: Vec<&'static str>| {
                e.push("base");
                Ok(e)
            });
        });
        topic.subscribe_with_chain(|chain| {
            chain.add(Stage::Conditions, |mut e: Vec<&'static str>| {
                e.push("conditions");
                Ok(e)
            });
        });

        let chain = topic.publish_with_chain();
        let result = chain.execute(Vec::new()).unwrap();
        assert_eq!(result, vec!["base", "conditions", "final"]);
    }

    #[test]
    fn same_stage_modifiers_run_in_registration_order() {
        let mut topic: ChainTopic<Vec<u32>> = ChainTopic::new("test.same_stage");
        topic.subscribe_with_chain(|chain| {
            chain.add(Stage::Features, |mut e: Vec<u32>| {
                e.push(1);
                Ok(e)
            });
            chain.add(Stage::Features, |mut e: Vec<u32>| {
                e.push(2);
                Ok(e)
            });
        });

        let chain = topic.publish_with_chain();
        let result = chain.execute(Vec::new()).unwrap();
        assert_eq!(result, vec![1, 2]);
    }

    #[test]
    fn modifier_error_aborts_execution() {
        let mut topic: ChainTopic<u32> = ChainTopic::new("test.abort");
        topic.subscribe_with_chain(|chain| {
            chain.add(Stage::Base, |e| Ok(e));
            chain.add(Stage::Features, |_| {
                Err(crate::error::EngineError::invalid_argument("bad modifier"))
            });
            chain.add(Stage::Final, |mut e: u32| {
                e += 1000;
                Ok(e)
            });
        });

        let chain = topic.publish_with_chain();
        let result = chain.execute(0);
        assert!(result.is_err());
    }

    #[test]
    fn no_registrars_returns_event_unchanged() {
        let topic: ChainTopic<u32> = ChainTopic::new("test.empty");
        let chain = topic.publish_with_chain();
        assert_eq!(chain.execute(42).unwrap(), 42);
    }
}
