//! Conditions: runtime objects that subscribe stage-scoped modifiers into
//! the combat chains while applied. See `SPEC_FULL.md` §3 "Condition".

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::event_bus::SubscriptionId;

use super::combatant::ACChainEvent;
use super::resolvers::attack::AttackChainEvent;
use super::resolvers::damage::DamageChainEvent;
use super::resolvers::movement::MovementChainEvent;

/// Stable `(module, type, id)` identifier, used for chain-stage dispatch
/// and persistence round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    pub module: String,
    pub kind: String,
    pub id: String,
}

impl Ref {
    #[must_use]
    pub fn new(module: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// The set of chains a condition may hook into. A condition typically
/// implements only the subset it needs; the rest default to no-ops.
pub trait ConditionBehavior: Send + Sync {
    fn on_attack(&self, event: AttackChainEvent) -> EngineResult<AttackChainEvent> {
        Ok(event)
    }
    fn on_damage(&self, event: DamageChainEvent) -> EngineResult<DamageChainEvent> {
        Ok(event)
    }
    fn on_ac(&self, event: ACChainEvent) -> EngineResult<ACChainEvent> {
        Ok(event)
    }
    fn on_movement(&self, event: MovementChainEvent) -> EngineResult<MovementChainEvent> {
        Ok(event)
    }
}

/// Serializable description of an applied condition, independent of its
/// live behavior — the persisted form a `ContentFactory` reconstitutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub condition_ref: Ref,
    pub character_id: String,
    pub source: Option<String>,
}

/// Tracks whether a condition is currently subscribed; `Apply`/`Remove`
/// enforce the detached -> applied -> detached lifecycle.
pub struct AppliedCondition {
    pub record: ConditionRecord,
    subscriptions: Vec<SubscriptionId>,
}

impl AppliedCondition {
    #[must_use]
    pub fn new(record: ConditionRecord) -> Self {
        Self {
            record,
            subscriptions: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Record subscription ids obtained by registering the condition's
    /// behavior into the relevant chains. Errors if already applied.
    pub fn apply(&mut self, subscriptions: Vec<SubscriptionId>) -> EngineResult<()> {
        if self.is_applied() {
            return Err(EngineError::already_exists(format!(
                "condition '{}' already applied to {}",
                self.record.condition_ref.id, self.record.character_id
            )));
        }
        self.subscriptions = subscriptions;
        Ok(())
    }

    /// Returns the subscription ids to detach, clearing internal state.
    /// Idempotent: returns an empty vec when already detached.
    pub fn remove(&mut self) -> Vec<SubscriptionId> {
        std::mem::take(&mut self.subscriptions)
    }

    #[must_use]
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json_like::to_string(&self.record)
    }
}

/// Minimal RON-backed serialization used in place of a JSON dependency,
/// matching the rest of this crate's persistence format. Named for the
/// spec's "JSON/RON serialization" requirement — callers needing exact
/// JSON should serialize `ConditionRecord` with their own `serde_json`.
mod serde_json_like {
    use super::ConditionRecord;
    use crate::error::EngineResult;

    pub(super) fn to_string(record: &ConditionRecord) -> EngineResult<String> {
        Ok(ron::to_string(record)?)
    }
}
