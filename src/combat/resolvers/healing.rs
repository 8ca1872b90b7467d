//! Healing resolution. See `SPEC_FULL.md` §4.9.

use crate::error::EngineResult;
use crate::event_bus::ChainTopic;

/// A single healing contribution.
#[derive(Debug, Clone)]
pub struct HealingComponent {
    pub source: String,
    pub dice_rolls: Vec<u32>,
    pub flat_bonus: i32,
    pub healing_mod: i32,
}

impl HealingComponent {
    #[must_use]
    pub fn amount(&self) -> i64 {
        let dice: i64 = self.dice_rolls.iter().map(|&r| i64::from(r)).sum();
        dice + i64::from(self.flat_bonus) + i64::from(self.healing_mod)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealingChainEvent {
    pub healer_id: String,
    pub target_id: String,
    pub components: Vec<HealingComponent>,
}

/// Resolve total healing from `event` after running it through `chain`.
/// Application (capping at max HP) is the caller's concern.
pub fn resolve_healing(chain: &ChainTopic<HealingChainEvent>, event: HealingChainEvent) -> EngineResult<i64> {
    let resolved = chain.publish_with_chain().execute(event)?;
    Ok(resolved.components.iter().map(HealingComponent::amount).sum())
}
