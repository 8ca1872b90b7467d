//! Damage resolution: the damage chain, per-type resistance/vulnerability
//! stacking, and application to a target. See `SPEC_FULL.md` §4.8.

use std::collections::HashMap;

use crate::combat::combatant::{CombatantLookup, DamageApplication};
use crate::error::{EngineError, EngineResult};
use crate::event_bus::{ChainTopic, NotificationTopic};

use super::attack::DamageReceivedEvent;

/// A single already-reduced damage amount of one type, ready for
/// `Combatant::apply_damage`.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageInstance {
    pub amount: i64,
    pub damage_type: String,
}

/// A reroll performed by a Great-Weapon-Fighting-style modifier: records
/// the replaced die and its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reroll {
    pub original: u32,
    pub replacement: u32,
}

/// A rich damage component, as produced by an attack or spell, before
/// per-type stacking is resolved. `multiplier` is only set by components
/// contributed purely to adjust another component's type (resistance and
/// vulnerability sources); `None` for base damage.
#[derive(Debug, Clone)]
pub struct DamageComponent {
    pub source: String,
    pub original_dice_rolls: Vec<u32>,
    pub final_dice_rolls: Vec<u32>,
    pub flat_bonus: i32,
    pub damage_type: String,
    pub is_critical: bool,
    pub multiplier: Option<f64>,
    pub rerolls: Vec<Reroll>,
}

impl DamageComponent {
    #[must_use]
    pub fn base_amount(&self) -> i64 {
        let dice: i64 = self.final_dice_rolls.iter().map(|&r| i64::from(r)).sum();
        dice + i64::from(self.flat_bonus)
    }
}

/// Event threaded through the damage chain.
#[derive(Debug, Clone, Default)]
pub struct DamageChainEvent {
    pub components: Vec<DamageComponent>,
}

/// Resolve multipliers for damage of one type by D&D 5e stacking rules:
/// immunity (`0.0`) trumps all; multiple resistances don't stack past
/// `0.5`; multiple vulnerabilities don't stack past `2.0`; a resistance
/// and a vulnerability on the same type cancel to `1.0`.
fn resolve_factor(multipliers: &[f64]) -> f64 {
    if multipliers.iter().any(|&m| m == 0.0) {
        return 0.0;
    }
    let has_resistance = multipliers.iter().any(|&m| m < 1.0);
    let has_vulnerability = multipliers.iter().any(|&m| m > 1.0);
    match (has_resistance, has_vulnerability) {
        (true, true) => 1.0,
        (true, false) => 0.5,
        (false, true) => 2.0,
        (false, false) => 1.0,
    }
}

/// Run `event` through `chain`, then group components by type and apply
/// resistance/vulnerability stacking, returning per-type reduced amounts.
pub fn resolve_damage(
    chain: &ChainTopic<DamageChainEvent>,
    event: DamageChainEvent,
) -> EngineResult<Vec<DamageInstance>> {
    let resolved = chain.publish_with_chain().execute(event)?;

    let mut base_by_type: HashMap<String, i64> = HashMap::new();
    let mut multipliers_by_type: HashMap<String, Vec<f64>> = HashMap::new();

    for component in &resolved.components {
        if let Some(multiplier) = component.multiplier {
            multipliers_by_type
                .entry(component.damage_type.clone())
                .or_default()
                .push(multiplier);
        } else {
            *base_by_type.entry(component.damage_type.clone()).or_insert(0) += component.base_amount();
        }
    }

    let mut instances = Vec::new();
    for (damage_type, base) in base_by_type {
        let factor = multipliers_by_type
            .get(&damage_type)
            .map(|ms| resolve_factor(ms))
            .unwrap_or(1.0);
        let amount = ((base as f64) * factor).floor() as i64;
        instances.push(DamageInstance { amount, damage_type });
    }
    Ok(instances)
}

/// Either simple flat instances (spells, hazards) or rich components
/// (attacks) — never both.
pub enum DamageInput {
    Instances(Vec<DamageInstance>),
    Components(Vec<DamageComponent>),
}

/// `DealDamage`: resolves `input` to per-type instances (running rich
/// components through the damage chain first), calls `target.apply_damage`
/// with them, publishes one `damage.received` notification per instance,
/// and returns the application result.
pub fn deal_damage(
    chain: &ChainTopic<DamageChainEvent>,
    damage_received: &NotificationTopic<DamageReceivedEvent>,
    lookup: &mut dyn CombatantLookup,
    source_id: &str,
    target_id: &str,
    input: DamageInput,
) -> EngineResult<DamageApplication> {
    let instances = match input {
        DamageInput::Instances(instances) => {
            if instances.is_empty() {
                return Err(EngineError::invalid_argument("DealDamage requires at least one instance"));
            }
            instances
        }
        DamageInput::Components(components) => {
            if components.is_empty() {
                return Err(EngineError::invalid_argument("DealDamage requires at least one component"));
            }
            resolve_damage(chain, DamageChainEvent { components })?
        }
    };

    let target = lookup
        .get_mut(target_id)
        .ok_or_else(|| EngineError::not_found(format!("combatant '{target_id}' not found")))?;
    let applied = target.apply_damage(&instances);

    for instance in &instances {
        let _ = damage_received.publish(&DamageReceivedEvent {
            target_id: target_id.to_string(),
            source_id: source_id.to_string(),
            amount: instance.amount,
            damage_type: instance.damage_type.clone(),
        });
    }

    Ok(applied)
}
