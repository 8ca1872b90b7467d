//! The combatant contract: HP, AC, damage application, and the AC
//! breakdown chain. See `SPEC_FULL.md` §4.6.

use std::collections::HashMap;

use crate::event_bus::{Chain, ChainTopic, Stage};

use super::resolvers::damage::DamageInstance;

/// Ability score block. Modifier is `(score - 10) / 2`, rounded down.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    #[must_use]
    pub fn modifier(score: i32) -> i32 {
        (score - 10).div_euclid(2)
    }

    #[must_use]
    pub fn strength_mod(self) -> i32 {
        Self::modifier(self.strength)
    }

    #[must_use]
    pub fn dexterity_mod(self) -> i32 {
        Self::modifier(self.dexterity)
    }
}

/// Result of applying a batch of damage instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageApplication {
    pub total: i64,
    pub previous_hp: i64,
    pub current_hp: i64,
    pub dropped_to_zero: bool,
}

/// A typed AC contribution produced by a chain modifier.
#[derive(Debug, Clone)]
pub struct ACComponent {
    pub component_type: String,
    pub source_ref: String,
    pub value: i32,
}

/// Event threaded through the AC chain; `components` accumulates
/// contributions, `total` is recomputed by the final stage.
#[derive(Debug, Clone, Default)]
pub struct ACChainEvent {
    pub base_ac: i32,
    pub components: Vec<ACComponent>,
    pub total: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ACBreakdown {
    pub total: i32,
    pub components: Vec<ACComponent>,
}

/// Core combatant capability bundle.
pub trait Combatant {
    fn id(&self) -> &str;
    fn hp(&self) -> i64;
    fn max_hp(&self) -> i64;
    fn set_hp(&mut self, hp: i64);
    fn base_ac(&self) -> i32;
    fn ability_scores(&self) -> AbilityScores;
    fn proficiency_bonus(&self) -> i32;
    fn is_dirty(&self) -> bool;
    fn mark_clean(&mut self);

    /// Apply a batch of already-resistance-reduced damage instances.
    /// HP is clamped at zero.
    fn apply_damage(&mut self, instances: &[DamageInstance]) -> DamageApplication {
        let previous_hp = self.hp();
        let total: i64 = instances.iter().map(|i| i.amount).sum();
        let current_hp = (previous_hp - total).max(0);
        self.set_hp(current_hp);
        DamageApplication {
            total,
            previous_hp,
            current_hp,
            dropped_to_zero: previous_hp > 0 && current_hp == 0,
        }
    }

    /// Compute effective AC via the AC chain, falling back to `base_ac`
    /// when no modifiers are registered.
    fn effective_ac(&self, ac_chain: &ChainTopic<ACChainEvent>) -> ACBreakdown {
        let chain: Chain<ACChainEvent> = ac_chain.publish_with_chain();
        let seed = ACChainEvent {
            base_ac: self.base_ac(),
            components: Vec::new(),
            total: self.base_ac(),
        };
        let resolved = chain
            .execute(seed)
            .unwrap_or(ACChainEvent {
                base_ac: self.base_ac(),
                components: Vec::new(),
                total: self.base_ac(),
            });
        ACBreakdown {
            total: resolved.total,
            components: resolved.components,
        }
    }
}

/// Appends an AC component's value to the running total. Intended to be
/// registered into [`Stage`] by the contributing feature/condition.
pub fn apply_ac_component(mut event: ACChainEvent, component: ACComponent) -> ACChainEvent {
    event.total += component.value;
    event.components.push(component);
    event
}

/// Resolves combatant ids to live combatants. Threaded through resolver
/// context since resolvers only ever see ids.
pub trait CombatantLookup {
    fn get(&self, id: &str) -> Option<&dyn Combatant>;
    fn get_mut(&mut self, id: &str) -> Option<&mut dyn Combatant>;
}

/// Basic in-memory combatant, sufficient for tests and simple hosts.
pub struct SimpleCombatant {
    pub id: String,
    pub hp: i64,
    pub max_hp: i64,
    pub ac: i32,
    pub scores: AbilityScores,
    pub proficiency_bonus: i32,
    pub dirty: bool,
}

impl Combatant for SimpleCombatant {
    fn id(&self) -> &str {
        &self.id
    }
    fn hp(&self) -> i64 {
        self.hp
    }
    fn max_hp(&self) -> i64 {
        self.max_hp
    }
    fn set_hp(&mut self, hp: i64) {
        self.hp = hp;
        self.dirty = true;
    }
    fn base_ac(&self) -> i32 {
        self.ac
    }
    fn ability_scores(&self) -> AbilityScores {
        self.scores
    }
    fn proficiency_bonus(&self) -> i32 {
        self.proficiency_bonus
    }
    fn is_dirty(&self) -> bool {
        self.dirty
    }
    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// In-memory [`CombatantLookup`] backed by a map of [`SimpleCombatant`]s.
#[derive(Default)]
pub struct Roster {
    combatants: HashMap<String, SimpleCombatant>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, combatant: SimpleCombatant) {
        self.combatants.insert(combatant.id.clone(), combatant);
    }
}

impl CombatantLookup for Roster {
    fn get(&self, id: &str) -> Option<&dyn Combatant> {
        self.combatants.get(id).map(|c| c as &dyn Combatant)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut dyn Combatant> {
        self.combatants.get_mut(id).map(|c| c as &mut dyn Combatant)
    }
}
