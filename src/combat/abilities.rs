//! Combat abilities: named invocations that consume an action-economy slot
//! and either grant capacity or publish a notification. See `SPEC_FULL.md`
//! §3 "Combat ability" and §4.5.

use crate::error::EngineResult;
use crate::event_bus::NotificationTopic;

use super::conditions::Ref;
use super::economy::ActionEconomy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Standard,
    Bonus,
    Reaction,
    Free,
}

#[derive(Debug, Clone)]
pub struct DodgeActivated {
    pub character_id: String,
}

#[derive(Debug, Clone)]
pub struct DisengageActivated {
    pub character_id: String,
}

/// Universal abilities every combatant has access to, independent of
/// class/race content. Content libraries (out of scope) register
/// additional abilities through the same [`CombatAbility`] contract.
pub trait CombatAbility {
    fn action_type(&self) -> ActionType;
    fn ability_ref(&self) -> Ref;

    /// Consume the matching economy slot and apply the ability's effect.
    fn activate(&self, character_id: &str, economy: &mut ActionEconomy) -> EngineResult<AbilityOutcome>;
}

/// What an ability produced, for the turn manager to surface or act on.
#[derive(Debug, Clone, Default)]
pub struct AbilityOutcome {
    pub notification: Option<String>,
}

fn consume_for(action_type: ActionType, economy: &mut ActionEconomy) -> EngineResult<()> {
    match action_type {
        ActionType::Standard => economy.consume_action(),
        ActionType::Bonus => economy.consume_bonus_action(),
        ActionType::Reaction => economy.consume_reaction(),
        ActionType::Free => Ok(()),
    }
}

/// Attack: a standard action that grants one attack (plus any
/// `extra_attacks` from class features) this turn.
pub struct Attack {
    pub extra_attacks: u32,
}

impl CombatAbility for Attack {
    fn action_type(&self) -> ActionType {
        ActionType::Standard
    }

    fn ability_ref(&self) -> Ref {
        Ref::new("dnd5e", "combat_abilities", "attack")
    }

    fn activate(&self, _character_id: &str, economy: &mut ActionEconomy) -> EngineResult<AbilityOutcome> {
        consume_for(self.action_type(), economy)?;
        economy.attacks = 1 + self.extra_attacks;
        Ok(AbilityOutcome::default())
    }
}

/// Dash: a standard action that adds `speed_feet` to remaining movement.
pub struct Dash {
    pub speed_feet: u32,
}

impl CombatAbility for Dash {
    fn action_type(&self) -> ActionType {
        ActionType::Standard
    }

    fn ability_ref(&self) -> Ref {
        Ref::new("dnd5e", "combat_abilities", "dash")
    }

    fn activate(&self, _character_id: &str, economy: &mut ActionEconomy) -> EngineResult<AbilityOutcome> {
        consume_for(self.action_type(), economy)?;
        economy.movement_feet += self.speed_feet;
        Ok(AbilityOutcome::default())
    }
}

/// Dodge: a standard action publishing a notification conditions
/// subscribe to (imposing disadvantage on incoming attacks).
pub struct Dodge<'a> {
    pub bus: &'a NotificationTopic<DodgeActivated>,
}

impl CombatAbility for Dodge<'_> {
    fn action_type(&self) -> ActionType {
        ActionType::Standard
    }

    fn ability_ref(&self) -> Ref {
        Ref::new("dnd5e", "combat_abilities", "dodge")
    }

    fn activate(&self, character_id: &str, economy: &mut ActionEconomy) -> EngineResult<AbilityOutcome> {
        consume_for(self.action_type(), economy)?;
        self.bus.publish(&DodgeActivated {
            character_id: character_id.to_string(),
        })?;
        Ok(AbilityOutcome {
            notification: Some("dodge.activated".to_string()),
        })
    }
}

/// Disengage: a standard action publishing a notification that suppresses
/// opportunity attacks against this character's movement this turn.
pub struct Disengage<'a> {
    pub bus: &'a NotificationTopic<DisengageActivated>,
}

impl CombatAbility for Disengage<'_> {
    fn action_type(&self) -> ActionType {
        ActionType::Standard
    }

    fn ability_ref(&self) -> Ref {
        Ref::new("dnd5e", "combat_abilities", "disengage")
    }

    fn activate(&self, character_id: &str, economy: &mut ActionEconomy) -> EngineResult<AbilityOutcome> {
        consume_for(self.action_type(), economy)?;
        self.bus.publish(&DisengageActivated {
            character_id: character_id.to_string(),
        })?;
        Ok(AbilityOutcome {
            notification: Some("disengage.activated".to_string()),
        })
    }
}
