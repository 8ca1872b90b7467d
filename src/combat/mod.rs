//! Combat primitives: action economy, the combatant contract, recoverable
//! resources, conditions, dice, abilities, and the resolvers that settle
//! attacks/damage/healing/movement. See `SPEC_FULL.md` §§3–4.

pub mod abilities;
pub mod combatant;
pub mod conditions;
pub mod dice;
pub mod economy;
pub mod resolvers;
pub mod resources;

pub use abilities::{AbilityOutcome, ActionType, Attack, CombatAbility, Dash, Disengage, Dodge, DisengageActivated, DodgeActivated};
pub use combatant::{
    apply_ac_component, ACBreakdown, ACChainEvent, ACComponent, AbilityScores, Combatant, CombatantLookup,
    DamageApplication, Roster, SimpleCombatant,
};
pub use conditions::{AppliedCondition, ConditionBehavior, ConditionRecord, Ref};
pub use dice::{ChaChaRoller, DiceNotation, Roller, ScriptedRoller};
pub use economy::ActionEconomy;
pub use resources::{RecoverableResource, RestEvent, RestType};
