//! Resolvers: the stateless algorithms invoked by the turn manager to
//! settle an attack, its damage, healing, and movement. See
//! `SPEC_FULL.md` §§4.7–4.10.

pub mod attack;
pub mod damage;
pub mod healing;
pub mod movement;

pub use attack::{
    resolve_attack, AttackChainEvent, AttackHand, AttackResult, AttackType, DamageReceivedEvent,
    TwoWeaponContext, Weapon,
};
pub use damage::{deal_damage, resolve_damage, DamageChainEvent, DamageComponent, DamageInput, DamageInstance, Reroll};
pub use healing::{resolve_healing, HealingChainEvent, HealingComponent};
pub use movement::{move_entity, MovementChainEvent, MovementResult, OAError, ThreatSource, TriggeredOA};
