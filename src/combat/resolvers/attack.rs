//! Attack resolution. See `SPEC_FULL.md` §4.7.

use crate::error::{EngineError, EngineResult};
use crate::event_bus::{ChainTopic, NotificationTopic};

use crate::combat::combatant::{ACChainEvent, Combatant, CombatantLookup, DamageApplication};
use crate::combat::dice::{DiceNotation, Roller};

use super::damage::{resolve_damage, DamageChainEvent, DamageComponent, DamageInstance};

/// Published after damage is applied to a target, mirroring the stable
/// `damage.received` notification topic.
#[derive(Debug, Clone)]
pub struct DamageReceivedEvent {
    pub target_id: String,
    pub source_id: String,
    pub amount: i64,
    pub damage_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackHand {
    Main,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackType {
    Standard,
    Opportunity,
}

/// Weapon stats relevant to attack resolution.
#[derive(Debug, Clone)]
pub struct Weapon {
    pub name: String,
    pub damage_dice: String,
    pub damage_type: String,
    pub is_melee: bool,
    pub is_finesse: bool,
    pub is_light: bool,
}

impl Weapon {
    #[must_use]
    pub fn unarmed() -> Self {
        Self {
            name: "unarmed strike".to_string(),
            damage_dice: "1d1".to_string(),
            damage_type: "bludgeoning".to_string(),
            is_melee: true,
            is_finesse: false,
            is_light: true,
        }
    }
}

/// Context required for an off-hand attack: both weapons and a flag that
/// a two-weapon fighting context is in play.
pub struct TwoWeaponContext<'a> {
    pub main_hand: &'a Weapon,
    pub off_hand: &'a Weapon,
}

/// Event threaded through the attack chain.
#[derive(Debug, Clone)]
pub struct AttackChainEvent {
    pub attacker_id: String,
    pub target_id: String,
    pub is_melee: bool,
    pub weapon_ref: String,
    pub attack_bonus: i32,
    pub target_ac: i32,
    pub advantage_sources: Vec<String>,
    pub disadvantage_sources: Vec<String>,
    pub attack_type: AttackType,
}

#[derive(Debug, Clone)]
pub struct AttackResult {
    pub hit: bool,
    pub critical: bool,
    pub attack_roll: u32,
    pub attack_bonus: i32,
    pub total: i32,
    pub damage_rolls: Vec<u32>,
    pub damage_bonus: i32,
    pub total_damage: i64,
    pub damage_type: String,
    pub breakdown: Vec<DamageInstance>,
    pub is_natural_one: bool,
    pub is_natural_twenty: bool,
    pub applied: Option<DamageApplication>,
}

fn roll_attack_d20(roller: &mut dyn Roller, advantage: bool, disadvantage: bool) -> u32 {
    match (advantage, disadvantage) {
        (true, true) | (false, false) => roller.roll_d20(),
        (true, false) => roller.roll_d20().max(roller.roll_d20()),
        (false, true) => roller.roll_d20().min(roller.roll_d20()),
    }
}

/// `ResolveAttack`: resolve a single attack roll and, on hit, its damage.
#[allow(clippy::too_many_arguments)]
pub fn resolve_attack(
    lookup: &mut dyn CombatantLookup,
    attack_chain: &ChainTopic<AttackChainEvent>,
    ac_chain: &ChainTopic<ACChainEvent>,
    damage_chain: &ChainTopic<DamageChainEvent>,
    damage_received: &NotificationTopic<DamageReceivedEvent>,
    roller: &mut dyn Roller,
    attacker_id: &str,
    target_id: &str,
    weapon: &Weapon,
    attack_hand: AttackHand,
    attack_type: AttackType,
    two_weapon: Option<&TwoWeaponContext>,
) -> EngineResult<AttackResult> {
    if attack_hand == AttackHand::Off {
        let ctx = two_weapon.ok_or_else(|| {
            EngineError::invalid_argument("off-hand attack requires a two-weapon context")
        })?;
        if !ctx.main_hand.is_light || !ctx.off_hand.is_light {
            return Err(EngineError::invalid_argument("main hand weapon must be light"));
        }
    }

    // Scoped so the immutable borrow of `lookup` ends before damage
    // application needs a mutable one.
    let (ability_mod, attack_bonus_seed, target_ac) = {
        let attacker = lookup
            .get(attacker_id)
            .ok_or_else(|| EngineError::not_found(format!("combatant '{attacker_id}' not found")))?;
        let target = lookup
            .get(target_id)
            .ok_or_else(|| EngineError::not_found(format!("combatant '{target_id}' not found")))?;

        let scores = attacker.ability_scores();
        let ability_mod = if weapon.is_finesse {
            scores.strength_mod().max(scores.dexterity_mod())
        } else if weapon.is_melee {
            scores.strength_mod()
        } else {
            scores.dexterity_mod()
        };
        (
            ability_mod,
            ability_mod + attacker.proficiency_bonus(),
            target.effective_ac(ac_chain).total,
        )
    };

    let seed = AttackChainEvent {
        attacker_id: attacker_id.to_string(),
        target_id: target_id.to_string(),
        is_melee: weapon.is_melee,
        weapon_ref: weapon.name.clone(),
        attack_bonus: attack_bonus_seed,
        target_ac,
        advantage_sources: Vec::new(),
        disadvantage_sources: Vec::new(),
        attack_type,
    };
    let resolved = attack_chain.publish_with_chain().execute(seed)?;

    let advantage = !resolved.advantage_sources.is_empty();
    let disadvantage = !resolved.disadvantage_sources.is_empty();
    let attack_roll = roll_attack_d20(roller, advantage, disadvantage);

    let is_natural_one = attack_roll == 1;
    let is_natural_twenty = attack_roll == 20;
    let total = attack_roll as i32 + resolved.attack_bonus;
    let hit = is_natural_twenty || (!is_natural_one && total >= resolved.target_ac);
    let critical = is_natural_twenty;

    if !hit {
        return Ok(AttackResult {
            hit: false,
            critical: false,
            attack_roll,
            attack_bonus: resolved.attack_bonus,
            total,
            damage_rolls: Vec::new(),
            damage_bonus: 0,
            total_damage: 0,
            damage_type: weapon.damage_type.clone(),
            breakdown: Vec::new(),
            is_natural_one,
            is_natural_twenty,
            applied: None,
        });
    }

    let notation = DiceNotation::parse(&weapon.damage_dice)?;
    let mut dice_rolls = roller.roll_dice(notation);
    if critical {
        dice_rolls.extend(roller.roll_dice(notation));
    }

    let weapon_component = DamageComponent {
        source: weapon.name.clone(),
        original_dice_rolls: dice_rolls.clone(),
        final_dice_rolls: dice_rolls.clone(),
        flat_bonus: 0,
        damage_type: weapon.damage_type.clone(),
        is_critical: critical,
        multiplier: None,
        rerolls: Vec::new(),
    };
    let ability_component = DamageComponent {
        source: "ability".to_string(),
        original_dice_rolls: Vec::new(),
        final_dice_rolls: Vec::new(),
        flat_bonus: ability_mod,
        damage_type: weapon.damage_type.clone(),
        is_critical: critical,
        multiplier: None,
        rerolls: Vec::new(),
    };

    let breakdown = resolve_damage(
        damage_chain,
        DamageChainEvent {
            components: vec![weapon_component, ability_component],
        },
    )?;
    let total_damage: i64 = breakdown.iter().map(|i| i.amount).sum();

    let target = lookup
        .get_mut(target_id)
        .ok_or_else(|| EngineError::not_found(format!("combatant '{target_id}' not found")))?;
    let applied = target.apply_damage(&breakdown);
    let _ = damage_received.publish(&DamageReceivedEvent {
        target_id: target_id.to_string(),
        source_id: attacker_id.to_string(),
        amount: applied.total,
        damage_type: weapon.damage_type.clone(),
    });

    Ok(AttackResult {
        hit: true,
        critical,
        attack_roll,
        attack_bonus: resolved.attack_bonus,
        total,
        damage_rolls: dice_rolls,
        damage_bonus: ability_mod,
        total_damage,
        damage_type: weapon.damage_type.clone(),
        breakdown,
        is_natural_one,
        is_natural_twenty,
        applied: Some(applied),
    })
}
