//! Turn manager: the per-character state machine that gates ability
//! activation, strikes, and movement against the action economy.
//! See `SPEC_FULL.md` §4.11.

use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::combat::abilities::CombatAbility;
use crate::combat::combatant::{ACChainEvent, CombatantLookup};
use crate::combat::dice::Roller;
use crate::combat::economy::ActionEconomy;
use crate::combat::resolvers::attack::{
    resolve_attack, AttackChainEvent, AttackHand, AttackResult, AttackType, DamageReceivedEvent, TwoWeaponContext,
    Weapon,
};
use crate::combat::resolvers::damage::DamageChainEvent;
use crate::combat::resolvers::movement::{move_entity, MovementChainEvent, MovementResult, ThreatSource};
use crate::error::{EngineError, EngineResult};
use crate::event_bus::{ChainTopic, NotificationTopic};
use crate::spatial::grid::Position;
use crate::spatial::room::Room;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Started,
    Ended,
}

#[derive(Debug, Clone)]
pub enum TurnEvent {
    Started { character_id: String },
    Ended { character_id: String },
}

/// One entry in `GetAvailableAbilities`/`GetAvailableActions`: whether the
/// named action can currently be taken, and why not if it can't.
#[derive(Debug, Clone)]
pub struct AvailableAction {
    pub name: String,
    pub can_use: bool,
    pub reason: Option<String>,
}

fn available(name: &str, remaining: u32) -> AvailableAction {
    AvailableAction {
        name: name.to_string(),
        can_use: remaining > 0,
        reason: if remaining > 0 {
            None
        } else {
            Some(format!("no {name} remaining this turn"))
        },
    }
}

/// Per-character turn state machine: `idle -> started -> ended`, one-shot.
pub struct TurnManager {
    pub character_id: String,
    pub state: TurnState,
    pub economy: ActionEconomy,
}

impl TurnManager {
    #[must_use]
    pub fn new(character_id: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            state: TurnState::Idle,
            economy: ActionEconomy::default(),
        }
    }

    fn require_started(&self) -> EngineResult<()> {
        if self.state != TurnState::Started {
            return Err(EngineError::invalid_state(format!(
                "turn for '{}' is not started",
                self.character_id
            )));
        }
        Ok(())
    }

    /// `StartTurn`: reset primary resources, set movement from speed,
    /// publish `TurnEvent::Started`. Requires `Idle`.
    pub fn start_turn(&mut self, speed_feet: u32, events: &NotificationTopic<TurnEvent>) -> EngineResult<()> {
        if self.state != TurnState::Idle {
            return Err(EngineError::invalid_state(format!(
                "turn for '{}' already started or ended",
                self.character_id
            )));
        }
        self.economy.reset();
        self.economy.movement_feet = speed_feet;
        self.state = TurnState::Started;
        debug!(character = %self.character_id, speed_feet, "turn started");
        events.publish(&TurnEvent::Started {
            character_id: self.character_id.clone(),
        })
    }

    /// `UseAbility`: dispatch to the character's ability. The ability
    /// consumes its own economy slot.
    pub fn use_ability(&mut self, ability: &dyn CombatAbility) -> EngineResult<()> {
        self.require_started()?;
        ability.activate(&self.character_id, &mut self.economy)?;
        Ok(())
    }

    /// `Strike`: consume one attack and invoke `ResolveAttack` with the
    /// main hand.
    #[allow(clippy::too_many_arguments)]
    pub fn strike(
        &mut self,
        lookup: &mut dyn CombatantLookup,
        attack_chain: &ChainTopic<AttackChainEvent>,
        ac_chain: &ChainTopic<ACChainEvent>,
        damage_chain: &ChainTopic<DamageChainEvent>,
        damage_received: &NotificationTopic<DamageReceivedEvent>,
        roller: &mut dyn Roller,
        target_id: &str,
        weapon: &Weapon,
    ) -> EngineResult<AttackResult> {
        self.require_started()?;
        self.economy.consume_attack()?;
        resolve_attack(
            lookup,
            attack_chain,
            ac_chain,
            damage_chain,
            damage_received,
            roller,
            &self.character_id,
            target_id,
            weapon,
            AttackHand::Main,
            AttackType::Standard,
            None,
        )
    }

    /// `OffHandStrike`: consume one off-hand attack and invoke
    /// `ResolveAttack` with the off hand.
    #[allow(clippy::too_many_arguments)]
    pub fn off_hand_strike(
        &mut self,
        lookup: &mut dyn CombatantLookup,
        attack_chain: &ChainTopic<AttackChainEvent>,
        ac_chain: &ChainTopic<ACChainEvent>,
        damage_chain: &ChainTopic<DamageChainEvent>,
        damage_received: &NotificationTopic<DamageReceivedEvent>,
        roller: &mut dyn Roller,
        target_id: &str,
        two_weapon: &TwoWeaponContext,
    ) -> EngineResult<AttackResult> {
        self.require_started()?;
        self.economy.consume_off_hand_attack()?;
        resolve_attack(
            lookup,
            attack_chain,
            ac_chain,
            damage_chain,
            damage_received,
            roller,
            &self.character_id,
            target_id,
            two_weapon.off_hand,
            AttackHand::Off,
            AttackType::Standard,
            Some(two_weapon),
        )
    }

    /// `FlurryStrike`: consume one flurry strike and invoke `ResolveAttack`
    /// with the main hand (flurry strikes always unarmed in this core;
    /// content libraries choose the weapon).
    #[allow(clippy::too_many_arguments)]
    pub fn flurry_strike(
        &mut self,
        lookup: &mut dyn CombatantLookup,
        attack_chain: &ChainTopic<AttackChainEvent>,
        ac_chain: &ChainTopic<ACChainEvent>,
        damage_chain: &ChainTopic<DamageChainEvent>,
        damage_received: &NotificationTopic<DamageReceivedEvent>,
        roller: &mut dyn Roller,
        target_id: &str,
        weapon: &Weapon,
    ) -> EngineResult<AttackResult> {
        self.require_started()?;
        self.economy.consume_flurry_strike()?;
        resolve_attack(
            lookup,
            attack_chain,
            ac_chain,
            damage_chain,
            damage_received,
            roller,
            &self.character_id,
            target_id,
            weapon,
            AttackHand::Main,
            AttackType::Standard,
            None,
        )
    }

    /// `Move`: require `path[0]` equals the character's current position;
    /// cost is `(len(path)-1) * feet_per_grid_unit`, consumed all-or-nothing
    /// before movement executes. Unused feet are refunded if movement
    /// stops early.
    #[allow(clippy::too_many_arguments)]
    pub fn move_path(
        &mut self,
        room: &mut Room,
        lookup: &mut dyn CombatantLookup,
        movement_chain: &ChainTopic<MovementChainEvent>,
        attack_chain: &ChainTopic<AttackChainEvent>,
        ac_chain: &ChainTopic<ACChainEvent>,
        damage_chain: &ChainTopic<DamageChainEvent>,
        damage_received: &NotificationTopic<DamageReceivedEvent>,
        roller: &mut dyn Roller,
        threats: &dyn ThreatSource,
        path: &[Position],
        feet_per_grid_unit: u32,
        cancel: &CancellationToken,
    ) -> EngineResult<MovementResult> {
        self.require_started()?;
        let current = room
            .position_of(&self.character_id)
            .ok_or_else(|| EngineError::not_found(format!("entity '{}' not in room", self.character_id)))?;
        let first = path
            .first()
            .ok_or_else(|| EngineError::invalid_argument("path must contain at least one position"))?;
        if !positions_equal(*first, current) {
            return Err(EngineError::invalid_argument("path[0] must equal current position"));
        }

        let steps = (path.len() - 1) as u32;
        let cost = steps * feet_per_grid_unit;
        self.economy.consume_movement(cost)?;

        let result = move_entity(
            room,
            lookup,
            movement_chain,
            attack_chain,
            ac_chain,
            damage_chain,
            damage_received,
            roller,
            threats,
            &self.character_id,
            path,
            cancel,
        )?;

        if result.movement_stopped {
            let unused_steps = steps - result.steps_completed;
            self.economy.refund_movement(unused_steps * feet_per_grid_unit);
        }

        Ok(result)
    }

    #[must_use]
    pub fn get_available_abilities(&self) -> Vec<AvailableAction> {
        vec![
            available("strike", self.economy.attacks),
            available("off_hand_strike", self.economy.off_hand_attacks),
            available("flurry_strike", self.economy.flurry_strikes),
        ]
    }

    #[must_use]
    pub fn get_available_actions(&self) -> Vec<AvailableAction> {
        vec![
            available("action", self.economy.actions),
            available("bonus_action", self.economy.bonus_actions),
            available("reaction", self.economy.reactions),
        ]
    }

    /// `EndTurn`: publish `TurnEvent::Ended`, transition to `Ended`.
    /// Requires `Started`.
    pub fn end_turn(&mut self, events: &NotificationTopic<TurnEvent>) -> EngineResult<()> {
        self.require_started()?;
        self.state = TurnState::Ended;
        debug!(character = %self.character_id, "turn ended");
        events.publish(&TurnEvent::Ended {
            character_id: self.character_id.clone(),
        })
    }
}

fn positions_equal(a: Position, b: Position) -> bool {
    (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::abilities::Attack;
    use crate::combat::combatant::{AbilityScores, Roster, SimpleCombatant};
    use crate::combat::dice::ScriptedRoller;
    use crate::combat::resolvers::attack::DamageReceivedEvent;
    use crate::spatial::grid::SquareGrid;
    use crate::spatial::room::Placeable;

    struct NoThreats;
    impl ThreatSource for NoThreats {
        fn threateners(&self) -> Vec<String> {
            Vec::new()
        }
        fn default_melee_weapon(&self, _threatener_id: &str) -> Weapon {
            Weapon::unarmed()
        }
    }

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.insert(SimpleCombatant {
            id: "hero".to_string(),
            hp: 20,
            max_hp: 20,
            ac: 10,
            scores: AbilityScores {
                strength: 16,
                ..Default::default()
            },
            proficiency_bonus: 2,
            dirty: false,
        });
        roster.insert(SimpleCombatant {
            id: "villain".to_string(),
            hp: 20,
            max_hp: 20,
            ac: 10,
            scores: AbilityScores::default(),
            proficiency_bonus: 2,
            dirty: false,
        });
        roster
    }

    #[test]
    fn strike_before_start_turn_fails() {
        let mut turn = TurnManager::new("hero");
        let mut lookup = roster();
        let attack_chain: ChainTopic<AttackChainEvent> = ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> = NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let weapon = Weapon::unarmed();

        let result = turn.strike(
            &mut lookup,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            "villain",
            &weapon,
        );
        assert!(result.is_err());
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut turn = TurnManager::new("hero");
        let events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events.test");
        turn.start_turn(30, &events).unwrap();
        assert!(turn.start_turn(30, &events).is_err());
    }

    #[test]
    fn attack_ability_then_strike_consumes_the_granted_attack() {
        let mut turn = TurnManager::new("hero");
        let events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events.test");
        turn.start_turn(30, &events).unwrap();

        let attack_ability = Attack { extra_attacks: 0 };
        turn.use_ability(&attack_ability).unwrap();
        assert_eq!(turn.economy.attacks, 1);

        let mut lookup = roster();
        let attack_chain: ChainTopic<AttackChainEvent> = ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> = NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![15, 3]);
        let weapon = Weapon::unarmed();

        let result = turn
            .strike(
                &mut lookup,
                &attack_chain,
                &ac_chain,
                &damage_chain,
                &damage_received,
                &mut roller,
                "villain",
                &weapon,
            )
            .unwrap();
        assert!(result.hit);
        assert_eq!(turn.economy.attacks, 0);

        let abilities = turn.get_available_abilities();
        let strike_status = abilities.iter().find(|a| a.name == "strike").unwrap();
        assert!(!strike_status.can_use);
    }

    #[test]
    fn move_requires_path_to_start_at_current_position() {
        let mut turn = TurnManager::new("hero");
        let events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events.test");
        turn.start_turn(30, &events).unwrap();

        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("hero", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        let attack_chain: ChainTopic<AttackChainEvent> = ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> = NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let threats = NoThreats;

        let bad_path = vec![Position::new(1.0, 0.0), Position::new(2.0, 0.0)];
        let result = turn.move_path(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            &threats,
            &bad_path,
            5,
            &CancellationToken::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn move_consumes_feet_and_reaches_destination() {
        let mut turn = TurnManager::new("hero");
        let events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events.test");
        turn.start_turn(30, &events).unwrap();

        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("hero", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        let attack_chain: ChainTopic<AttackChainEvent> = ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> = NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let threats = NoThreats;

        let path = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(2.0, 0.0),
        ];
        let result = turn
            .move_path(
                &mut room,
                &mut lookup,
                &movement_chain,
                &attack_chain,
                &ac_chain,
                &damage_chain,
                &damage_received,
                &mut roller,
                &threats,
                &path,
                5,
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(result.final_position, Position::new(2.0, 0.0));
        assert_eq!(turn.economy.movement_feet, 20);
    }

    #[test]
    fn end_turn_then_start_turn_again_is_rejected() {
        let mut turn = TurnManager::new("hero");
        let events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events.test");
        turn.start_turn(30, &events).unwrap();
        turn.end_turn(&events).unwrap();
        assert!(turn.start_turn(30, &events).is_err());
    }
}
