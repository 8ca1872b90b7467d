//! Movement resolution: step-by-step path traversal with opportunity-attack
//! interception. See `SPEC_FULL.md` §4.10.

use crate::error::EngineResult;
use crate::event_bus::{ChainTopic, NotificationTopic};
use crate::spatial::grid::Position;
use crate::spatial::room::Room;

use crate::cancellation::CancellationToken;
use crate::combat::combatant::{ACChainEvent, CombatantLookup};
use crate::combat::dice::Roller;

use super::attack::{resolve_attack, AttackHand, AttackResult, AttackType, DamageReceivedEvent, Weapon};
use super::damage::DamageChainEvent;

const MELEE_REACH: f64 = 1.0;

/// Event threaded through the movement chain, one per step.
#[derive(Debug, Clone)]
pub struct MovementChainEvent {
    pub entity_id: String,
    pub from_pos: Position,
    pub to_pos: Position,
    pub threatening_entities: Vec<String>,
    pub oa_prevention_sources: Vec<String>,
    pub movement_prevented: bool,
    pub prevention_reason: Option<String>,
}

/// A non-fatal failure encountered while resolving an opportunity attack.
#[derive(Debug, Clone)]
pub struct OAError {
    pub threatener_id: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TriggeredOA {
    pub threatener_id: String,
    pub result: AttackResult,
}

#[derive(Debug, Clone)]
pub struct MovementResult {
    pub final_position: Position,
    pub steps_completed: u32,
    pub oas_triggered: Vec<TriggeredOA>,
    pub oa_errors: Vec<OAError>,
    pub movement_stopped: bool,
    pub stop_reason: Option<String>,
}

/// Entities currently threatening melee reach, consulted per step.
pub trait ThreatSource {
    fn threateners(&self) -> Vec<String>;
    fn default_melee_weapon(&self, threatener_id: &str) -> Weapon;
}

/// `MoveEntity`: walk `path` one grid unit at a time, running each step
/// through the movement chain and triggering opportunity attacks from
/// entities the mover leaves the reach of. Checks `cancel` at each step
/// boundary and returns `Cancelled` promptly; steps already committed are
/// not unwound.
#[allow(clippy::too_many_arguments)]
pub fn move_entity(
    room: &mut Room,
    lookup: &mut dyn CombatantLookup,
    movement_chain: &ChainTopic<MovementChainEvent>,
    attack_chain: &ChainTopic<super::attack::AttackChainEvent>,
    ac_chain: &ChainTopic<ACChainEvent>,
    damage_chain: &ChainTopic<DamageChainEvent>,
    damage_received: &NotificationTopic<DamageReceivedEvent>,
    roller: &mut dyn Roller,
    threats: &dyn ThreatSource,
    entity_id: &str,
    path: &[Position],
    cancel: &CancellationToken,
) -> EngineResult<MovementResult> {
    let mut current = room
        .position_of(entity_id)
        .ok_or_else(|| crate::error::EngineError::not_found(format!("entity '{entity_id}' not in room")))?;

    let mut steps_completed = 0;
    let mut oas_triggered = Vec::new();
    let mut oa_errors = Vec::new();
    let mut movement_stopped = false;
    let mut stop_reason = None;

    for &next in path {
        cancel.check()?;

        if positions_equal(next, current) {
            continue;
        }

        let threatening_entities: Vec<String> = threats
            .threateners()
            .into_iter()
            .filter(|id| {
                room.position_of(id)
                    .is_some_and(|p| room.grid.distance(p, current) <= MELEE_REACH)
            })
            .collect();

        let seed = MovementChainEvent {
            entity_id: entity_id.to_string(),
            from_pos: current,
            to_pos: next,
            threatening_entities: threatening_entities.clone(),
            oa_prevention_sources: Vec::new(),
            movement_prevented: false,
            prevention_reason: None,
        };
        let resolved = movement_chain.publish_with_chain().execute(seed)?;

        if resolved.movement_prevented {
            movement_stopped = true;
            stop_reason = resolved.prevention_reason.or_else(|| Some("movement prevented".to_string()));
            break;
        }

        if resolved.oa_prevention_sources.is_empty() {
            for threatener_id in &threatening_entities {
                let leaves_reach = room
                    .position_of(threatener_id)
                    .is_some_and(|p| room.grid.distance(p, next) > MELEE_REACH);
                if !leaves_reach {
                    continue;
                }
                let weapon = threats.default_melee_weapon(threatener_id);
                match resolve_attack(
                    lookup,
                    attack_chain,
                    ac_chain,
                    damage_chain,
                    damage_received,
                    roller,
                    threatener_id,
                    entity_id,
                    &weapon,
                    AttackHand::Main,
                    AttackType::Opportunity,
                    None,
                ) {
                    Ok(result) => oas_triggered.push(TriggeredOA {
                        threatener_id: threatener_id.clone(),
                        result,
                    }),
                    Err(e) => oa_errors.push(OAError {
                        threatener_id: threatener_id.clone(),
                        message: e.to_string(),
                    }),
                }
            }
        }

        room.move_entity(entity_id, next)?;
        current = next;
        steps_completed += 1;
    }

    Ok(MovementResult {
        final_position: current,
        steps_completed,
        oas_triggered,
        oa_errors,
        movement_stopped,
        stop_reason,
    })
}

fn positions_equal(a: Position, b: Position) -> bool {
    (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::{AbilityScores, Roster, SimpleCombatant};
    use crate::combat::dice::ScriptedRoller;
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

    struct OneThreatener(String);
    impl ThreatSource for OneThreatener {
        fn threateners(&self) -> Vec<String> {
            vec![self.0.clone()]
        }
        fn default_melee_weapon(&self, _threatener_id: &str) -> Weapon {
            Weapon::unarmed()
        }
    }

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.insert(SimpleCombatant {
            id: "mover".to_string(),
            hp: 20,
            max_hp: 20,
            ac: 15,
            scores: AbilityScores::default(),
            proficiency_bonus: 2,
            dirty: false,
        });
        roster.insert(SimpleCombatant {
            id: "guard".to_string(),
            hp: 20,
            max_hp: 20,
            ac: 10,
            scores: AbilityScores {
                strength: 14,
                ..Default::default()
            },
            proficiency_bonus: 2,
            dirty: false,
        });
        roster
    }

    #[test]
    fn uninterrupted_move_completes_every_step() {
        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("mover", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        let attack_chain: ChainTopic<super::super::attack::AttackChainEvent> =
            ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> =
            NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let threats = NoThreats;

        let path = vec![Position::new(1.0, 0.0), Position::new(2.0, 0.0)];
        let result = move_entity(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            &threats,
            "mover",
            &path,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(result.steps_completed, 2);
        assert_eq!(result.final_position, Position::new(2.0, 0.0));
        assert!(result.oas_triggered.is_empty());
        assert!(!result.movement_stopped);
    }

    #[test]
    fn leaving_reach_triggers_an_opportunity_attack() {
        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("mover", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        room.place_entity("guard", Position::new(0.0, 1.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        let attack_chain: ChainTopic<super::super::attack::AttackChainEvent> =
            ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> =
            NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![15, 1]);
        let threats = OneThreatener("guard".to_string());

        let path = vec![Position::new(5.0, 0.0)];
        let result = move_entity(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            &threats,
            "mover",
            &path,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(result.oas_triggered.len(), 1);
        assert_eq!(result.oas_triggered[0].threatener_id, "guard");
    }

    #[test]
    fn movement_prevented_by_chain_stops_with_reason() {
        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("mover", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let mut movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        movement_chain.subscribe_with_chain(|ch| {
            ch.add(crate::event_bus::Stage::Conditions, |mut event| {
                event.movement_prevented = true;
                event.prevention_reason = Some("restrained".to_string());
                Ok(event)
            });
        });
        let attack_chain: ChainTopic<super::super::attack::AttackChainEvent> =
            ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> =
            NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let threats = NoThreats;

        let path = vec![Position::new(1.0, 0.0)];
        let result = move_entity(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            &threats,
            "mover",
            &path,
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(result.movement_stopped);
        assert_eq!(result.stop_reason, Some("restrained".to_string()));
        assert_eq!(result.steps_completed, 0);
        assert_eq!(result.final_position, Position::new(0.0, 0.0));
    }

    #[test]
    fn cancelled_token_stops_before_the_next_step() {
        let mut room = Room::new("r1", Box::new(SquareGrid::new(10, 10)));
        room.place_entity("mover", Position::new(0.0, 0.0), Placeable::default())
            .unwrap();
        let mut lookup = roster();
        let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain.test");
        let attack_chain: ChainTopic<super::super::attack::AttackChainEvent> =
            ChainTopic::new("attack.chain.test");
        let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain.test");
        let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain.test");
        let damage_received: NotificationTopic<DamageReceivedEvent> =
            NotificationTopic::new("damage.received.test");
        let mut roller = ScriptedRoller::new(vec![10]);
        let threats = NoThreats;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let path = vec![Position::new(1.0, 0.0), Position::new(2.0, 0.0)];
        let result = move_entity(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            &threats,
            "mover",
            &path,
            &cancel,
        );

        assert!(matches!(result, Err(crate::error::EngineError::Cancelled { .. })));
        assert_eq!(room.position_of("mover"), Some(Position::new(0.0, 0.0)));
    }
}
