//! Assembles a bus, a room, and two combatants and drives a full turn
//! end-to-end, matching the basic-melee-hit scenario.

use encounter_core::cancellation::CancellationToken;
use encounter_core::combat::abilities::{Attack, CombatAbility};
use encounter_core::combat::combatant::{ACChainEvent, AbilityScores, Roster, SimpleCombatant};
use encounter_core::combat::dice::ScriptedRoller;
use encounter_core::combat::resolvers::attack::{AttackChainEvent, DamageReceivedEvent, Weapon};
use encounter_core::combat::resolvers::damage::DamageChainEvent;
use encounter_core::combat::resolvers::movement::{MovementChainEvent, ThreatSource};
use encounter_core::event_bus::{ChainTopic, NotificationTopic};
use encounter_core::spatial::grid::{Position, SquareGrid};
use encounter_core::spatial::room::{Placeable, Room};
use encounter_core::turn::{TurnEvent, TurnManager};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("encounter_core=debug")
        .try_init();
}

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
        id: "fighter".to_string(),
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
        id: "goblin".to_string(),
        hp: 7,
        max_hp: 7,
        ac: 15,
        scores: AbilityScores::default(),
        proficiency_bonus: 2,
        dirty: false,
    });
    roster
}

fn longsword() -> Weapon {
    Weapon {
        name: "longsword".to_string(),
        damage_dice: "1d8".to_string(),
        damage_type: "slashing".to_string(),
        is_melee: true,
        is_finesse: false,
        is_light: false,
    }
}

#[test]
fn start_attack_move_end_turn_applies_damage_and_relocates() {
    init_tracing();

    let mut room = Room::new("arena", Box::new(SquareGrid::new(20, 20)));
    room.place_entity("fighter", Position::new(0.0, 0.0), Placeable::default())
        .unwrap();
    room.place_entity("goblin", Position::new(1.0, 0.0), Placeable::default())
        .unwrap();

    let mut lookup = roster();
    let turn_events: NotificationTopic<TurnEvent> = NotificationTopic::new("turn.events");
    let attack_chain: ChainTopic<AttackChainEvent> = ChainTopic::new("attack.chain");
    let ac_chain: ChainTopic<ACChainEvent> = ChainTopic::new("ac.chain");
    let damage_chain: ChainTopic<DamageChainEvent> = ChainTopic::new("damage.chain");
    let damage_received: NotificationTopic<DamageReceivedEvent> = NotificationTopic::new("damage.received");
    let movement_chain: ChainTopic<MovementChainEvent> = ChainTopic::new("movement.chain");
    let threats = NoThreats;
    let cancel = CancellationToken::new();

    let mut turn = TurnManager::new("fighter");
    turn.start_turn(30, &turn_events).unwrap();

    let attack_ability = Attack { extra_attacks: 0 };
    turn.use_ability(&attack_ability).unwrap();
    assert_eq!(turn.economy.attacks, 1);

    // Scenario one: d20=15, weapon 1d8=5, attack bonus +5, target AC 15.
    let mut roller = ScriptedRoller::new(vec![15, 5]);
    let attack_result = turn
        .strike(
            &mut lookup,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut roller,
            "goblin",
            &longsword(),
        )
        .unwrap();

    assert!(attack_result.hit);
    assert_eq!(attack_result.total_damage, 8);
    assert_eq!(lookup.get("goblin").unwrap().hp(), 0, "7 hp minus 8 damage clamps at zero");

    let mut move_roller = ScriptedRoller::new(vec![10]);
    let path = vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0), Position::new(2.0, 2.0)];
    let move_result = turn
        .move_path(
            &mut room,
            &mut lookup,
            &movement_chain,
            &attack_chain,
            &ac_chain,
            &damage_chain,
            &damage_received,
            &mut move_roller,
            &threats,
            &path,
            5,
            &cancel,
        )
        .unwrap();

    assert_eq!(move_result.final_position, Position::new(2.0, 2.0));
    assert_eq!(room.position_of("fighter"), Some(Position::new(2.0, 2.0)));
    assert_eq!(turn.economy.movement_feet, 20);

    turn.end_turn(&turn_events).unwrap();
    assert!(turn.use_ability(&attack_ability).is_err());
}
