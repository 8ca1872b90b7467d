//! Action economy: primary per-turn resources and turn-granted capacity
//! sub-resources. See `SPEC_FULL.md` §4.5.

use crate::error::{EngineError, EngineResult};

/// Per-turn action economy. Primary resources are consumed by ability
/// activations; capacity sub-resources are granted by abilities and then
/// consumed by strikes/moves.
#[derive(Debug, Clone)]
pub struct ActionEconomy {
    pub actions: u32,
    pub bonus_actions: u32,
    pub reactions: u32,
    pub attacks: u32,
    pub movement_feet: u32,
    pub off_hand_attacks: u32,
    pub flurry_strikes: u32,
}

impl Default for ActionEconomy {
    fn default() -> Self {
        Self {
            actions: 1,
            bonus_actions: 1,
            reactions: 1,
            attacks: 0,
            movement_feet: 0,
            off_hand_attacks: 0,
            flurry_strikes: 0,
        }
    }
}

impl ActionEconomy {
    /// Restore primary resources and zero turn-granted capacity. Leaves
    /// `movement_feet` (set from speed by the turn manager) and `attacks`
    /// (set when Attack is activated) untouched.
    pub fn reset(&mut self) {
        self.actions = 1;
        self.bonus_actions = 1;
        self.reactions = 1;
        self.off_hand_attacks = 0;
        self.flurry_strikes = 0;
    }

    pub fn consume_action(&mut self) -> EngineResult<()> {
        consume(&mut self.actions, "actions")
    }

    pub fn consume_bonus_action(&mut self) -> EngineResult<()> {
        consume(&mut self.bonus_actions, "bonus_actions")
    }

    pub fn consume_reaction(&mut self) -> EngineResult<()> {
        consume(&mut self.reactions, "reactions")
    }

    pub fn consume_attack(&mut self) -> EngineResult<()> {
        consume(&mut self.attacks, "attacks")
    }

    pub fn consume_off_hand_attack(&mut self) -> EngineResult<()> {
        consume(&mut self.off_hand_attacks, "off_hand_attacks")
    }

    pub fn consume_flurry_strike(&mut self) -> EngineResult<()> {
        consume(&mut self.flurry_strikes, "flurry_strikes")
    }

    pub fn consume_movement(&mut self, feet: u32) -> EngineResult<()> {
        if feet > self.movement_feet {
            return Err(EngineError::resource_exhausted("movement_feet").with_meta(
                "requested",
                feet.to_string(),
            ));
        }
        self.movement_feet -= feet;
        Ok(())
    }

    pub fn refund_movement(&mut self, feet: u32) {
        self.movement_feet += feet;
    }

    /// Action Surge-style grant: increments rather than caps.
    pub fn grant_extra_action(&mut self) {
        self.actions += 1;
    }
}

fn consume(counter: &mut u32, name: &'static str) -> EngineResult<()> {
    if *counter == 0 {
        return Err(EngineError::resource_exhausted(name));
    }
    *counter -= 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_primary_and_zeros_turn_granted_capacity() {
        let mut economy = ActionEconomy {
            actions: 0,
            bonus_actions: 0,
            reactions: 0,
            attacks: 2,
            movement_feet: 15,
            off_hand_attacks: 1,
            flurry_strikes: 1,
        };
        economy.reset();
        assert_eq!(economy.actions, 1);
        assert_eq!(economy.bonus_actions, 1);
        assert_eq!(economy.reactions, 1);
        assert_eq!(economy.off_hand_attacks, 0);
        assert_eq!(economy.flurry_strikes, 0);
        // Untouched by reset.
        assert_eq!(economy.attacks, 2);
        assert_eq!(economy.movement_feet, 15);
    }

    #[test]
    fn consuming_beyond_availability_fails_and_does_not_mutate() {
        let mut economy = ActionEconomy::default();
        economy.actions = 0;
        let result = economy.consume_action();
        assert!(result.is_err());
        assert_eq!(economy.actions, 0);
    }

    #[test]
    fn movement_consumption_is_gated_by_remaining_feet() {
        let mut economy = ActionEconomy::default();
        economy.movement_feet = 10;
        assert!(economy.consume_movement(15).is_err());
        assert!(economy.consume_movement(10).is_ok());
        assert_eq!(economy.movement_feet, 0);
    }

    #[test]
    fn grant_extra_action_increments_rather_than_caps() {
        let mut economy = ActionEconomy::default();
        economy.grant_extra_action();
        assert_eq!(economy.actions, 2);
    }
}
