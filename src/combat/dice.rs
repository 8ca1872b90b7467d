//! Dice rolling. The engine never reads randomness directly — it rolls
//! through an injected [`Roller`], keeping resolvers deterministic under
//! test. See `SPEC_FULL.md` §1 "Out of scope".

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{EngineError, EngineResult};

/// Parsed `NdS` dice notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
}

impl DiceNotation {
    /// Parse `NdS`, e.g. `"2d8"`. Both `N` and `S` must be `>= 1`.
    pub fn parse(notation: &str) -> EngineResult<Self> {
        let (count, sides) = notation
            .split_once('d')
            .ok_or_else(|| EngineError::invalid_argument(format!("malformed dice notation '{notation}'")))?;
        let count: u32 = count
            .parse()
            .map_err(|_| EngineError::invalid_argument(format!("malformed dice count in '{notation}'")))?;
        let sides: u32 = sides
            .parse()
            .map_err(|_| EngineError::invalid_argument(format!("malformed dice sides in '{notation}'")))?;
        if count == 0 || sides == 0 {
            return Err(EngineError::invalid_argument(format!(
                "dice notation '{notation}' must have count and sides >= 1"
            )));
        }
        Ok(Self { count, sides })
    }
}

/// Source of randomness for the engine. Implementors roll individual dice
/// and d20s; resolvers never call `rand` directly.
pub trait Roller: Send + Sync {
    fn roll_d20(&mut self) -> u32;
    fn roll_die(&mut self, sides: u32) -> u32;

    fn roll_dice(&mut self, notation: DiceNotation) -> Vec<u32> {
        (0..notation.count).map(|_| self.roll_die(notation.sides)).collect()
    }
}

/// Default [`Roller`] backed by `ChaCha8Rng`, seeded explicitly for
/// reproducible scenarios (tests, replays) or from entropy for play.
pub struct ChaChaRoller {
    rng: ChaCha8Rng,
}

impl ChaChaRoller {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
        }
    }
}

impl Roller for ChaChaRoller {
    fn roll_d20(&mut self) -> u32 {
        self.rng.random_range(1..=20)
    }

    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides)
    }
}

/// Deterministic [`Roller`] for tests: returns values from a fixed
/// sequence, repeating the last value once exhausted.
pub struct ScriptedRoller {
    values: Vec<u32>,
    next: usize,
}

impl ScriptedRoller {
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, next: 0 }
    }

    fn take(&mut self) -> u32 {
        let value = self.values.get(self.next).copied().unwrap_or_else(|| {
            *self.values.last().expect("ScriptedRoller requires at least one value")
        });
        self.next += 1;
        value
    }
}

impl Roller for ScriptedRoller {
    fn roll_d20(&mut self) -> u32 {
        self.take()
    }

    fn roll_die(&mut self, _sides: u32) -> u32 {
        self.take()
    }
}
