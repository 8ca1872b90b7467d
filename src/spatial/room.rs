//! Room: a grid plus an entity-position mapping, gated placement, and
//! line-of-sight blocking. See `SPEC_FULL.md` §4.3.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::event_bus::NotificationTopic;

use super::grid::{Grid, Position};

/// Capability describing how an entity interacts with placement and sight.
#[derive(Debug, Clone, Copy)]
pub struct Placeable {
    pub size: f64,
    pub blocks_movement: bool,
    pub blocks_line_of_sight: bool,
}

impl Default for Placeable {
    fn default() -> Self {
        Self {
            size: 1.0,
            blocks_movement: true,
            blocks_line_of_sight: false,
        }
    }
}

/// Identifies an entity placed in a room.
pub type EntityId = String;

#[derive(Debug, Clone)]
pub enum RoomEvent {
    EntityPlaced { entity: EntityId, position: Position },
    EntityMoved { entity: EntityId, from: Position, to: Position },
    EntityRemoved { entity: EntityId, position: Position },
    RoomCreated { room_id: String },
}

/// An entity placed in a room along with its placement capability.
struct Placement {
    position: Position,
    placeable: Placeable,
}

/// A room: identity, a grid, and the entities currently placed on it.
pub struct Room {
    pub id: String,
    pub grid: Box<dyn Grid>,
    entities: HashMap<EntityId, Placement>,
    pub events: NotificationTopic<RoomEvent>,
}

impl Room {
    #[must_use]
    pub fn new(id: impl Into<String>, grid: Box<dyn Grid>) -> Self {
        let id = id.into();
        let room = Self {
            id: id.clone(),
            grid,
            entities: HashMap::new(),
            events: NotificationTopic::new("room.events"),
        };
        let _ = room.events.publish(&RoomEvent::RoomCreated { room_id: id });
        room
    }

    fn is_blocked(&self, pos: Position) -> bool {
        self.entities
            .values()
            .any(|p| p.placeable.blocks_movement && positions_equal(p.position, pos))
    }

    /// Place `entity` at `pos`. Fails if `pos` is invalid or occupied by a
    /// blocking entity; state is unchanged on failure.
    pub fn place_entity(
        &mut self,
        entity: impl Into<EntityId>,
        pos: Position,
        placeable: Placeable,
    ) -> EngineResult<()> {
        let entity = entity.into();
        if !self.grid.is_valid(pos) {
            return Err(EngineError::invalid_argument("position is outside the grid"));
        }
        if placeable.blocks_movement && self.is_blocked(pos) {
            return Err(EngineError::invalid_argument("position is occupied"));
        }
        self.entities.insert(entity.clone(), Placement { position: pos, placeable });
        let _ = self
            .events
            .publish(&RoomEvent::EntityPlaced { entity, position: pos });
        Ok(())
    }

    /// Move an already-placed entity to `to`. Atomic: on failure the
    /// entity's original position is preserved.
    pub fn move_entity(&mut self, entity: &str, to: Position) -> EngineResult<()> {
        let current = self
            .entities
            .get(entity)
            .ok_or_else(|| EngineError::not_found(format!("entity '{entity}' not in room")))?;
        let from = current.position;
        let placeable = current.placeable;

        if !self.grid.is_valid(to) {
            return Err(EngineError::invalid_argument("destination is outside the grid"));
        }
        if placeable.blocks_movement && self.is_blocked(to) {
            return Err(EngineError::invalid_argument("destination is occupied"));
        }

        if let Some(p) = self.entities.get_mut(entity) {
            p.position = to;
        }
        let _ = self.events.publish(&RoomEvent::EntityMoved {
            entity: entity.to_string(),
            from,
            to,
        });
        Ok(())
    }

    /// Remove an entity. Idempotent: removing an absent entity returns
    /// `NotFound` without side effects.
    pub fn remove_entity(&mut self, entity: &str) -> EngineResult<()> {
        let placement = self
            .entities
            .remove(entity)
            .ok_or_else(|| EngineError::not_found(format!("entity '{entity}' not in room")))?;
        let _ = self.events.publish(&RoomEvent::EntityRemoved {
            entity: entity.to_string(),
            position: placement.position,
        });
        Ok(())
    }

    #[must_use]
    pub fn position_of(&self, entity: &str) -> Option<Position> {
        self.entities.get(entity).map(|p| p.position)
    }

    #[must_use]
    pub fn entities_at(&self, pos: Position) -> Vec<&EntityId> {
        self.entities
            .iter()
            .filter(|(_, p)| positions_equal(p.position, pos))
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn entities_in_range(&self, center: Position, radius: f64) -> Vec<&EntityId> {
        self.entities
            .iter()
            .filter(|(_, p)| self.grid.distance(center, p.position) <= radius)
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn all_entities(&self) -> Vec<&EntityId> {
        self.entities.keys().collect()
    }

    #[must_use]
    pub fn line_of_sight(&self, from: Position, to: Position) -> Vec<Position> {
        self.grid.line_of_sight(from, to)
    }

    /// Whether an intermediate position (exclusive of endpoints) blocks
    /// line of sight between `from` and `to`.
    #[must_use]
    pub fn is_line_of_sight_blocked(&self, from: Position, to: Position) -> bool {
        let line = self.grid.line_of_sight(from, to);
        if line.len() <= 2 {
            return false;
        }
        line[1..line.len() - 1].iter().any(|pos| {
            self.entities
                .values()
                .any(|p| p.placeable.blocks_line_of_sight && positions_equal(p.position, *pos))
        })
    }
}

fn positions_equal(a: Position, b: Position) -> bool {
    (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
}
