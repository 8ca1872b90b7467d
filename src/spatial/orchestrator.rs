//! Orchestrator: a graph of rooms and typed connections with cross-room
//! entity tracking and BFS path planning. See `SPEC_FULL.md` §4.4.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::cancellation::CancellationToken;
use crate::error::{EngineError, EngineResult};
use crate::event_bus::NotificationTopic;

use super::grid::Position;
use super::room::{EntityId, Placeable, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Door,
    Stairs,
    Passage,
    Portal,
    Bridge,
    Tunnel,
}

/// A typed edge between two rooms.
pub struct Connection {
    pub id: String,
    pub connection_type: ConnectionType,
    pub from_room: String,
    pub to_room: String,
    pub from_pos: Position,
    pub to_pos: Position,
    pub passable: bool,
    pub cost: f64,
    pub reversible: bool,
    pub requirements: HashSet<String>,
}

impl Connection {
    #[must_use]
    pub fn is_traversable(&self, entity_tags: &HashSet<String>) -> bool {
        self.passable && self.requirements.is_subset(entity_tags)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Tower,
    Branching,
    Grid,
    Organic,
}

#[derive(Debug, Clone)]
pub struct LayoutMetrics {
    pub total_rooms: usize,
    pub total_connections: usize,
    pub connectivity: f64,
}

#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    RoomAdded { room_id: String },
    RoomRemoved { room_id: String, reason: String },
    ConnectionAdded { connection_id: String },
    ConnectionRemoved { connection_id: String, reason: String },
    EntityTransitionBegan { entity: EntityId, from_room: String, to_room: String },
    EntityTransitionEnded { entity: EntityId, from_room: String, to_room: String },
    LayoutChanged { layout: Layout, metrics: LayoutMetrics },
}

/// A graph of rooms and connections tracking which room each entity
/// currently occupies.
pub struct Orchestrator {
    rooms: HashMap<String, Room>,
    connections: HashMap<String, Connection>,
    entity_room: HashMap<EntityId, String>,
    layout: Option<Layout>,
    pub events: NotificationTopic<OrchestratorEvent>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            connections: HashMap::new(),
            entity_room: HashMap::new(),
            layout: None,
            events: NotificationTopic::new("orchestrator.events"),
        }
    }

    pub fn add_room(&mut self, room: Room) -> EngineResult<()> {
        if self.rooms.contains_key(&room.id) {
            return Err(EngineError::already_exists(format!("room '{}' already exists", room.id)));
        }
        let room_id = room.id.clone();
        self.rooms.insert(room_id.clone(), room);
        let _ = self.events.publish(&OrchestratorEvent::RoomAdded { room_id });
        Ok(())
    }

    pub fn remove_room(&mut self, room_id: &str, reason: impl Into<String>) -> EngineResult<()> {
        if !self.rooms.contains_key(room_id) {
            return Err(EngineError::not_found(format!("room '{room_id}' not found")));
        }
        let reason = reason.into();

        let touching: Vec<String> = self
            .connections
            .values()
            .filter(|c| c.from_room == room_id || c.to_room == room_id)
            .map(|c| c.id.clone())
            .collect();
        for connection_id in touching {
            self.connections.remove(&connection_id);
            let _ = self.events.publish(&OrchestratorEvent::ConnectionRemoved {
                connection_id,
                reason: reason.clone(),
            });
        }

        self.entity_room.retain(|_, r| r != room_id);
        self.rooms.remove(room_id);
        let _ = self.events.publish(&OrchestratorEvent::RoomRemoved {
            room_id: room_id.to_string(),
            reason,
        });
        Ok(())
    }

    pub fn add_connection(&mut self, connection: Connection) -> EngineResult<()> {
        if !self.rooms.contains_key(&connection.from_room) || !self.rooms.contains_key(&connection.to_room) {
            return Err(EngineError::invalid_argument("connection endpoints must both exist"));
        }
        if self.connections.contains_key(&connection.id) {
            return Err(EngineError::already_exists(format!(
                "connection '{}' already exists",
                connection.id
            )));
        }
        let connection_id = connection.id.clone();
        self.connections.insert(connection_id.clone(), connection);
        let _ = self
            .events
            .publish(&OrchestratorEvent::ConnectionAdded { connection_id });
        Ok(())
    }

    pub fn remove_connection(&mut self, connection_id: &str, reason: impl Into<String>) -> EngineResult<()> {
        if self.connections.remove(connection_id).is_none() {
            return Err(EngineError::not_found(format!("connection '{connection_id}' not found")));
        }
        let _ = self.events.publish(&OrchestratorEvent::ConnectionRemoved {
            connection_id: connection_id.to_string(),
            reason: reason.into(),
        });
        Ok(())
    }

    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    #[must_use]
    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    #[must_use]
    pub fn room_of(&self, entity: &str) -> Option<&str> {
        self.entity_room.get(entity).map(String::as_str)
    }

    /// Track an entity as occupying `room_id` without mutating the room
    /// itself. Call after placing the entity in the room.
    pub fn track_entity(&mut self, entity: impl Into<EntityId>, room_id: impl Into<String>) {
        self.entity_room.insert(entity.into(), room_id.into());
    }

    fn find_connection_between(&self, from_room: &str, to_room: &str) -> Option<&Connection> {
        self.connections.values().find(|c| {
            (c.from_room == from_room && c.to_room == to_room)
                || (c.reversible && c.from_room == to_room && c.to_room == from_room)
        })
    }

    /// Move an entity from its current room to `to_room` via any
    /// connection between the two, gated by traversability and the
    /// entity's tags.
    pub fn move_entity_between_rooms(
        &mut self,
        entity: &str,
        to_room: &str,
        entity_tags: &HashSet<String>,
        placeable: Placeable,
    ) -> EngineResult<()> {
        let from_room = self
            .entity_room
            .get(entity)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("entity '{entity}' has no current room")))?;

        let connection = self
            .find_connection_between(&from_room, to_room)
            .ok_or_else(|| EngineError::not_found("no connection between rooms"))?;
        if !connection.is_traversable(entity_tags) {
            return Err(EngineError::invalid_argument("connection is not traversable by this entity"));
        }
        let destination_pos = if connection.from_room == from_room {
            connection.to_pos
        } else {
            connection.from_pos
        };

        let _ = self.events.publish(&OrchestratorEvent::EntityTransitionBegan {
            entity: entity.to_string(),
            from_room: from_room.clone(),
            to_room: to_room.to_string(),
        });

        if let Some(src) = self.rooms.get_mut(&from_room) {
            src.remove_entity(entity)?;
        }
        let dest = self
            .rooms
            .get_mut(to_room)
            .ok_or_else(|| EngineError::not_found(format!("room '{to_room}' not found")))?;
        if let Err(err) = dest.place_entity(entity, destination_pos, placeable) {
            if let Some(src) = self.rooms.get_mut(&from_room) {
                let _ = src.place_entity(entity, connection_from_or_to(connection, &from_room), placeable);
            }
            return Err(err);
        }

        self.entity_room.insert(entity.to_string(), to_room.to_string());
        let _ = self.events.publish(&OrchestratorEvent::EntityTransitionEnded {
            entity: entity.to_string(),
            from_room,
            to_room: to_room.to_string(),
        });
        Ok(())
    }

    /// Breadth-first search over traversable connections from `from_room`
    /// to `to_room`. Returns the sequence of room ids, inclusive. Checks
    /// `cancel` once per dequeued path and returns `Cancelled` promptly.
    pub fn find_path(
        &self,
        from_room: &str,
        to_room: &str,
        entity_tags: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<String>> {
        if from_room == to_room {
            return Ok(vec![from_room.to_string()]);
        }
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<Vec<&str>> = VecDeque::new();
        queue.push_back(vec![from_room]);
        visited.insert(from_room);

        while let Some(path) = queue.pop_front() {
            cancel.check()?;
            let current = *path.last().unwrap();
            for connection in self.connections.values() {
                if !connection.is_traversable(entity_tags) {
                    continue;
                }
                let next = if connection.from_room == current {
                    Some(connection.to_room.as_str())
                } else if connection.reversible && connection.to_room == current {
                    Some(connection.from_room.as_str())
                } else {
                    None
                };
                let Some(next) = next else { continue };
                if next == to_room {
                    let mut result: Vec<String> = path.iter().map(|s| (*s).to_string()).collect();
                    result.push(next.to_string());
                    return Ok(result);
                }
                if visited.insert(next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    queue.push_back(extended);
                }
            }
        }
        Err(EngineError::not_found("no path between rooms"))
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = Some(layout);
        let metrics = self.layout_metrics();
        let _ = self
            .events
            .publish(&OrchestratorEvent::LayoutChanged { layout, metrics });
    }

    #[must_use]
    pub fn layout_metrics(&self) -> LayoutMetrics {
        let total_rooms = self.rooms.len();
        let total_connections = self.connections.len();
        let connectivity = if total_rooms > 1 {
            (2.0 * total_connections as f64) / (total_rooms as f64 * (total_rooms as f64 - 1.0))
        } else {
            0.0
        };
        LayoutMetrics {
            total_rooms,
            total_connections,
            connectivity,
        }
    }
}

fn connection_from_or_to(connection: &Connection, from_room: &str) -> Position {
    if connection.from_room == from_room {
        connection.from_pos
    } else {
        connection.to_pos
    }
}
