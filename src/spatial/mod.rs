//! Spatial substrate: grids, rooms, and the multi-room orchestrator.
//! See `SPEC_FULL.md` §§3–4.4.

pub mod grid;
pub mod orchestrator;
pub mod room;

pub use grid::{build_grid, Circle, Cone, CubeCoordinate, Dimensions, Grid, GridShape, Position, Rectangle};
pub use orchestrator::{Connection, ConnectionType, Layout, LayoutMetrics, Orchestrator, OrchestratorEvent};
pub use room::{EntityId, Placeable, Room, RoomEvent};
