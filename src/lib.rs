//! Event-driven combat resolution pipeline and spatial orchestration
//! substrate for tabletop-RPG engines. See `SPEC_FULL.md`.
//!
//! The crate is organized in layers: [`event_bus`] (notification/chain
//! topics), [`spatial`] (grids, rooms, the multi-room orchestrator),
//! [`combat`] (action economy, the combatant contract, resolvers), [`turn`]
//! (the per-character turn state machine), [`persistence`] (save/load
//! façade), and [`config`] (layered tunables). Content libraries — classes,
//! spells, monsters — are out of scope; this crate provides the mechanics
//! they register against.

pub mod cancellation;
pub mod combat;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod persistence;
pub mod spatial;
pub mod turn;

pub use cancellation::CancellationToken;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
