//! Scheduling domain models.
//!
//! Core data types for league schedules: slots of ice time, teams grouped
//! into divisions, games binding a pairing to a slot, and the parameter
//! object configuring assembly and optimization.
//!
//! All wire-facing types derive `Serialize`/`Deserialize`; the engine's
//! inputs and outputs are JSON-shaped.

mod division;
mod game;
mod params;
mod slot;
mod team;

pub use division::{normalize_division, Division};
pub use game::{Game, Pairing, Schedule, Swap, SwapPhase};
pub use params::{BlockRecipe, OptimizerWeights, ResolvedParams, ScheduleParams};
pub use slot::{EmlCategory, EmlCutoffs, Slot};
pub use team::Team;
