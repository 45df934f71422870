//! Schedule construction and optimization engine for slot-based leagues.
//!
//! Turns a pool of time slots and a roster of teams/divisions into a season
//! schedule (one game per slot), then refines it week by week with a
//! multi-phase swap optimizer under operator control.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Slot`, `Team`, `Division`, `Game`,
//!   `Schedule`, `Swap`, `ScheduleParams`
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling
//!   division references, inverted slot intervals)
//! - **`roundrobin`**: Circle-method round-robin rounds and pairing queues
//! - **`assembler`**: Block/recipe-driven strict filler producing the
//!   initial schedule
//! - **`optimizer`**: Multi-phase week optimizer and the greedy
//!   days-since-last-played re-sequencer
//! - **`orchestration`**: Serializable week-by-week progression state
//! - **`kpi`**: Per-team and per-division schedule quality metrics
//!
//! # Architecture
//!
//! The engine is a pure function of its inputs: each call receives slots,
//! teams, and parameters (or a full schedule to optimize) and returns a new
//! schedule plus diagnostics. Nothing is persisted and no state is shared
//! between invocations; the caller owns the `SeasonProgress` object between
//! optimization rounds.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - de Werra (1981), "Scheduling in Sports", Annals of Discrete Mathematics 11

pub mod assembler;
pub mod error;
pub mod kpi;
pub mod models;
pub mod optimizer;
pub mod orchestration;
pub mod roundrobin;
pub mod validation;

pub use assembler::{assemble, Assembly, TeamShortfall};
pub use error::{Result, ScheduleError};
pub use models::{
    Division, EmlCategory, EmlCutoffs, Game, OptimizerWeights, Pairing, Schedule, ScheduleParams,
    Slot, Swap, SwapPhase, Team,
};
pub use optimizer::{optimize, resequence_days_since, OptimizeOutcome};
pub use orchestration::{SeasonProgress, WeekState};
