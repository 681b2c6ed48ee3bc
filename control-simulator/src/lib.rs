#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Control-Simulator
//! Deterministic replay engine (spec 4.5): reads a completed journal, replays it through the
//! same state-transition logic the live Gatekeeper and Observer use, and reports a
//! [`verdict::Verdict`] describing whether the replayed trajectory matches a reference hash
//! log, if one was supplied.
//!
//! Determinism rests on three things: [`config::SimulatorConfig`] binds the run's inputs into
//! a single content hash, [`ordering::sort_for_replay`] gives every event a total order even
//! across ties, and [`replay::apply`] is a pure function of `(event, state)` with no wall
//! clock, no randomness, and no concurrency anywhere in its call path.

pub mod config;
pub mod error;
pub mod hash;
pub mod ordering;
pub mod replay;
pub mod verdict;

pub use error::SimulatorError;
pub use replay::ReplayState;
pub use verdict::{DivergencePoint, Verdict, VerdictResult};
