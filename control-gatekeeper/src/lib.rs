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

//! # Control-Gatekeeper
//! The single authority for order submission (spec 4.4): [`registry::CommandRegistry`] for
//! idempotency, [`guard::ExecutionGuard`] for pre-flight interlocks and rate limiting,
//! [`state_controller::GatekeeperStateController`] as the sole mutator of positions/orders,
//! and [`reconciliation::ReconciliationEngine`] for periodic exchange-truth reconciliation.

pub mod error;
pub mod registry;
pub mod token_bucket;
pub mod guard;
pub mod state_controller;
pub mod reconciliation;

pub use error::{GatekeeperError, HardBlockReason};
pub use state_controller::{GatekeeperStateController, SubmitOutcome};
