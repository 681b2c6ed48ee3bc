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

//! # Control-Core
//! Shared leaf primitives used by every other crate in the control plane:
//! - [`clock`]: the two non-interchangeable time domains (monotonic vs epoch).
//! - [`decimal`]: the process-wide fixed-precision arithmetic context.
//! - [`payload`]: a canonical, order-independent map used for journal payloads and hashing.
//! - [`model`]: the core data contract (`Packet`, `OrderIntent`, `ExecutionReport`, ...).
//! - [`journal`]: the append-only, line-delimited write-ahead event log.
//! - [`state`]: the shared state-store abstraction (`observer:*` / `gk:*` namespaces).
//!
//! Dependency order mirrors the module list above: each module depends only on the ones
//! before it.

/// Two non-interchangeable time domains: [`clock::MonotonicUs`] and [`clock::EpochUs`].
pub mod clock;

/// Process-wide fixed-precision decimal arithmetic context.
pub mod decimal;

/// Canonical, order-independent payload map used for journal entries and state hashing.
pub mod payload;

/// Core data contract shared by the Observer, Gatekeeper and Simulator.
pub mod model;

/// Append-only, line-delimited write-ahead event log.
pub mod journal;

/// Shared state-store abstraction (`observer:*` / `gk:*` key namespaces).
pub mod state;

/// All [`Error`](std::error::Error)s generated in `control-core`.
pub mod error;

pub use error::CoreError;
