//! Mapping and feedback engine.
//!
//! This module turns incoming protocol messages into outgoing ones using the
//! compiled rule tables. It is split into focused submodules under
//! `src/engine/`.
//!
//! ## How the parts work together
//!
//! ```text
//! RuleSpec (config)  ──┐
//!                     │  RuleTables::compile          (compiled_rules.rs)
//!                     └──────────────┬──────────────
//!                                    │
//! Inbound ── dispatch (dispatch.rs) ─┼─ pick table(s) + direction by origin
//!                                    │
//!                                    v
//!                          resolve (resolve.rs), per rule
//!                            - match address / arity / constants
//!                            - solve variable slots jointly (crate::expr)
//!                            - guards over Environment ∪ solution
//!                            - forward only: commit `set`
//!                            - evaluate output template
//!                                    │
//!                    Abort ──────────┼──▶ diagnostics.rs (log policy)
//!                                    v
//!                             DispatchReport (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiled_rules.rs`: parses rule expressions once and classifies each
//!   argument template as constant or variable.
//! - `environment.rs`: the persistent variable store and the per-resolution
//!   working scope layered on top of it.
//! - `resolve.rs`: one rule against one message; the only place that writes
//!   the environment.
//! - `dispatch.rs`: runs every rule of the relevant table(s) and routes the
//!   outputs to the opposite side.
//! - `diagnostics.rs`: the [`Abort`] taxonomy and how loudly each is logged.
//! - `metrics.rs`: per-pass counters and timing.
//!
//! ## Concurrency
//!
//! Everything here is synchronous and single-threaded. Passes must not
//! overlap: `set` effects from message N have to be visible to message N+1
//! and invisible to message N-1. Callers on a multi-threaded runtime should
//! funnel messages through one owner of the [`crate::Bridge`].
//!
//! ## Debugging
//!
//! Set `RUST_LOG=faderlink=debug` to log every rule that fires, or
//! `RUST_LOG=faderlink=trace` to also see why every other rule was skipped.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/diagnostics.rs"]
mod diagnostics;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/environment.rs"]
mod environment;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/resolve.rs"]
mod resolve;

pub use compiled_rules::{CompiledRule, RuleTables, Slot, Template};
pub use diagnostics::{Abort, Severity};
pub(crate) use dispatch::dispatch;
pub use environment::{Environment, WorkingScope};
pub use metrics::DispatchReport;
pub use resolve::{Fired, evaluate, resolve};
