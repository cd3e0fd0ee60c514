//! Dispatch pass metrics.
//!
//! A [`DispatchReport`] is what one pass over the rule tables produced: the
//! routed output messages plus a few counters that make it easy to see, in
//! logs or tests, how much of the table a message exercised.

use std::time::Duration;

use crate::Outbound;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Output messages, in rule declaration order, already tagged with their
    /// destination.
    pub outputs: Vec<Outbound>,
    /// Number of rules evaluated during the pass.
    pub rules_considered: usize,
    /// Number of rules that fired, including ones that only mutated state and
    /// ones whose output template failed after their mutations committed.
    pub rules_fired: usize,
    /// Number of variables written by firing rules.
    pub mutations: usize,
    /// Elapsed time for the pass.
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
