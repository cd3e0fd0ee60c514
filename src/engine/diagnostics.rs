//! Rule failure taxonomy and logging policy.
//!
//! Every way a rule can fail to fire is an [`Abort`]. Aborts are local to
//! one rule in one dispatch pass: the loop moves on to the next rule and the
//! process never sees an error. What differs is how loudly each one is
//! reported:
//!
//! | Abort                                      | Severity | Why it happens                      |
//! |--------------------------------------------|----------|-------------------------------------|
//! | no source template / address / constant    | silent   | rule is for another message         |
//! | guard false                                | silent   | mode gating                         |
//! | arity mismatch, non-numeric argument       | warn     | table disagrees with the device     |
//! | solve failure, variable conflict           | error    | inconsistent input or bad template  |
//! | unknown `set` target, evaluation failure   | error    | broken rule                         |
//!
//! Silent aborts still go to `trace` so a full rule trace is one
//! `RUST_LOG=faderlink=trace` away.

use thiserror::Error;

use super::compiled_rules::CompiledRule;
use crate::error::{ExprError, SolveError};
use crate::{Direction, Message};

/// Why a rule did not fire (or fired without producing its output).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Abort {
    #[error("rule has no template for this direction")]
    NoSourceTemplate,

    #[error("address does not match")]
    AddressMismatch,

    #[error("argument count mismatch: rule expects {expected}, message has {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("argument {position} does not match constant {expected}")]
    ConstantMismatch { position: usize, expected: f64 },

    #[error("argument {position} is not numeric")]
    NonNumericArgument { position: usize },

    #[error("failed to solve equations: {0}")]
    Solve(SolveError),

    #[error("solved variable `{name}` would shadow a global variable")]
    VariableConflict { name: String },

    #[error("condition `{condition}` is false")]
    GuardFailed { condition: String },

    #[error("failed to evaluate condition `{condition}`: {source}")]
    GuardUnevaluable { condition: String, source: ExprError },

    #[error("cannot create new variable `{name}` in set clause")]
    UnknownMutationTarget { name: String },

    #[error("failed to evaluate set value `{name} = {value}`: {source}")]
    MutationUnevaluable { name: String, value: String, source: ExprError },

    #[error("failed to evaluate output argument `{expr}`: {source}")]
    OutputUnevaluable { expr: String, source: ExprError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Silent,
    Warn,
    Error,
}

impl Abort {
    pub fn severity(&self) -> Severity {
        match self {
            Abort::NoSourceTemplate
            | Abort::AddressMismatch
            | Abort::ConstantMismatch { .. }
            | Abort::GuardFailed { .. } => Severity::Silent,
            Abort::ArityMismatch { .. } | Abort::NonNumericArgument { .. } => Severity::Warn,
            Abort::Solve(_)
            | Abort::VariableConflict { .. }
            | Abort::GuardUnevaluable { .. }
            | Abort::UnknownMutationTarget { .. }
            | Abort::MutationUnevaluable { .. }
            | Abort::OutputUnevaluable { .. } => Severity::Error,
        }
    }
}

/// Log an abort at the level its severity calls for.
pub(crate) fn report(rule: &CompiledRule, direction: Direction, message: &Message, abort: &Abort) {
    match abort.severity() {
        Severity::Silent => {
            tracing::trace!(rule = %rule.label, %direction, message = %message, reason = %abort, "rule skipped")
        }
        Severity::Warn => {
            tracing::warn!(rule = %rule.label, %direction, message = %message, reason = %abort, "rule skipped")
        }
        Severity::Error => {
            tracing::error!(rule = %rule.label, %direction, message = %message, reason = %abort, "rule aborted")
        }
    }
}

/// Log a rule that fired.
pub(crate) fn report_fired(rule: &CompiledRule, direction: Direction, message: &Message, output: Option<&Message>) {
    match output {
        Some(output) => {
            tracing::debug!(rule = %rule.label, %direction, message = %message, output = %output, "rule fired")
        }
        None => tracing::debug!(rule = %rule.label, %direction, message = %message, "rule fired without output"),
    }
}
