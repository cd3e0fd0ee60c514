//! Rule resolution.
//!
//! Resolving applies one rule to one incoming message in one direction:
//!
//! ```text
//! message ─▶ pick source/output templates by direction
//!         ─▶ address must match                     (else silent)
//!         ─▶ argument count must match              (else warn)
//!         ─▶ constant slots must equal their args   (else silent)
//!         ─▶ variable slots: solve jointly          (else error)
//!         ─▶ solved names must not shadow globals   (else error)
//!         ─▶ guards over env ∪ solution             (false: silent, failure: error)
//!         ─▶ forward only: commit `set` directives  (unknown target: error, nothing written)
//!         ─▶ evaluate output template               (failure: error, no message)
//! ```
//!
//! Everything up to the `set` step is pure. The persistent [`Environment`]
//! is written in exactly one place, after every guard has passed, and only in
//! the forward direction. Once written, the rule counts as fired: a broken
//! output template costs the message, not the mutation.

use std::collections::BTreeMap;

use super::compiled_rules::{CompiledRule, Slot, Template};
use super::diagnostics::{self, Abort};
use super::environment::{Environment, WorkingScope};
use crate::expr::{Equation, solve_system};
use crate::{Direction, Message, Value};

/// Result of a rule that passed its guards and committed its mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    /// The output message, if the rule declares one for this direction, or
    /// why it could not be built.
    pub output: Result<Option<Message>, Abort>,
    /// Number of variables written by `set` directives.
    pub mutations: usize,
}

/// Apply `rule` to `message`, logging any abort through the diagnostics
/// policy. Returns the produced output message, if any.
pub fn resolve(
    rule: &CompiledRule,
    direction: Direction,
    message: &Message,
    env: &mut Environment,
) -> Option<Message> {
    run(rule, direction, message, env).and_then(|fired| fired.output.ok().flatten())
}

/// Like [`resolve`], but keeps the [`Fired`] details for the dispatch loop.
pub(crate) fn run(
    rule: &CompiledRule,
    direction: Direction,
    message: &Message,
    env: &mut Environment,
) -> Option<Fired> {
    match evaluate(rule, direction, message, env) {
        Ok(fired) => {
            match &fired.output {
                Ok(output) => diagnostics::report_fired(rule, direction, message, output.as_ref()),
                Err(abort) => diagnostics::report(rule, direction, message, abort),
            }
            Some(fired)
        }
        Err(abort) => {
            diagnostics::report(rule, direction, message, &abort);
            None
        }
    }
}

/// Apply `rule` to `message` and return why it did not fire, without logging.
pub fn evaluate(
    rule: &CompiledRule,
    direction: Direction,
    message: &Message,
    env: &mut Environment,
) -> Result<Fired, Abort> {
    let (source, output) = rule.templates(direction);
    let source = source.ok_or(Abort::NoSourceTemplate)?;

    let bindings = match_template(source, message, env)?;
    let scope = WorkingScope::new(env, &bindings);

    for condition in &rule.conditions {
        match condition.evaluate(&scope) {
            Ok(value) if value != 0.0 => {}
            Ok(_) => return Err(Abort::GuardFailed { condition: condition.to_string() }),
            Err(source) => return Err(Abort::GuardUnevaluable { condition: condition.to_string(), source }),
        }
    }

    let mut writes = Vec::new();
    if direction == Direction::Forward {
        for (name, value) in &rule.mutations {
            if !env.contains(name) {
                return Err(Abort::UnknownMutationTarget { name: name.clone() });
            }
            let evaluated = value.evaluate(&scope).map_err(|source| Abort::MutationUnevaluable {
                name: name.clone(),
                value: value.to_string(),
                source,
            })?;
            writes.push((name.clone(), evaluated));
        }
    }

    // The output sees the environment as it was when the message arrived.
    let produced = output.map(|template| build_output(template, &scope)).transpose();

    let mutations = writes.len();
    env.commit(writes);

    Ok(Fired { output: produced, mutations })
}

/// Match `message` against `template` and solve its variable slots.
fn match_template(
    template: &Template,
    message: &Message,
    env: &Environment,
) -> Result<BTreeMap<String, f64>, Abort> {
    if template.address != message.address {
        return Err(Abort::AddressMismatch);
    }
    if template.slots.len() != message.args.len() {
        return Err(Abort::ArityMismatch { expected: template.slots.len(), actual: message.args.len() });
    }

    let mut equations = Vec::new();
    for (position, (slot, arg)) in template.slots.iter().zip(&message.args).enumerate() {
        let supplied = arg.as_f64().ok_or(Abort::NonNumericArgument { position })?;
        match slot {
            Slot::Constant { value, .. } => {
                if *value != supplied {
                    return Err(Abort::ConstantMismatch { position, expected: *value });
                }
            }
            Slot::Variable { expr, .. } => equations.push(Equation::with_value(expr.clone(), supplied)),
        }
    }

    if equations.is_empty() {
        return Ok(BTreeMap::new());
    }

    let bindings = solve_system(&equations, env.constants()).map_err(Abort::Solve)?;
    if let Some(name) = bindings.keys().find(|name| env.contains(name)) {
        return Err(Abort::VariableConflict { name: name.clone() });
    }
    Ok(bindings)
}

fn build_output(template: &Template, scope: &WorkingScope<'_>) -> Result<Message, Abort> {
    let args = template
        .slots
        .iter()
        .map(|slot| {
            let expr = slot.expr();
            expr.evaluate(scope)
                .map(Value::from_number)
                .map_err(|source| Abort::OutputUnevaluable { expr: expr.to_string(), source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Message::new(template.address.clone(), args))
}
