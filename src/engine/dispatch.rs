//! The dispatch loop.
//!
//! One incoming message triggers one complete pass:
//!
//! ```text
//! surface "xtouch" ──▶ rules of "xtouch", Forward ──▶ outputs to Automation
//! automation       ──▶ rules of every surface, Feedback ──▶ outputs to that surface
//! ```
//!
//! Every rule of the selected table(s) is resolved, in declaration order; the
//! loop never stops at the first match because several independent rules
//! may fire for the same message (a mode switch and a parameter pass-through,
//! for instance). Outputs are not merged or deduplicated.
//!
//! The only state carried from one pass to the next is the [`Environment`];
//! a `set` performed by rule N is visible to rule N+1 of the same pass and to
//! every later message.

use std::time::Instant;

use super::compiled_rules::{CompiledRule, RuleTables};
use super::environment::Environment;
use super::metrics::DispatchReport;
use super::resolve::run;
use crate::{Direction, Inbound, Message, Outbound, Peer};

/// Run one dispatch pass for `inbound`.
pub(crate) fn dispatch(tables: &RuleTables, env: &mut Environment, inbound: &Inbound) -> DispatchReport {
    let start = Instant::now();
    let direction = Direction::of(&inbound.origin);
    let mut report = DispatchReport::default();

    match &inbound.origin {
        Peer::Surface(surface) => match tables.table(surface) {
            Some(rules) => apply_table(rules, direction, &inbound.message, env, Peer::Automation, &mut report),
            None => tracing::warn!(surface = %surface, message = %inbound.message, "unknown source surface"),
        },
        Peer::Automation => {
            for (surface, rules) in tables.iter() {
                let destination = Peer::Surface(surface.to_string());
                apply_table(rules, direction, &inbound.message, env, destination, &mut report);
            }
        }
    }

    report.elapsed = start.elapsed();
    tracing::trace!(
        origin = %inbound.origin,
        message = %inbound.message,
        considered = report.rules_considered,
        fired = report.rules_fired,
        outputs = report.outputs.len(),
        elapsed_us = report.elapsed.as_micros() as u64,
        "dispatch pass complete"
    );
    report
}

fn apply_table(
    rules: &[CompiledRule],
    direction: Direction,
    message: &Message,
    env: &mut Environment,
    destination: Peer,
    report: &mut DispatchReport,
) {
    for rule in rules {
        report.rules_considered += 1;
        let Some(fired) = run(rule, direction, message, env) else { continue };
        report.rules_fired += 1;
        report.mutations += fired.mutations;
        if let Ok(Some(output)) = fired.output {
            report.outputs.push(Outbound { destination: destination.clone(), message: output });
        }
    }
}
