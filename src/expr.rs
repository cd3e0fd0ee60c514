//! Expression engine for rule templates.
//!
//! Rule templates are tiny algebraic expressions such as `c+9`, `v * 127` or
//! `channel_mode == TRIM`. This module parses them once, evaluates them over a
//! [`Scope`], reports their free variables, and solves systems of template
//! equations jointly.
//!
//! ## How the parts work together
//!
//! ```text
//! "v * 40 - 20" ── tokenize (lexer.rs) ── parse (parser.rs) ──▶ Expr
//!                                                               │
//!                     Expr::evaluate / Expr::variables (eval.rs)┤
//!                                                               │
//!   [Equation] ── linearize (affine.rs) ── Gauss-Jordan (solve.rs) ──▶ {name: value}
//! ```
//!
//! The solver only handles equations that are affine in their unknowns. That
//! covers every template shape the mapping tables use (offsets, scales and
//! their combinations) without pulling in a symbolic algebra system.
//!
//! ## Grammar
//!
//! ```text
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=" | "=>" | "=<") additive)?
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := primary ("^" unary)?
//! primary    := number | identifier | "(" comparison ")"
//! ```
//!
//! Comparisons evaluate to `1` or `0`.

#[path = "expr/affine.rs"]
mod affine;
#[path = "expr/eval.rs"]
mod eval;
#[path = "expr/lexer.rs"]
mod lexer;
#[path = "expr/parser.rs"]
mod parser;
#[path = "expr/solve.rs"]
mod solve;

use std::collections::BTreeMap;

pub use parser::{BinaryOp, Expr, Node};
pub use solve::{Equation, solve_system};

/// Anything that can look up a name's numeric value during evaluation.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Scope for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Named constants, declared once at initialization and immutable afterwards.
///
/// Constants are never free variables: they are excluded from
/// [`Expr::variables`], and the solver treats them as numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    values: BTreeMap<String, f64>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a constant.
    pub fn declare(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Scope for Constants {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Constants {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut constants = Constants::new();
        for (name, value) in iter {
            constants.declare(name, value);
        }
        constants
    }
}
