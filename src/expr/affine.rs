//! Affine forms: `Σ aᵢ·xᵢ + b`.
//!
//! The solver rewrites each side of an equation into this shape. Anything
//! that cannot be written this way (a product of two unknowns, division by an
//! unknown, an unknown in an exponent) is rejected as non-linear.

use std::collections::BTreeMap;

use super::Constants;
use super::eval::apply;
use super::parser::{BinaryOp, Node};
use crate::error::ExprError;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Affine {
    pub terms: BTreeMap<String, f64>,
    pub constant: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Linearize {
    NonLinear,
    Eval(ExprError),
}

impl From<ExprError> for Linearize {
    fn from(err: ExprError) -> Self {
        Linearize::Eval(err)
    }
}

impl Affine {
    fn constant(value: f64) -> Self {
        Affine { terms: BTreeMap::new(), constant: value }
    }

    fn variable(name: &str) -> Self {
        Affine { terms: BTreeMap::from([(name.to_string(), 1.0)]), constant: 0.0 }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    fn scale(mut self, factor: f64) -> Self {
        for coeff in self.terms.values_mut() {
            *coeff *= factor;
        }
        self.constant *= factor;
        self.prune()
    }

    fn plus(mut self, other: Affine, sign: f64) -> Self {
        for (name, coeff) in other.terms {
            *self.terms.entry(name).or_insert(0.0) += sign * coeff;
        }
        self.constant += sign * other.constant;
        self.prune()
    }

    pub fn minus(self, other: Affine) -> Self {
        self.plus(other, -1.0)
    }

    fn prune(mut self) -> Self {
        self.terms.retain(|_, coeff| *coeff != 0.0);
        self
    }
}

/// Rewrite `node` as an affine form over its free variables.
pub(crate) fn linearize(node: &Node, constants: &Constants) -> Result<Affine, Linearize> {
    match node {
        Node::Number(value) => Ok(Affine::constant(*value)),
        Node::Name(name) => Ok(match constants.get(name) {
            Some(value) => Affine::constant(value),
            None => Affine::variable(name),
        }),
        Node::Neg(inner) => Ok(linearize(inner, constants)?.scale(-1.0)),
        Node::Binary { op, lhs, rhs } => {
            let lhs = linearize(lhs, constants)?;
            let rhs = linearize(rhs, constants)?;
            combine(*op, lhs, rhs)
        }
    }
}

fn combine(op: BinaryOp, lhs: Affine, rhs: Affine) -> Result<Affine, Linearize> {
    if lhs.is_constant() && rhs.is_constant() {
        return Ok(Affine::constant(apply(op, lhs.constant, rhs.constant)?));
    }

    match op {
        BinaryOp::Add => Ok(lhs.plus(rhs, 1.0)),
        BinaryOp::Sub => Ok(lhs.plus(rhs, -1.0)),
        BinaryOp::Mul if lhs.is_constant() => Ok(rhs.scale(lhs.constant)),
        BinaryOp::Mul if rhs.is_constant() => Ok(lhs.scale(rhs.constant)),
        BinaryOp::Div if rhs.is_constant() => {
            if rhs.constant == 0.0 {
                return Err(ExprError::DivisionByZero.into());
            }
            Ok(lhs.scale(1.0 / rhs.constant))
        }
        BinaryOp::Pow if rhs.is_constant() && rhs.constant == 1.0 => Ok(lhs),
        BinaryOp::Pow if rhs.is_constant() && rhs.constant == 0.0 => Ok(Affine::constant(1.0)),
        _ => Err(Linearize::NonLinear),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn lin(source: &str) -> Result<Affine, Linearize> {
        let constants: Constants = [("OFFSET", 9.0)].into_iter().collect();
        linearize(Expr::parse(source).unwrap().root(), &constants)
    }

    #[test]
    fn offsets_and_scales() {
        let form = lin("(c + OFFSET) * 2 - v / 4").unwrap();
        assert_eq!(form.terms, BTreeMap::from([("c".to_string(), 2.0), ("v".to_string(), -0.25)]));
        assert_eq!(form.constant, 18.0);
    }

    #[test]
    fn cancelling_terms_disappear() {
        let form = lin("c - c + 3").unwrap();
        assert!(form.is_constant());
        assert_eq!(form.constant, 3.0);
    }

    #[test]
    fn rejects_non_affine_shapes() {
        assert_eq!(lin("c * v"), Err(Linearize::NonLinear));
        assert_eq!(lin("1 / v"), Err(Linearize::NonLinear));
        assert_eq!(lin("v ^ 2"), Err(Linearize::NonLinear));
        assert_eq!(lin("v == 1"), Err(Linearize::NonLinear));
        assert_eq!(lin("v / 0"), Err(Linearize::Eval(ExprError::DivisionByZero)));
    }
}
