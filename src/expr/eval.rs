//! Numeric evaluation and free-variable discovery.

use std::collections::BTreeSet;

use super::parser::{BinaryOp, Expr, Node};
use super::{Constants, Scope};
use crate::error::ExprError;

impl Expr {
    /// Evaluate against `scope`. Comparisons yield `1.0` or `0.0`.
    pub fn evaluate<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ExprError> {
        let value = eval_node(self.root(), scope)?;
        if !value.is_finite() {
            return Err(ExprError::NonFinite);
        }
        Ok(value)
    }

    /// Names referenced by this expression that are not declared constants.
    pub fn variables(&self, constants: &Constants) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_names(self.root(), constants, &mut names);
        names
    }

    /// True when the expression references no free variables.
    pub fn is_constant(&self, constants: &Constants) -> bool {
        self.variables(constants).is_empty()
    }
}

pub(crate) fn apply(op: BinaryOp, lhs: f64, rhs: f64) -> Result<f64, ExprError> {
    let truth = |b: bool| if b { 1.0 } else { 0.0 };
    Ok(match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => {
            if rhs == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            lhs / rhs
        }
        BinaryOp::Pow => lhs.powf(rhs),
        BinaryOp::Eq => truth(lhs == rhs),
        BinaryOp::Ne => truth(lhs != rhs),
        BinaryOp::Lt => truth(lhs < rhs),
        BinaryOp::Le => truth(lhs <= rhs),
        BinaryOp::Gt => truth(lhs > rhs),
        BinaryOp::Ge => truth(lhs >= rhs),
    })
}

fn eval_node<S: Scope + ?Sized>(node: &Node, scope: &S) -> Result<f64, ExprError> {
    match node {
        Node::Number(value) => Ok(*value),
        Node::Name(name) => scope.lookup(name).ok_or_else(|| ExprError::UnknownVariable { name: name.clone() }),
        Node::Neg(inner) => Ok(-eval_node(inner, scope)?),
        Node::Binary { op, lhs, rhs } => apply(*op, eval_node(lhs, scope)?, eval_node(rhs, scope)?),
    }
}

fn collect_names(node: &Node, constants: &Constants, names: &mut BTreeSet<String>) {
    match node {
        Node::Number(_) => {}
        Node::Name(name) => {
            if !constants.contains(name) {
                names.insert(name.clone());
            }
        }
        Node::Neg(inner) => collect_names(inner, constants, names),
        Node::Binary { lhs, rhs, .. } => {
            collect_names(lhs, constants, names);
            collect_names(rhs, constants, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn scope(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluates_arithmetic() {
        let expr = Expr::parse("v * 40 - 20").unwrap();
        assert_eq!(expr.evaluate(&scope(&[("v", 0.5)])).unwrap(), 0.0);
        assert_eq!(Expr::parse("9+9").unwrap().evaluate(&scope(&[])).unwrap(), 18.0);
        assert_eq!(Expr::parse("2^10").unwrap().evaluate(&scope(&[])).unwrap(), 1024.0);
    }

    #[test]
    fn comparisons_are_zero_or_one() {
        let s = scope(&[("c", 3.0)]);
        assert_eq!(Expr::parse("c => 1").unwrap().evaluate(&s).unwrap(), 1.0);
        assert_eq!(Expr::parse("c <= 2").unwrap().evaluate(&s).unwrap(), 0.0);
        assert_eq!(Expr::parse("(c > 1) * (c < 5)").unwrap().evaluate(&s).unwrap(), 1.0);
    }

    #[test]
    fn constants_resolve_but_are_not_variables() {
        let constants: Constants = [("TRIM", 0.0), ("PAN", 1.0)].into_iter().collect();
        let expr = Expr::parse("channel_mode == TRIM").unwrap();
        assert_eq!(expr.variables(&constants), BTreeSet::from(["channel_mode".to_string()]));
        assert!(Expr::parse("PAN + 1").unwrap().is_constant(&constants));
        assert_eq!(Expr::parse("PAN + 1").unwrap().evaluate(&constants).unwrap(), 2.0);
    }

    #[test]
    fn reports_missing_names_and_bad_arithmetic() {
        let s = scope(&[]);
        assert_eq!(Expr::parse("v / 127").unwrap().evaluate(&s), Err(ExprError::UnknownVariable { name: "v".into() }));
        assert_eq!(Expr::parse("1 / 0").unwrap().evaluate(&s), Err(ExprError::DivisionByZero));
        assert_eq!(Expr::parse("10 ^ 400").unwrap().evaluate(&s), Err(ExprError::NonFinite));
    }
}
