//! Joint solving of template equations.
//!
//! All equations of one resolution are solved as a single system so that a
//! variable appearing in several argument slots gets one consistent value.
//!
//! ```text
//! c + 9   == 12        1·c + 0·v = 3          c = 3
//! v * 127 == 64   ──▶  0·c + 127·v = 64  ──▶  v = 0.5039…
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::affine::{Affine, Linearize, linearize};
use super::{Constants, Expr};
use crate::error::SolveError;

/// Pivot and residual tolerance.
const EPSILON: f64 = 1e-9;

/// `lhs == rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Equation { lhs, rhs }
    }

    /// `template == value`, the shape produced when matching a message slot.
    pub fn with_value(lhs: Expr, value: f64) -> Self {
        Equation { lhs, rhs: Expr::number(value) }
    }

    fn residual(&self, constants: &Constants) -> Result<Affine, SolveError> {
        let side = |expr: &Expr| {
            linearize(expr.root(), constants).map_err(|err| match err {
                Linearize::NonLinear => SolveError::NonLinear { equation: self.to_string() },
                Linearize::Eval(source) => SolveError::Expr(source),
            })
        };
        Ok(side(&self.lhs)?.minus(side(&self.rhs)?))
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.lhs, self.rhs)
    }
}

/// Solve `equations` for every free variable they mention.
///
/// Returns a flat name → value map whatever the number of unknowns. The
/// system must determine every unknown uniquely; extra equations are allowed
/// as long as they agree.
pub fn solve_system(equations: &[Equation], constants: &Constants) -> Result<BTreeMap<String, f64>, SolveError> {
    let rows = equations.iter().map(|eq| eq.residual(constants)).collect::<Result<Vec<_>, _>>()?;

    let unknowns: Vec<String> =
        rows.iter().flat_map(|row| row.terms.keys().cloned()).collect::<BTreeSet<_>>().into_iter().collect();
    let cols = unknowns.len();

    // Augmented matrix [A | b] for A·x = b, where b = -constant.
    let mut matrix: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            let mut line: Vec<f64> = unknowns.iter().map(|name| row.terms.get(name).copied().unwrap_or(0.0)).collect();
            line.push(-row.constant);
            line
        })
        .collect();

    let mut pivot_cols = Vec::with_capacity(cols);
    let mut rank = 0;

    for col in 0..cols {
        if rank >= matrix.len() {
            break;
        }

        let best = (rank..matrix.len()).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()));
        let Some(best) = best else { break };
        if matrix[best][col].abs() < EPSILON {
            continue;
        }

        matrix.swap(rank, best);
        let pivot = matrix[rank][col];
        for cell in matrix[rank].iter_mut().skip(col) {
            *cell /= pivot;
        }

        let pivot_row = matrix[rank].clone();
        for (r, row) in matrix.iter_mut().enumerate() {
            if r == rank {
                continue;
            }
            let factor = row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, p) in row.iter_mut().zip(&pivot_row).skip(col) {
                *cell -= factor * p;
            }
        }

        pivot_cols.push(col);
        rank += 1;
    }

    if matrix.iter().skip(rank).any(|row| row[cols].abs() > EPSILON) {
        return Err(SolveError::Inconsistent);
    }

    if rank < cols {
        let free = unknowns
            .iter()
            .enumerate()
            .filter(|(i, _)| !pivot_cols.contains(i))
            .map(|(_, n)| n.clone())
            .collect();
        return Err(SolveError::Underdetermined { unknowns: free });
    }

    Ok(unknowns.into_iter().zip(matrix.iter()).map(|(name, row)| (name, snap(row[cols]))).collect())
}

/// Grid that solved values are snapped to when they sit within rounding noise of it.
const SNAP_GRID: f64 = 1e9;

/// Round away elimination noise so that `c = 2.9999999999999996` compares as
/// `3` and `0.5 / (1/127)` comes out as `63.5`.
fn snap(value: f64) -> f64 {
    let snapped = (value * SNAP_GRID).round() / SNAP_GRID;
    if (value - snapped).abs() <= 1e-12 * value.abs().max(1.0) { snapped } else { value }
}
