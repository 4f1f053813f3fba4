//! Mayer bond orders.

use crate::error::{CoreError, Result};
use crate::results::{AtomsOrbitalsIndexes, DensityMatrix};
use nalgebra::DMatrix;
use std::ops::Range;

/// Symmetric N x N matrix of Mayer bond orders with a zero diagonal.
///
/// For a closed-shell density `P` the bond order between atoms A and B is
/// the sum of `(PS)_{mu nu} (PS)_{nu mu}` over orbitals `mu` on A and `nu`
/// on B. Open-shell densities sum twice that expression per spin.
pub fn mayer_bond_orders(
    density: &DensityMatrix,
    overlap: &DMatrix<f64>,
    mapping: &AtomsOrbitalsIndexes,
) -> Result<DMatrix<f64>> {
    let n_ao = mapping.n_atomic_orbitals();
    check_square("overlap matrix", overlap, n_ao)?;
    let ranges: Vec<Range<usize>> = mapping.ranges().collect();
    match density {
        DensityMatrix::Restricted(p) => {
            check_square("density matrix", p, n_ao)?;
            Ok(atom_pair_sums(&(p * overlap), &ranges))
        }
        DensityMatrix::Unrestricted { alpha, beta } => {
            check_square("alpha density matrix", alpha, n_ao)?;
            check_square("beta density matrix", beta, n_ao)?;
            let orders = atom_pair_sums(&(alpha * overlap), &ranges)
                + atom_pair_sums(&(beta * overlap), &ranges);
            Ok(orders * 2.0)
        }
    }
}

fn check_square(what: &str, matrix: &DMatrix<f64>, n: usize) -> Result<()> {
    if matrix.shape() != (n, n) {
        return Err(CoreError::DimensionMismatch(format!(
            "{what} is {}x{}, expected {n}x{n}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

fn atom_pair_sums(ps: &DMatrix<f64>, ranges: &[Range<usize>]) -> DMatrix<f64> {
    let n_atoms = ranges.len();
    let mut orders = DMatrix::zeros(n_atoms, n_atoms);
    for a in 0..n_atoms {
        for b in (a + 1)..n_atoms {
            let mut sum = 0.0;
            for mu in ranges[a].clone() {
                for nu in ranges[b].clone() {
                    sum += ps[(mu, nu)] * ps[(nu, mu)];
                }
            }
            orders[(a, b)] = sum;
            orders[(b, a)] = sum;
        }
    }
    orders
}
