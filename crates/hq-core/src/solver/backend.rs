use anyhow::{anyhow, Result};
use faer::{prelude::*, Mat};

/// Solves dense square systems `A x = b`.
pub trait LinearSystemBackend: Send + Sync {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>>;
}

fn check_shape(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<()> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(anyhow!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs.len(),
            n
        ));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(anyhow!("matrix must be square"));
    }
    Ok(())
}

/// Gauss-Jordan elimination with partial pivoting. Fine for a few hundred buses.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = matrix.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        check_shape(matrix, rhs)?;

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
                .unwrap_or(col);
            a.swap(col, pivot);
            b.swap(col, pivot);

            let diag = a[col][col];
            if diag.abs() < 1e-12 {
                return Err(anyhow!("singular matrix at column {col}"));
            }
            for value in a[col][col..].iter_mut() {
                *value /= diag;
            }
            b[col] /= diag;

            let pivot_row = a[col][col..].to_vec();
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for (target, &p) in a[row][col..].iter_mut().zip(pivot_row.iter()) {
                    *target -= factor * p;
                }
                b[row] -= factor * b[col];
            }
        }

        Ok(b)
    }
}

/// LU with partial pivoting from faer.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = matrix.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        check_shape(matrix, rhs)?;

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let sol = mat.partial_piv_lu().solve(&rhs_mat);

        let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("singular matrix (non-finite LU solution)"));
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduced_susceptance() -> (Vec<Vec<f64>>, Vec<f64>) {
        // three-bus ring with the slack row/column removed
        (vec![vec![20.0, -10.0], vec![-10.0, 20.0]], vec![-1.0, -0.5])
    }

    #[test]
    fn gauss_and_faer_agree() {
        let (a, b) = reduced_susceptance();
        let g = GaussSolver.solve(&a, &b).unwrap();
        let f = FaerSolver.solve(&a, &b).unwrap();
        for (x, y) in g.iter().zip(f.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
        assert!((g[0] - (-2.5 / 30.0)).abs() < 1e-10);
    }

    #[test]
    fn gauss_rejects_singular() {
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(GaussSolver.solve(&a, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let a = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let err = FaerSolver.solve(&a, &[1.0]).unwrap_err();
        assert!(err.to_string().contains("rhs length"));
    }
}
