use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use crate::GridError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Selectable linear-system backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Gauss,
    #[default]
    Faer,
}

impl FromStr for SolverKind {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" => Ok(SolverKind::Gauss),
            "faer" | "default" => Ok(SolverKind::Faer),
            other => Err(GridError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                other,
                SolverKind::available().join(", ")
            ))),
        }
    }
}

impl SolverKind {
    pub fn build_solver(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            SolverKind::Gauss => Arc::new(GaussSolver),
            SolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Gauss => "gauss",
            SolverKind::Faer => "faer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_kind_parsing() {
        assert_eq!("gauss".parse::<SolverKind>().unwrap(), SolverKind::Gauss);
        assert_eq!("FAER".parse::<SolverKind>().unwrap(), SolverKind::Faer);
        assert!("lapack".parse::<SolverKind>().is_err());
    }

    #[test]
    fn built_solvers_solve_diagonal_system() {
        let matrix = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        for kind in [SolverKind::Gauss, SolverKind::Faer] {
            let x = kind.build_solver().solve(&matrix, &[4.0, 2.0]).unwrap();
            assert!((x[0] - 2.0).abs() < 1e-12, "{}", kind.as_str());
            assert!((x[1] - 0.5).abs() < 1e-12, "{}", kind.as_str());
        }
    }
}
