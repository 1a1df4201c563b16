//! Dense linear-system backends.
//!
//! The DC power flow solves B'θ = P and the Newton-Raphson loop solves
//! J·Δx = -F; both go through [`LinearSystemBackend`].

mod backend;
mod registry;

pub use backend::{FaerSolver, GaussSolver, LinearSystemBackend};
pub use registry::SolverKind;
