use hq_core::GridError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PowerFlowError {
    /// Network fails the pre-solve checks
    #[error("network is not solvable: {0}")]
    InvalidNetwork(String),

    #[error("singular system ({context}): {message}")]
    Singular { context: String, message: String },

    #[error("unknown power flow mode '{0}' (expected 'dc' or 'ac')")]
    UnknownMode(String),

    #[error("snapshot {0} is not in the time series")]
    UnknownSnapshot(String),

    /// Analysis requested before a successful run
    #[error("no power flow results available")]
    NoResults,

    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("dispatch infeasible: {0}")]
    Infeasible(String),

    #[error("dispatch data validation: {0}")]
    DataValidation(String),

    #[error("LP solver failed: {0}")]
    Solver(String),

    #[error("unknown dispatch method '{0}' (expected 'merit' or 'lopf')")]
    UnknownMethod(String),

    #[error("dispatch method {0} is not compiled in")]
    Unavailable(&'static str),

    #[error("snapshot index {index} out of range ({len} snapshots)")]
    SnapshotOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl From<PowerFlowError> for GridError {
    fn from(err: PowerFlowError) -> Self {
        match err {
            PowerFlowError::Grid(inner) => inner,
            PowerFlowError::InvalidNetwork(msg) => GridError::Validation(msg),
            other => GridError::Solver(other.to_string()),
        }
    }
}

impl From<DispatchError> for GridError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Grid(inner) => inner,
            DispatchError::DataValidation(msg) => GridError::Validation(msg),
            other => GridError::Solver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_grid_errors() {
        let err: GridError = PowerFlowError::InvalidNetwork("no slack".into()).into();
        assert!(matches!(err, GridError::Validation(_)));
        let err: GridError = DispatchError::Infeasible("short".into()).into();
        assert!(matches!(err, GridError::Solver(_)));
    }
}
