use hq_core::GridError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing grid data files.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("data directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("required file {0} not found")]
    MissingFile(PathBuf),

    #[error("reading {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("reading {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {message}")]
    Schema { path: PathBuf, message: String },

    #[error("invalid timestamp '{value}' in {path}")]
    InvalidTimestamp { path: PathBuf, value: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("geocoding request failed: {0}")]
    Geocoding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Network(#[from] GridError),
}

impl DataLoadError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataLoadError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DataLoadError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DataLoadError> for GridError {
    fn from(err: DataLoadError) -> Self {
        match err {
            DataLoadError::Io(io) => GridError::Io(io),
            DataLoadError::Network(inner) => inner,
            other => GridError::Parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_message_names_path() {
        let err = DataLoadError::MissingDirectory(PathBuf::from("/nope/data"));
        assert_eq!(err.to_string(), "data directory /nope/data does not exist");
    }

    #[test]
    fn converts_into_grid_error() {
        let err: GridError = DataLoadError::InvalidDate("2024-13-01".into()).into();
        assert!(matches!(err, GridError::Parse(_)));
        let err: GridError = DataLoadError::Network(GridError::Validation("x".into())).into();
        assert!(matches!(err, GridError::Validation(_)));
    }
}
