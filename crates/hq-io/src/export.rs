use std::fs;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::DataLoadError;

/// Write `rows` as a CSV table with a header row, creating parent
/// directories as needed.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), DataLoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DataLoadError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DataLoadError::csv(path, e))?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}
