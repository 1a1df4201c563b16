//! Data-directory loader.
//!
//! ```text
//! <data_dir>/
//!   regions/buses.csv
//!   regions/loads.csv                                  (optional)
//!   topology/lines/line_types.csv
//!   topology/lines/lines.csv
//!   topology/centrales/carriers.csv
//!   topology/centrales/generators.csv
//!   timeseries/<year>/loads-p_set.csv
//!   timeseries/<year>/generation/generators-marginal_cost.csv
//!   timeseries/<year>/generation/generators-p_max_pu.csv   (optional)
//! ```

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use hq_core::{ImportDiagnostics, Network, NetworkTimeSeries, TimeSeriesTable};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::builder::NetworkBuilder;
use crate::records::{
    BusRecord, CarrierRecord, GeneratorRecord, LineRecord, LineTypeRecord, LoadRecord,
};
use crate::timeseries::{parse_date_bound, read_timeseries_csv};
use crate::{DataLoadError, ImportResult};

/// Read every row of a name-indexed table.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataLoadError::csv(path, e))?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result.map_err(|e| DataLoadError::csv(path, e))?);
    }
    debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct NetworkDataLoader {
    data_dir: PathBuf,
}

impl NetworkDataLoader {
    /// Fails when `data_dir` does not exist.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, DataLoadError> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            return Err(DataLoadError::MissingDirectory(data_dir));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn buses_path(&self) -> PathBuf {
        self.data_dir.join("regions").join("buses.csv")
    }

    pub fn loads_path(&self) -> PathBuf {
        self.data_dir.join("regions").join("loads.csv")
    }

    pub fn line_types_path(&self) -> PathBuf {
        self.data_dir.join("topology").join("lines").join("line_types.csv")
    }

    pub fn lines_path(&self) -> PathBuf {
        self.data_dir.join("topology").join("lines").join("lines.csv")
    }

    pub fn carriers_path(&self) -> PathBuf {
        self.data_dir.join("topology").join("centrales").join("carriers.csv")
    }

    pub fn generators_path(&self) -> PathBuf {
        self.data_dir.join("topology").join("centrales").join("generators.csv")
    }

    pub fn timeseries_dir(&self, year: &str) -> PathBuf {
        self.data_dir.join("timeseries").join(year)
    }

    /// Load the static tables into a network.
    ///
    /// Buses come first so every other table can resolve bus names; line
    /// types are applied once all lines are in.
    pub fn load_network_data(&self) -> Result<ImportResult, DataLoadError> {
        let buses: Vec<BusRecord> = read_table(&self.buses_path())?;
        let line_types: Vec<LineTypeRecord> = read_table(&self.line_types_path())?;
        let lines: Vec<LineRecord> = read_table(&self.lines_path())?;
        let carriers: Vec<CarrierRecord> = read_table(&self.carriers_path())?;
        let generators: Vec<GeneratorRecord> = read_table(&self.generators_path())?;
        let loads: Vec<LoadRecord> = if self.loads_path().exists() {
            read_table(&self.loads_path())?
        } else {
            Vec::new()
        };

        let mut diagnostics = ImportDiagnostics::new();
        let mut builder = NetworkBuilder::with_diagnostics(&mut diagnostics);
        for record in buses {
            builder.add_bus(record);
        }
        for record in line_types {
            builder.add_line_type(record);
        }
        for record in lines {
            builder.add_line(record);
        }
        for record in carriers {
            builder.add_carrier(record);
        }
        for record in generators {
            builder.add_generator(record);
        }
        for record in loads {
            builder.add_load(record);
        }
        let network = builder.build();

        info!(
            dir = %self.data_dir.display(),
            summary = %diagnostics.summary(),
            "loaded network data"
        );
        Ok(ImportResult {
            network,
            diagnostics,
        })
    }

    /// Load the time series of `year`, optionally restricted to
    /// `[start, end]` (both `YYYY-MM-DD`, inclusive).
    pub fn load_timeseries_data(
        &self,
        year: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<NetworkTimeSeries, DataLoadError> {
        let dir = self.timeseries_dir(year);
        let loads_p_set = read_timeseries_csv(&dir.join("loads-p_set.csv"))?;
        let generation = dir.join("generation");
        let generators_marginal_cost =
            read_timeseries_csv(&generation.join("generators-marginal_cost.csv"))?;
        let p_max_path = generation.join("generators-p_max_pu.csv");
        let generators_p_max_pu = if p_max_path.exists() {
            read_timeseries_csv(&p_max_path)?
        } else {
            TimeSeriesTable::default()
        };

        let series = NetworkTimeSeries {
            loads_p_set,
            generators_marginal_cost,
            generators_p_max_pu,
        };

        let start = start.map(|s| parse_date_bound(s, false)).transpose()?;
        let end = end.map(|e| parse_date_bound(e, true)).transpose()?;
        let series = if start.is_some() || end.is_some() {
            series.restrict(start, end)
        } else {
            series
        };
        info!(year, snapshots = series.snapshots().len(), "loaded time series");
        Ok(series)
    }

    /// Static network plus time series, with loads created for every
    /// load column that names a bus but has no load row.
    pub fn load_study(
        &self,
        year: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<(ImportResult, NetworkTimeSeries), DataLoadError> {
        let mut import = self.load_network_data()?;
        let series = self.load_timeseries_data(year, start, end)?;
        attach_series_loads(&mut import.network, &series, &mut import.diagnostics);
        Ok((import, series))
    }
}

/// Create a load for each `loads-p_set` column that matches a bus name and
/// is not already a load. Columns matching neither are reported.
pub fn attach_series_loads(
    network: &mut Network,
    series: &NetworkTimeSeries,
    diag: &mut ImportDiagnostics,
) {
    let existing: Vec<String> = network.loads().iter().map(|l| l.name.clone()).collect();
    let mut next_id = existing.len();
    for column in &series.loads_p_set.columns {
        if existing.contains(column) {
            continue;
        }
        match network.bus_by_name(column).map(|b| b.id) {
            Some(bus) => {
                network.add_load(hq_core::Load::new(
                    hq_core::LoadId::new(next_id),
                    column.clone(),
                    bus,
                    0.0,
                ));
                next_id += 1;
                diag.stats.loads += 1;
            }
            None => diag.add_warning_with_entity(
                "reference",
                "load series column matches no load and no bus",
                &format!("Load {column}"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_an_error() {
        let err = NetworkDataLoader::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, DataLoadError::MissingDirectory(_)));
    }

    #[test]
    fn paths_follow_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        let loader = NetworkDataLoader::new(dir.path()).unwrap();
        assert!(loader.lines_path().ends_with("topology/lines/lines.csv"));
        assert!(loader
            .timeseries_dir("2024")
            .ends_with("timeseries/2024"));
    }
}
