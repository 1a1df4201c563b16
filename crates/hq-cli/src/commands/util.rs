use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use hq_algo::fill_line_lengths;
use hq_cli::{DataArgs, HqConfig};
use hq_core::{ImportDiagnostics, Network, NetworkTimeSeries};
use hq_io::{load_network_json, NetworkDataLoader};
use serde::Serialize;
use tracing::{info, warn};

/// A loaded network, its time series when a year was requested, and what
/// the loader had to say about the data.
pub struct Study {
    pub network: Network,
    pub series: Option<NetworkTimeSeries>,
    pub diagnostics: ImportDiagnostics,
}

impl Study {
    pub fn series(&self) -> Result<&NetworkTimeSeries> {
        self.series
            .as_ref()
            .ok_or_else(|| anyhow!("this command needs a time series: pass --year or set [data] year"))
    }
}

fn data_dir(data: &DataArgs, config: &HqConfig) -> PathBuf {
    data.data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone())
}

pub fn load_study(data: &DataArgs, config: &HqConfig) -> Result<Study> {
    let year = data.year.clone().or_else(|| config.data.year.clone());

    let mut study = if let Some(path) = &data.json {
        if year.is_some() {
            warn!("time series are not read alongside a JSON network");
        }
        let import = load_network_json(path)
            .with_context(|| format!("loading network from {}", path.display()))?;
        Study {
            network: import.network,
            series: None,
            diagnostics: import.diagnostics,
        }
    } else {
        let dir = data_dir(data, config);
        let loader = NetworkDataLoader::new(&dir)
            .with_context(|| format!("opening data directory {}", dir.display()))?;
        match year {
            Some(year) => {
                let (import, series) = loader
                    .load_study(&year, data.start.as_deref(), data.end.as_deref())
                    .with_context(|| format!("loading {year} study from {}", dir.display()))?;
                Study {
                    network: import.network,
                    series: Some(series),
                    diagnostics: import.diagnostics,
                }
            }
            None => {
                let import = loader
                    .load_network_data()
                    .with_context(|| format!("loading network from {}", dir.display()))?;
                Study {
                    network: import.network,
                    series: None,
                    diagnostics: import.diagnostics,
                }
            }
        }
    };

    let filled = fill_line_lengths(&mut study.network);
    if filled > 0 {
        info!(lines = filled, "line lengths computed from bus coordinates");
    }

    if study.diagnostics.has_issues() {
        warn!(summary = %study.diagnostics.summary(), "data loaded with issues");
    } else {
        info!("data loaded without issues");
    }
    Ok(study)
}

pub fn parse_snapshot(value: &str) -> Result<NaiveDateTime> {
    match hq_io::timeseries::parse_timestamp(value) {
        Some(ts) => Ok(ts),
        None => bail!("invalid snapshot '{value}', expected YYYY-MM-DD HH:MM:SS"),
    }
}

/// Row of `series` holding `snapshot`.
pub fn snapshot_row(series: &NetworkTimeSeries, snapshot: &str) -> Result<usize> {
    let ts = parse_snapshot(snapshot)?;
    series
        .loads_p_set
        .position(&ts)
        .ok_or_else(|| anyhow!("snapshot {ts} is not in the time series"))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(io::stdout(), value)
        .map_err(|err| anyhow!("serializing output to JSON: {err}"))?;
    println!();
    Ok(())
}
