use std::io::{self, Write};

use anyhow::{bail, Result};
use hq_algo::timeseries::{format_resolution, time_resolution};
use hq_algo::{check_temporal_consistency, find_peak_demand, production_patterns, seasonal_stats};
use hq_cli::{HqConfig, TsCommands};
use hq_io::write_csv;
use tabwriter::TabWriter;

use crate::commands::util::load_study;

pub fn handle(command: &TsCommands, config: &HqConfig) -> Result<()> {
    match command {
        TsCommands::Peaks { data, period } => {
            let study = load_study(data, config)?;
            let peaks = find_peak_demand(study.series()?, period.as_deref())?;
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "SNAPSHOT\tTOTAL LOAD (MW)")?;
            for peak in &peaks {
                writeln!(writer, "{}\t{:.1}", peak.snapshot, peak.total_load_mw)?;
            }
            writer.flush()?;
        }
        TsCommands::Seasonal { data } => {
            let study = load_study(data, config)?;
            let stats = seasonal_stats(&study.network, study.series()?);
            for quarter in &stats {
                println!("Q{}", quarter.quarter);
                let mut writer = TabWriter::new(io::stdout());
                for (name, mw) in &quarter.load {
                    writeln!(writer, "  load\t{name}\t{mw:.1} MW")?;
                }
                for (name, pu) in &quarter.non_pilotable_availability {
                    writeln!(writer, "  availability\t{name}\t{pu:.3}")?;
                }
                for (name, cost) in &quarter.pilotable_marginal_cost {
                    writeln!(writer, "  marginal cost\t{name}\t{cost:.2} $/MWh")?;
                }
                writer.flush()?;
            }
        }
        TsCommands::Patterns { data, carrier, out } => {
            let study = load_study(data, config)?;
            let patterns = production_patterns(&study.network, study.series()?, carrier.as_deref());
            if let Some(path) = out {
                write_csv(path, &patterns)?;
                println!("{} row(s) written to {}", patterns.len(), path.display());
            } else {
                let mut writer = TabWriter::new(io::stdout());
                writeln!(writer, "SNAPSHOT\tHOUR\tMONTH\tWEEKDAY\tVALUE")?;
                for row in &patterns {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}\t{:.3}",
                        row.snapshot, row.hour, row.month, row.weekday, row.value
                    )?;
                }
                writer.flush()?;
            }
        }
        TsCommands::Check { data } => {
            let study = load_study(data, config)?;
            let series = study.series()?;
            println!("Snapshots:  {}", series.snapshots().len());
            println!("Resolution: {}", format_resolution(time_resolution(series)));
            if !check_temporal_consistency(series) {
                bail!("time series tables do not cover the same snapshots");
            }
            println!("Time series are consistent");
        }
    }
    Ok(())
}
