//! `inspect` and `validate`: what was loaded and whether it can be studied.

use anyhow::{bail, Result};
use hq_algo::NetworkSummary;
use hq_cli::{DataArgs, HqConfig, OutputFormat};
use hq_io::validate_network;
use tracing::info;

use crate::commands::util::{load_study, print_json};

pub fn handle_inspect(data: &DataArgs, format: OutputFormat, config: &HqConfig) -> Result<()> {
    let study = load_study(data, config)?;
    let summary = NetworkSummary::new(&study.network, study.series.as_ref());
    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Plain => {
            println!("Network Summary");
            println!("===============");
            print!("{summary}");
            println!();
            println!("Import: {}", study.diagnostics.summary());
            Ok(())
        }
    }
}

pub fn handle_validate(data: &DataArgs, config: &HqConfig) -> Result<()> {
    let study = load_study(data, config)?;
    let mut diagnostics = validate_network(&study.network, study.series.as_ref());
    diagnostics.merge(study.diagnostics.issues.iter().cloned());

    print!("{diagnostics}");
    if diagnostics.has_errors() {
        bail!("validation failed: {}", diagnostics.summary());
    }
    info!("validation successful");
    println!("Network is valid");
    Ok(())
}
