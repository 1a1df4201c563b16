use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hq_algo::{PowerFlowAnalyzer, PowerFlowMode};
use hq_cli::{DataArgs, HqConfig};
use hq_io::write_csv;
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::util::{load_study, parse_snapshot};

pub struct PfOptions<'a> {
    pub mode: PowerFlowMode,
    pub snapshot: Option<&'a str>,
    pub threshold: Option<f64>,
    pub enforce_q_limits: bool,
    pub out: Option<&'a Path>,
}

pub fn handle(data: &DataArgs, options: PfOptions<'_>, config: &HqConfig) -> Result<()> {
    let study = load_study(data, config)?;
    let settings = config
        .power_flow
        .settings()
        .with_q_limit_enforcement(options.enforce_q_limits);
    let threshold = options
        .threshold
        .unwrap_or(config.power_flow.critical_threshold);
    let snapshot = options.snapshot.map(parse_snapshot).transpose()?;

    let mut analyzer = PowerFlowAnalyzer::new(&study.network).with_settings(settings);
    if let Some(series) = &study.series {
        analyzer = analyzer.with_time_series(series);
    }
    let converged = analyzer
        .try_run(snapshot, Some(options.mode))
        .with_context(|| format!("running {} power flow", options.mode))?;

    eprintln!(
        "{} power flow: {} snapshot(s), {}",
        options.mode.to_string().to_uppercase(),
        analyzer.results().len(),
        if converged { "converged" } else { "NOT converged" }
    );

    let loading = analyzer.get_line_loading()?;
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "LINE\tFROM\tTO\tTYPE\tS_NOM (MVA)\tFLOW (MW)\tLOADING (%)\tREMAINING (MW)")?;
    for row in &loading {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.0}\t{:.1}\t{:.1}\t{:.1}",
            row.line,
            row.bus0,
            row.bus1,
            row.line_type.as_deref().unwrap_or("-"),
            row.s_nom,
            row.power_flow_mw,
            row.loading_percent,
            row.remaining_capacity_mw
        )?;
    }
    writer.flush()?;

    let critical = analyzer.get_critical_lines(threshold)?;
    println!();
    if critical.is_empty() {
        println!("No line loaded above {threshold:.0}%");
    } else {
        println!("Critical lines (> {threshold:.0}%):");
        let mut writer = TabWriter::new(io::stdout());
        for line in &critical {
            writeln!(
                writer,
                "  {}\t{} -> {}\t{:.1}%\t{:.1} MW",
                line.line, line.from_bus, line.to_bus, line.loading, line.power_flow
            )?;
        }
        writer.flush()?;
    }

    let losses = analyzer.analyze_network_losses()?;
    println!();
    println!(
        "Losses: {:.2} MW ({:.2}% of generation)",
        losses.total_losses_mw, losses.losses_percent
    );
    for (line_type, mw) in &losses.losses_by_type {
        println!("  {line_type:<20} {mw:>10.2} MW");
    }

    if let Some(profile) = analyzer.get_voltage_profile()? {
        println!();
        let mut writer = TabWriter::new(io::stdout());
        writeln!(writer, "BUS\tV (pu)\tV MIN\tV MAX\tANGLE (deg)")?;
        for row in &profile {
            writeln!(
                writer,
                "{}\t{:.4}\t{:.4}\t{:.4}\t{:.2}",
                row.bus, row.voltage_pu, row.voltage_min, row.voltage_max, row.angle_deg
            )?;
        }
        writer.flush()?;
    }

    if let Some(path) = options.out {
        write_csv(path, &loading)
            .with_context(|| format!("writing line loading to {}", path.display()))?;
        info!(out = %path.display(), rows = loading.len(), "line loading written");
    }
    Ok(())
}
