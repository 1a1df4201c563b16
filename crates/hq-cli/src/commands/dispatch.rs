use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use hq_algo::{check_feasibility, DispatchMethod, Dispatcher};
use hq_cli::{DataArgs, HqConfig};
use tabwriter::TabWriter;

use crate::commands::util::load_study;

pub fn handle(data: &DataArgs, method: DispatchMethod, check: bool, config: &HqConfig) -> Result<()> {
    let study = load_study(data, config)?;

    let (feasible, message) = check_feasibility(&study.network, study.series.as_ref());
    println!("Feasibility: {message}");
    if check {
        if !feasible {
            bail!("dispatch is infeasible");
        }
        return Ok(());
    }

    let dispatcher = Dispatcher {
        method,
        base_mva: config.power_flow.base_mva,
    };
    let result = dispatcher
        .run(&study.network, study.series.as_ref())
        .with_context(|| format!("{method} dispatch"))?;

    eprintln!(
        "{} dispatch: {} snapshot(s)",
        method,
        result.snapshots.len()
    );

    let balance = result.energy_balance();
    println!();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CARRIER\tENERGY (MWh)\tSHARE (%)")?;
    for (carrier, mwh) in &balance.generation_by_type {
        let share = if balance.total_generation > 0.0 {
            mwh / balance.total_generation * 100.0
        } else {
            0.0
        };
        writeln!(writer, "{carrier}\t{mwh:.1}\t{share:.1}")?;
    }
    writer.flush()?;

    println!();
    println!("Total generation: {:.1} MWh", balance.total_generation);
    println!("Total load:       {:.1} MWh", balance.total_load);
    println!("Total cost:       {:.2} $", result.total_cost());
    Ok(())
}
