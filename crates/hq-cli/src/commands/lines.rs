//! `lines`: the raw transmission-line table pipeline.

use std::io::{self, Write};

use anyhow::{Context, Result};
use hq_cli::{HqConfig, LinesCommands};
use hq_io::lines_filter::{
    add_coordinates_to_lines, extract_lines, fill_missing_coordinates, filter_quebec_lines,
    lines_by_voltage, read_nodes, read_raw_lines, unique_nodes,
};
use hq_io::write_csv;
use tabwriter::TabWriter;

pub fn handle(command: &LinesCommands, config: &HqConfig) -> Result<()> {
    match command {
        LinesCommands::Filter { input, out } => {
            let kept = filter_quebec_lines(input, out)
                .with_context(|| format!("filtering {}", input.display()))?;
            println!("Kept {kept} Québec line(s) in {}", out.display());
        }
        LinesCommands::Nodes { input, out } => {
            let records = read_raw_lines(input)?;
            let (nodes, stats) = unique_nodes(&records);
            write_csv(out, &nodes)?;
            println!("{stats}");
            println!("Written to {}", out.display());
        }
        LinesCommands::Geocode {
            input,
            out,
            base_url,
            delay_ms,
        } => geocode(input, out, base_url.as_deref(), *delay_ms, config)?,
        LinesCommands::Fill { input, out } => {
            let mut nodes = read_nodes(input)?;
            let filled = fill_missing_coordinates(&mut nodes);
            let missing = nodes.iter().filter(|n| n.coordinates().is_none()).count();
            write_csv(out, &nodes)?;
            println!("Filled {filled} node(s), {missing} still without coordinates");
        }
        LinesCommands::Attach { lines, nodes, out } => {
            let records = read_raw_lines(lines)?;
            let nodes = read_nodes(nodes)?;
            let located = add_coordinates_to_lines(&records, &nodes);
            let complete = located
                .iter()
                .filter(|l| l.latitude_starting.is_some() && l.latitude_ending.is_some())
                .count();
            write_csv(out, &located)?;
            println!(
                "{complete}/{} line(s) located at both ends, written to {}",
                located.len(),
                out.display()
            );
        }
        LinesCommands::Extract { input, out } => {
            let records = read_raw_lines(input)?;
            let lines = extract_lines(&records);
            write_csv(out, &lines)?;
            println!("Extracted {} line(s) to {}", lines.len(), out.display());
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "TYPE\tLINES")?;
            for (line_type, count) in lines_by_voltage(&records) {
                writeln!(writer, "{line_type}\t{count}")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(feature = "geocoding")]
fn geocode(
    input: &std::path::Path,
    out: &std::path::Path,
    base_url: Option<&str>,
    delay_ms: Option<u64>,
    config: &HqConfig,
) -> Result<()> {
    use hq_io::{geolocate_nodes, NominatimGeocoder};

    let mut nodes = read_nodes(input)?;
    let delay = delay_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.geocoder.delay());
    let geocoder = NominatimGeocoder::new()
        .with_base_url(base_url.unwrap_or(&config.geocoder.base_url))
        .with_user_agent(config.geocoder.user_agent.clone())
        .with_delay(delay);
    let summary = geolocate_nodes(&mut nodes, &geocoder);
    write_csv(out, &nodes)?;
    println!("{summary}");
    Ok(())
}

#[cfg(not(feature = "geocoding"))]
fn geocode(
    _input: &std::path::Path,
    _out: &std::path::Path,
    _base_url: Option<&str>,
    _delay_ms: Option<u64>,
    _config: &HqConfig,
) -> Result<()> {
    anyhow::bail!("hq-cli was built without the `geocoding` feature")
}
