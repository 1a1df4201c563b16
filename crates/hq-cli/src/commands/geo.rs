use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hq_algo::{distance_km, join_nodes, rounded_length_km, NodeRole};
use hq_cli::GeoCommands;
use hq_core::GeoPoint;
use hq_io::lines_filter::{read_nodes, GeolocatedLineRecord};
use hq_io::loader::read_table;
use hq_io::{load_region_names, load_regions_geojson, write_csv};
use serde::Serialize;
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
struct LineLength {
    line_id: String,
    circuit_id: String,
    from: String,
    to: String,
    length_km: Option<i64>,
}

#[derive(Debug, Serialize)]
struct NodeRegion {
    node_name: String,
    latitude: f64,
    longitude: f64,
    used_as_start: bool,
    used_as_end: bool,
    region_id: Option<String>,
    region_name: Option<String>,
}

pub fn handle(command: &GeoCommands) -> Result<()> {
    match command {
        GeoCommands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            println!("{:.2} km", distance_km(*lat1, *lon1, *lat2, *lon2));
            Ok(())
        }
        GeoCommands::Lengths { input, out } => lengths(input, out.as_deref()),
        GeoCommands::Regions {
            nodes,
            regions,
            names,
            out,
        } => regions_for_nodes(nodes, regions, names.as_deref(), out.as_deref()),
    }
}

fn endpoint(name: &str, lat: Option<f64>, lon: Option<f64>) -> Option<GeoPoint> {
    Some(GeoPoint::new(name, lat?, lon?))
}

fn lengths(input: &Path, out: Option<&Path>) -> Result<()> {
    let records: Vec<GeolocatedLineRecord> =
        read_table(input).with_context(|| format!("reading {}", input.display()))?;

    let rows: Vec<LineLength> = records
        .iter()
        .map(|r| {
            let from = endpoint(
                &r.network_node_name_starting,
                r.latitude_starting,
                r.longitude_starting,
            );
            let to = endpoint(
                &r.network_node_name_ending,
                r.latitude_ending,
                r.longitude_ending,
            );
            LineLength {
                line_id: r.transmission_line_id.clone(),
                circuit_id: r.transmission_circuit_id.clone(),
                from: r.network_node_name_starting.clone(),
                to: r.network_node_name_ending.clone(),
                length_km: from.zip(to).map(|(a, b)| rounded_length_km(&a, &b)),
            }
        })
        .collect();

    if let Some(path) = out {
        write_csv(path, &rows)?;
        let measured = rows.iter().filter(|r| r.length_km.is_some()).count();
        println!(
            "{measured}/{} line(s) measured, written to {}",
            rows.len(),
            path.display()
        );
        return Ok(());
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "LINE\tCIRCUIT\tFROM\tTO\tLENGTH (km)")?;
    for row in &rows {
        let length = row
            .length_km
            .map(|km| km.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{length}",
            row.line_id, row.circuit_id, row.from, row.to
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn regions_for_nodes(
    nodes: &Path,
    regions: &Path,
    names: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    let nodes = read_nodes(nodes)?;
    let located: Vec<(GeoPoint, NodeRole)> = nodes
        .iter()
        .filter_map(|n| {
            let (lat, lon) = n.coordinates()?;
            Some((
                GeoPoint::new(n.node_name.clone(), lat, lon),
                NodeRole::new(n.used_as_start, n.used_as_end),
            ))
        })
        .collect();
    let skipped = nodes.len() - located.len();
    let roles: HashMap<&str, NodeRole> = located
        .iter()
        .map(|(p, role)| (p.name.as_str(), *role))
        .collect();

    let regions = load_regions_geojson(regions)?;
    let names = names.map(load_region_names).transpose()?;
    let join = join_nodes(&located, &regions, names.as_ref());

    println!(
        "{} node(s) in {} of {} region(s), {} outside every region, {} without coordinates",
        join.summary.num_mapped,
        join.summary.num_regions_used,
        join.summary.num_regions,
        join.summary.num_unmapped,
        skipped
    );
    println!();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "REGION\tNAME\tNODES\tSTART\tEND\tBOTH")?;
    for region in &join.by_region {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            region.id,
            region.name.as_deref().unwrap_or("-"),
            region.points.len(),
            region.roles.start,
            region.roles.end,
            region.roles.both
        )?;
    }
    writer.flush()?;

    if !join.unmatched.is_empty() {
        println!();
        println!("Outside every region:");
        for point in &join.unmatched {
            println!("  {} ({:.4}, {:.4})", point.name, point.lat, point.lon);
        }
    }

    if let Some(path) = out {
        let row = |p: &GeoPoint, region_id: Option<&str>, region_name: Option<&str>| {
            let role = roles.get(p.name.as_str()).copied().unwrap_or_default();
            NodeRegion {
                node_name: p.name.clone(),
                latitude: p.lat,
                longitude: p.lon,
                used_as_start: role.start,
                used_as_end: role.end,
                region_id: region_id.map(str::to_string),
                region_name: region_name.map(str::to_string),
            }
        };
        let mut rows = Vec::with_capacity(join.summary.num_points);
        for region in &join.by_region {
            for p in &region.points {
                rows.push(row(p, Some(&region.id), region.name.as_deref()));
            }
        }
        rows.extend(join.unmatched.iter().map(|p| row(p, None, None)));
        write_csv(path, &rows)?;
    }
    Ok(())
}
