//! Preparation of the raw transmission-line table.
//!
//! The raw table describes every Canadian transmission segment in 20 text
//! columns. The pipeline keeps the Québec rows, lists the substations they
//! connect, geolocates those, and finally derives the `lines.csv` table
//! read by [`crate::loader`]:
//!
//! ```text
//! raw lines --filter--> QC lines --nodes--> unique nodes --geocode--> located
//!                          |                                  |
//!                          |                                fill
//!                          +------------ attach <-------------+
//!                          +------------ extract --> lines.csv
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::export::write_csv;
use crate::records::LineRecord;
use crate::DataLoadError;

/// One row of the raw transmission-line table. Every column is kept as
/// text; numeric accessors parse on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLineRecord {
    pub transmission_line_id: String,
    pub transmission_circuit_id: String,
    pub owner: String,
    pub province: String,
    pub operating_region: String,
    pub number_of_circuits: String,
    pub current_type: String,
    pub line_segment_length_km: String,
    pub line_segment_length_mi: String,
    pub line_length_km: String,
    pub line_length_mi: String,
    pub voltage: String,
    pub reactance: String,
    pub ttc_summer: String,
    pub ttc_winter: String,
    pub network_node_name_starting: String,
    pub network_node_code_starting: String,
    pub network_node_name_ending: String,
    pub network_node_code_ending: String,
    pub notes: String,
}

fn strip_quotes(value: &mut String) {
    let trimmed = value.trim().trim_matches('"').trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl RawLineRecord {
    /// Remove stray double quotes left by spreadsheet exports.
    pub fn clean(mut self) -> Self {
        for field in [
            &mut self.transmission_line_id,
            &mut self.transmission_circuit_id,
            &mut self.owner,
            &mut self.province,
            &mut self.operating_region,
            &mut self.number_of_circuits,
            &mut self.current_type,
            &mut self.line_segment_length_km,
            &mut self.line_segment_length_mi,
            &mut self.line_length_km,
            &mut self.line_length_mi,
            &mut self.voltage,
            &mut self.reactance,
            &mut self.ttc_summer,
            &mut self.ttc_winter,
            &mut self.network_node_name_starting,
            &mut self.network_node_code_starting,
            &mut self.network_node_name_ending,
            &mut self.network_node_code_ending,
            &mut self.notes,
        ] {
            strip_quotes(field);
        }
        self
    }

    pub fn is_quebec(&self) -> bool {
        self.province == "QC"
    }

    pub fn voltage_kv(&self) -> Option<f64> {
        parse_number(&self.voltage)
    }

    pub fn segment_length_km(&self) -> Option<f64> {
        parse_number(&self.line_segment_length_km)
    }

    /// Standard type name, e.g. `735kV_line`.
    pub fn line_type_name(&self) -> String {
        match self.voltage_kv() {
            Some(kv) => format!("{kv}kV_line"),
            None => format!("{}kV_line", self.voltage),
        }
    }
}

/// Read a raw line table (CSV with a header row). Columns are matched by
/// name; extra columns such as attached coordinates are ignored.
pub fn read_raw_lines(path: &Path) -> Result<Vec<RawLineRecord>, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataLoadError::csv(path, e))?;
    let headers = rdr.headers().map_err(|e| DataLoadError::csv(path, e))?;
    if !headers.iter().any(|h| h.trim_matches('"') == "province") {
        return Err(DataLoadError::schema(
            path,
            "raw line table has no 'province' column",
        ));
    }
    let mut records = Vec::new();
    for row in rdr.deserialize::<RawLineRecord>() {
        records.push(row.map_err(|e| DataLoadError::csv(path, e))?.clean());
    }
    Ok(records)
}

pub fn quebec_lines(records: &[RawLineRecord]) -> Vec<RawLineRecord> {
    records.iter().filter(|r| r.is_quebec()).cloned().collect()
}

/// Keep the Québec rows of `input` and write them to `output`.
pub fn filter_quebec_lines(input: &Path, output: &Path) -> Result<usize, DataLoadError> {
    let records = read_raw_lines(input)?;
    let kept = quebec_lines(&records);
    write_csv(output, &kept)?;
    info!(
        total = records.len(),
        kept = kept.len(),
        output = %output.display(),
        "filtered Québec lines"
    );
    Ok(kept.len())
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    ))
}

/// A substation named by the line table and how the table uses it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    pub node_name: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub used_as_start: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub used_as_end: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl NodeUsage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node_name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total_nodes: usize,
    pub starting_nodes: usize,
    pub ending_nodes: usize,
    pub both_nodes: usize,
}

impl fmt::Display for NodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes ({} start, {} end, {} both)",
            self.total_nodes, self.starting_nodes, self.ending_nodes, self.both_nodes
        )
    }
}

/// Every node name appearing as a start or end, sorted by name.
pub fn unique_nodes(records: &[RawLineRecord]) -> (Vec<NodeUsage>, NodeStats) {
    let starts: BTreeSet<&str> = records
        .iter()
        .map(|r| r.network_node_name_starting.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    let ends: BTreeSet<&str> = records
        .iter()
        .map(|r| r.network_node_name_ending.as_str())
        .filter(|n| !n.is_empty())
        .collect();

    let nodes: Vec<NodeUsage> = starts
        .union(&ends)
        .map(|name| NodeUsage {
            used_as_start: starts.contains(name),
            used_as_end: ends.contains(name),
            ..NodeUsage::new(*name)
        })
        .collect();

    let stats = NodeStats {
        total_nodes: nodes.len(),
        starting_nodes: nodes.iter().filter(|n| n.used_as_start).count(),
        ending_nodes: nodes.iter().filter(|n| n.used_as_end).count(),
        both_nodes: nodes
            .iter()
            .filter(|n| n.used_as_start && n.used_as_end)
            .count(),
    };
    (nodes, stats)
}

pub fn read_nodes(path: &Path) -> Result<Vec<NodeUsage>, DataLoadError> {
    crate::loader::read_table(path)
}

/// Give each node without coordinates the mean of the nearest located
/// rows before and after it. Rows are processed in order, so a filled row
/// serves as the previous neighbour of the next gap. Returns the number of
/// nodes filled; nodes at either end of the list stay empty.
pub fn fill_missing_coordinates(nodes: &mut [NodeUsage]) -> usize {
    let mut filled = 0;
    for i in 0..nodes.len() {
        if nodes[i].coordinates().is_some() {
            continue;
        }
        let prev = nodes[..i].iter().rev().find_map(NodeUsage::coordinates);
        let next = nodes[i + 1..].iter().find_map(NodeUsage::coordinates);
        if let (Some((lat0, lon0)), Some((lat1, lon1))) = (prev, next) {
            nodes[i].latitude = Some((lat0 + lat1) / 2.0);
            nodes[i].longitude = Some((lon0 + lon1) / 2.0);
            filled += 1;
        }
    }
    filled
}

/// Raw line row with the coordinates of both ends next to their names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeolocatedLineRecord {
    pub transmission_line_id: String,
    pub transmission_circuit_id: String,
    pub owner: String,
    pub province: String,
    pub operating_region: String,
    pub number_of_circuits: String,
    pub current_type: String,
    pub line_segment_length_km: String,
    pub line_segment_length_mi: String,
    pub line_length_km: String,
    pub line_length_mi: String,
    pub voltage: String,
    pub reactance: String,
    pub ttc_summer: String,
    pub ttc_winter: String,
    pub network_node_name_starting: String,
    pub latitude_starting: Option<f64>,
    pub longitude_starting: Option<f64>,
    pub network_node_code_starting: String,
    pub network_node_name_ending: String,
    pub latitude_ending: Option<f64>,
    pub longitude_ending: Option<f64>,
    pub network_node_code_ending: String,
    pub notes: String,
}

pub fn add_coordinates_to_lines(
    lines: &[RawLineRecord],
    nodes: &[NodeUsage],
) -> Vec<GeolocatedLineRecord> {
    let located: HashMap<&str, (Option<f64>, Option<f64>)> = nodes
        .iter()
        .map(|n| (n.node_name.as_str(), (n.latitude, n.longitude)))
        .collect();
    let lookup = |name: &str| located.get(name).copied().unwrap_or((None, None));

    lines
        .iter()
        .map(|r| {
            let (latitude_starting, longitude_starting) = lookup(&r.network_node_name_starting);
            let (latitude_ending, longitude_ending) = lookup(&r.network_node_name_ending);
            GeolocatedLineRecord {
                transmission_line_id: r.transmission_line_id.clone(),
                transmission_circuit_id: r.transmission_circuit_id.clone(),
                owner: r.owner.clone(),
                province: r.province.clone(),
                operating_region: r.operating_region.clone(),
                number_of_circuits: r.number_of_circuits.clone(),
                current_type: r.current_type.clone(),
                line_segment_length_km: r.line_segment_length_km.clone(),
                line_segment_length_mi: r.line_segment_length_mi.clone(),
                line_length_km: r.line_length_km.clone(),
                line_length_mi: r.line_length_mi.clone(),
                voltage: r.voltage.clone(),
                reactance: r.reactance.clone(),
                ttc_summer: r.ttc_summer.clone(),
                ttc_winter: r.ttc_winter.clone(),
                network_node_name_starting: r.network_node_name_starting.clone(),
                latitude_starting,
                longitude_starting,
                network_node_code_starting: r.network_node_code_starting.clone(),
                network_node_name_ending: r.network_node_name_ending.clone(),
                latitude_ending,
                longitude_ending,
                network_node_code_ending: r.network_node_code_ending.clone(),
                notes: r.notes.clone(),
            }
        })
        .collect()
}

/// Thermal rating assigned to extracted lines, alternating by row.
pub fn extracted_s_nom(index: usize) -> f64 {
    10_000.0 + (index % 2) as f64 * 10_000.0
}

/// Derive `lines.csv` rows from raw records.
pub fn extract_lines(records: &[RawLineRecord]) -> Vec<LineRecord> {
    records
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let length = r.segment_length_km();
            LineRecord {
                name: format!("L{:04}", index + 1),
                bus0: r.network_node_name_starting.clone(),
                bus1: r.network_node_name_ending.clone(),
                line_type: Some(r.line_type_name()),
                length,
                capital_cost: length.map(|km| km * 1000.0),
                s_nom: Some(extracted_s_nom(index)),
                ..LineRecord::default()
            }
        })
        .collect()
}

/// Count of raw rows per voltage level, for reporting.
pub fn lines_by_voltage(records: &[RawLineRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.line_type_name()).or_insert(0) += 1;
    }
    counts
}
