//! Static network as a single JSON document.
//!
//! ```json
//! {
//!   "buses": [{"name": "Montreal", "v_nom": 735, "x": -73.57, "y": 45.50}],
//!   "lines": [{"name": "L0001", "bus0": "Montreal", "bus1": "Quebec", "type": "735kV_line"}],
//!   "generators": [{"name": "Beauharnois", "bus": "Montreal", "control": "Slack"}]
//! }
//! ```
//!
//! Every array is optional; field names match the CSV tables.

use std::fs;
use std::path::Path;

use hq_core::ImportDiagnostics;
use serde::Deserialize;
use tracing::info;

use crate::builder::NetworkBuilder;
use crate::records::{
    BusRecord, CarrierRecord, GeneratorRecord, LineRecord, LineTypeRecord, LoadRecord,
};
use crate::{DataLoadError, ImportResult};

#[derive(Debug, Default, Deserialize)]
struct NetworkDocument {
    #[serde(default)]
    buses: Vec<BusRecord>,
    #[serde(default)]
    line_types: Vec<LineTypeRecord>,
    #[serde(default)]
    lines: Vec<LineRecord>,
    #[serde(default)]
    carriers: Vec<CarrierRecord>,
    #[serde(default)]
    generators: Vec<GeneratorRecord>,
    #[serde(default)]
    loads: Vec<LoadRecord>,
}

pub fn load_network_json(path: &Path) -> Result<ImportResult, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    parse_network_json(&text).map_err(|source| DataLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a network document from a string.
pub fn parse_network_json(text: &str) -> Result<ImportResult, serde_json::Error> {
    let doc: NetworkDocument = serde_json::from_str(text)?;

    let mut diagnostics = ImportDiagnostics::new();
    let mut builder = NetworkBuilder::with_diagnostics(&mut diagnostics);
    for record in doc.buses {
        builder.add_bus(record);
    }
    for record in doc.line_types {
        builder.add_line_type(record);
    }
    for record in doc.lines {
        builder.add_line(record);
    }
    for record in doc.carriers {
        builder.add_carrier(record);
    }
    for record in doc.generators {
        builder.add_generator(record);
    }
    for record in doc.loads {
        builder.add_load(record);
    }
    let network = builder.build();
    info!(summary = %diagnostics.summary(), "parsed network document");
    Ok(ImportResult {
        network,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let text = r#"{
            "buses": [
                {"name": "Montreal", "v_nom": 735, "x": -73.5673, "y": 45.5017},
                {"name": "Quebec", "x": -71.2080, "y": 46.8139}
            ],
            "lines": [{"name": "L0001", "bus0": "Montreal", "bus1": "Quebec", "x": 40.0, "s_nom": 2000}],
            "generators": [{"name": "Beauharnois", "bus": "Montreal", "control": "Slack", "p_nom": 1900}],
            "loads": [{"name": "Quebec", "bus": "Quebec", "p_set": 800}]
        }"#;
        let result = parse_network_json(text).unwrap();
        let stats = result.network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_slack, 1);
        assert_eq!(stats.total_load_mw, 800.0);
        assert_eq!(result.diagnostics.stats.buses, 2);
    }

    #[test]
    fn unknown_bus_is_skipped_not_fatal() {
        let text = r#"{
            "buses": [{"name": "A"}],
            "loads": [{"name": "X", "bus": "Nowhere", "p_set": 5}]
        }"#;
        let result = parse_network_json(text).unwrap();
        assert_eq!(result.network.loads().len(), 0);
        assert!(result.diagnostics.stats.skipped_rows >= 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_network_json("{\"buses\": 3}").is_err());
    }
}
