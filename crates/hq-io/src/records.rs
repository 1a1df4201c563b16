//! Row schemas of the static network tables.
//!
//! The same records back the CSV directory layout and the JSON document
//! format. Every table is keyed by its `name` column; optional columns
//! fall back to the defaults of the corresponding `hq_core` element.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusRecord {
    pub name: String,
    #[serde(default)]
    pub v_nom: Option<f64>,
    /// Longitude
    #[serde(default)]
    pub x: Option<f64>,
    /// Latitude
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub v_mag_pu_set: Option<f64>,
    #[serde(default)]
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineTypeRecord {
    pub name: String,
    #[serde(default)]
    pub f_nom: Option<f64>,
    #[serde(default)]
    pub r_per_length: f64,
    #[serde(default)]
    pub x_per_length: f64,
    #[serde(default)]
    pub c_per_length: Option<f64>,
    #[serde(default)]
    pub b_per_length: Option<f64>,
    #[serde(default)]
    pub i_nom: Option<f64>,
}

/// One row of `lines.csv`. Also the output schema of the line extraction step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(rename = "type", default)]
    pub line_type: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub s_nom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_parallel: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarrierRecord {
    pub name: String,
    #[serde(default)]
    pub co2_emissions: Option<f64>,
    #[serde(default)]
    pub nice_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRecord {
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub carrier: Option<String>,
    /// `pilotable` / `non_pilotable`; derived from the carrier when absent
    #[serde(default, rename = "type")]
    pub dispatchability: Option<String>,
    #[serde(default)]
    pub control: Option<String>,
    #[serde(default)]
    pub p_nom: Option<f64>,
    #[serde(default)]
    pub p_min_pu: Option<f64>,
    #[serde(default)]
    pub p_max_pu: Option<f64>,
    #[serde(default)]
    pub p_set: Option<f64>,
    #[serde(default)]
    pub q_set: Option<f64>,
    #[serde(default)]
    pub q_min: Option<f64>,
    #[serde(default)]
    pub q_max: Option<f64>,
    #[serde(default)]
    pub marginal_cost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadRecord {
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub p_set: Option<f64>,
    #[serde(default)]
    pub q_set: Option<f64>,
}
