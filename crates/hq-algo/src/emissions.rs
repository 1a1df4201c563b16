//! Yearly CO₂ attributed to transport and distribution.
//!
//! Each energy type carries a yearly emission figure (kg). A share of it is
//! attributed to the transport grid and spread over its total length, or
//! attributed to distribution and spread over the energy delivered.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;

pub const DEFAULT_TRANSPORT_SHARE: f64 = 0.08;
/// Total length of the Québec transport network (km).
pub const DEFAULT_TRANSPORT_LENGTH_KM: f64 = 11_422.0;
pub const DEFAULT_DISTRIBUTION_SHARE: f64 = 0.05;
/// Energy distributed in Québec per year (kWh).
pub const DEFAULT_DISTRIBUTED_KWH: f64 = 23_000.0;

/// Yearly CO₂ emissions per energy type (kg).
pub static ENERGY_CO2_KG: Lazy<BTreeMap<&'static str, f64>> = Lazy::new(|| {
    BTreeMap::from([
        ("hydroelectricity_river", 5_000.0),
        ("hydroelectricity_reservoir", 5_000.0),
        ("solar", 500.0),
        ("wind", 500.0),
        ("fossil_fuel", 50_000.0),
    ])
});

/// Energy type of a network carrier, if it has one.
pub fn energy_type_for_carrier(carrier: &str) -> Option<&'static str> {
    match carrier {
        "hydro_fil" => Some("hydroelectricity_river"),
        "hydro_reservoir" => Some("hydroelectricity_reservoir"),
        "solaire" => Some("solar"),
        "eolien" => Some("wind"),
        "thermique" => Some("fossil_fuel"),
        _ => None,
    }
}

/// Unknown energy types contribute nothing.
fn attributed<S: AsRef<str>>(energy_types: &[S], share: f64, denominator: f64) -> f64 {
    energy_types
        .iter()
        .map(|t| ENERGY_CO2_KG.get(t.as_ref()).copied().unwrap_or(0.0) * share / denominator)
        .sum()
}

/// kg CO₂ per km of transport line per year.
pub fn transport_emissions<S: AsRef<str>>(energy_types: &[S], share: f64, length_km: f64) -> f64 {
    attributed(energy_types, share, length_km)
}

/// kg CO₂ per distributed kWh per year.
pub fn distribution_emissions<S: AsRef<str>>(energy_types: &[S], share: f64, kwh: f64) -> f64 {
    attributed(energy_types, share, kwh)
}

#[derive(Debug, Clone, Serialize)]
pub struct EmissionsReport {
    pub energy_types: Vec<String>,
    pub transport_kg_per_km: f64,
    pub distribution_kg_per_kwh: f64,
}

impl EmissionsReport {
    /// Both figures with the default shares and totals.
    pub fn with_defaults<S: AsRef<str>>(energy_types: &[S]) -> Self {
        Self {
            energy_types: energy_types.iter().map(|t| t.as_ref().to_string()).collect(),
            transport_kg_per_km: transport_emissions(
                energy_types,
                DEFAULT_TRANSPORT_SHARE,
                DEFAULT_TRANSPORT_LENGTH_KM,
            ),
            distribution_kg_per_kwh: distribution_emissions(
                energy_types,
                DEFAULT_DISTRIBUTION_SHARE,
                DEFAULT_DISTRIBUTED_KWH,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> Vec<&'static str> {
        ENERGY_CO2_KG.keys().copied().collect()
    }

    #[test]
    fn default_figures_for_all_types() {
        // 61 000 kg in total
        let report = EmissionsReport::with_defaults(&all_types());
        assert!((report.transport_kg_per_km - 61_000.0 * 0.08 / 11_422.0).abs() < 1e-12);
        assert!((report.distribution_kg_per_kwh - 61_000.0 * 0.05 / 23_000.0).abs() < 1e-12);
        assert_eq!(format!("{:.2}", report.transport_kg_per_km), "0.43");
        assert_eq!(format!("{:.2}", report.distribution_kg_per_kwh), "0.13");
    }

    #[test]
    fn unknown_types_count_as_zero() {
        assert_eq!(transport_emissions(&["nuclear"], 0.08, 11_422.0), 0.0);
        let wind = distribution_emissions(&["wind", "nuclear"], 0.05, 23_000.0);
        assert!((wind - 500.0 * 0.05 / 23_000.0).abs() < 1e-12);
    }

    #[test]
    fn carriers_map_to_energy_types() {
        assert_eq!(energy_type_for_carrier("eolien"), Some("wind"));
        assert_eq!(energy_type_for_carrier("thermique"), Some("fossil_fuel"));
        assert_eq!(energy_type_for_carrier("batterie"), None);
    }
}
