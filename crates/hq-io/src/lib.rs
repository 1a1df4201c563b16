//! # hq-io: grid data loading and preparation
//!
//! Reads the Hydro-Québec study data into an [`hq_core::Network`] and
//! prepares raw transmission-line records for it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hq_io::NetworkDataLoader;
//!
//! fn main() -> anyhow::Result<()> {
//!     let loader = NetworkDataLoader::new("data")?;
//!     let (import, series) = loader.load_study("2024", Some("2024-01-01"), Some("2024-01-31"))?;
//!
//!     println!("{}", import.network.stats());
//!     println!("{} snapshots", series.snapshots().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Inputs
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | CSV data directory | [`loader`] | buses, lines, line types, carriers, generators, loads |
//! | JSON network document | [`json`] | same field names as the CSV tables |
//! | Snapshot CSVs | [`timeseries`] | loads p_set, marginal cost, availability |
//! | Raw line records | [`lines_filter`] | 20-column transmission line table |
//! | Nominatim | [`geocode`] | behind the `geocoding` feature |
//! | Region GeoJSON | [`regions`] | MRC polygons and names |
//!
//! ## Error Handling
//!
//! Whole-file problems (missing files, malformed CSV) return
//! [`DataLoadError`]. Row-level problems (unknown bus, duplicate name,
//! defaulted values) are collected in [`hq_core::ImportDiagnostics`] and the
//! row is skipped or defaulted.

pub mod builder;
pub mod error;
pub mod export;
pub mod geocode;
pub mod json;
pub mod lines_filter;
pub mod loader;
pub mod records;
pub mod regions;
pub mod timeseries;
pub mod validate;

use hq_core::{ImportDiagnostics, Network};

pub use builder::{AddResult, NetworkBuilder};
pub use error::DataLoadError;
pub use export::write_csv;
pub use geocode::{geolocate_nodes, GeocodeSummary, Geocoder};
#[cfg(feature = "geocoding")]
pub use geocode::NominatimGeocoder;
pub use json::load_network_json;
pub use lines_filter::{NodeStats, NodeUsage, RawLineRecord};
pub use loader::{attach_series_loads, NetworkDataLoader};
pub use records::{
    BusRecord, CarrierRecord, GeneratorRecord, LineRecord, LineTypeRecord, LoadRecord,
};
pub use regions::{load_region_names, load_regions_geojson};
pub use validate::validate_network;

/// A network together with what happened while reading it.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub network: Network,
    pub diagnostics: ImportDiagnostics,
}

impl ImportResult {
    pub fn into_network(self) -> Network {
        self.network
    }
}
