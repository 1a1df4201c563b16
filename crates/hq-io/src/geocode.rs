//! Substation geolocation.
//!
//! Lookups go through the [`Geocoder`] trait so the node pipeline can run
//! against any backend. [`NominatimGeocoder`] queries the public
//! OpenStreetMap service and is compiled with the `geocoding` feature.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::lines_filter::NodeUsage;
use crate::DataLoadError;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "PIV";
pub const DEFAULT_DELAY_MS: u64 = 250;

/// Resolve a free-text place query to `(lat, lon)`.
pub trait Geocoder {
    /// `Ok(None)` when the service knows no such place.
    fn locate(&self, query: &str) -> Result<Option<(f64, f64)>, DataLoadError>;
}

/// Query sent for a substation name.
pub fn node_query(node_name: &str) -> String {
    format!("{node_name}, Québec")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeocodeSummary {
    pub total: usize,
    pub located: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl GeocodeSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.located as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for GeocodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} nodes located ({:.2}%), {} not found, {} failed",
            self.located,
            self.total,
            self.success_rate(),
            self.not_found,
            self.failed
        )
    }
}

/// Geolocate every node in place. Coordinates are replaced by the lookup
/// result; a node that is not found or whose lookup fails ends up with
/// empty coordinates, never with stale ones.
pub fn geolocate_nodes(nodes: &mut [NodeUsage], geocoder: &dyn Geocoder) -> GeocodeSummary {
    let mut summary = GeocodeSummary {
        total: nodes.len(),
        ..GeocodeSummary::default()
    };
    info!(nodes = nodes.len(), "geolocating nodes");
    for node in nodes.iter_mut() {
        node.latitude = None;
        node.longitude = None;
        match geocoder.locate(&node_query(&node.node_name)) {
            Ok(Some((lat, lon))) => {
                debug!(node = %node.node_name, lat, lon, "located");
                node.latitude = Some(lat);
                node.longitude = Some(lon);
                summary.located += 1;
            }
            Ok(None) => {
                warn!(node = %node.node_name, "no geocoding result");
                summary.not_found += 1;
            }
            Err(err) => {
                warn!(node = %node.node_name, error = %err, "geocoding failed");
                summary.failed += 1;
            }
        }
    }
    info!(%summary, "geolocation finished");
    summary
}

#[cfg(feature = "geocoding")]
pub use nominatim::NominatimGeocoder;

#[cfg(feature = "geocoding")]
mod nominatim {
    use std::thread;
    use std::time::Duration;

    use serde::Deserialize;

    use super::{Geocoder, DEFAULT_DELAY_MS, DEFAULT_USER_AGENT, NOMINATIM_URL};
    use crate::DataLoadError;

    #[derive(Debug, Deserialize)]
    struct Place {
        lat: String,
        lon: String,
    }

    /// Nominatim search client. Sleeps `delay` after every request to stay
    /// within the service usage policy.
    #[derive(Debug, Clone)]
    pub struct NominatimGeocoder {
        pub base_url: String,
        pub user_agent: String,
        pub delay: Duration,
    }

    impl Default for NominatimGeocoder {
        fn default() -> Self {
            Self {
                base_url: NOMINATIM_URL.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                delay: Duration::from_millis(DEFAULT_DELAY_MS),
            }
        }
    }

    impl NominatimGeocoder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
            self.base_url = url.into();
            self
        }

        pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
            self.user_agent = agent.into();
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn search(&self, query: &str) -> Result<Option<(f64, f64)>, DataLoadError> {
            let response = ureq::get(&self.base_url)
                .set("User-Agent", &self.user_agent)
                .set("Accept", "application/json")
                .query("q", query)
                .query("format", "json")
                .query("limit", "1")
                .call()
                .map_err(|e| DataLoadError::Geocoding(format!("{query}: {e}")))?;

            if response.status() != 200 {
                return Err(DataLoadError::Geocoding(format!(
                    "{query}: status {}",
                    response.status()
                )));
            }

            let places: Vec<Place> = response
                .into_json()
                .map_err(|e| DataLoadError::Geocoding(format!("{query}: {e}")))?;
            let Some(place) = places.first() else {
                return Ok(None);
            };
            let lat = place.lat.parse::<f64>();
            let lon = place.lon.parse::<f64>();
            match (lat, lon) {
                (Ok(lat), Ok(lon)) => Ok(Some((lat, lon))),
                _ => Err(DataLoadError::Geocoding(format!(
                    "{query}: unparsable coordinates {}, {}",
                    place.lat, place.lon
                ))),
            }
        }
    }

    impl Geocoder for NominatimGeocoder {
        fn locate(&self, query: &str) -> Result<Option<(f64, f64)>, DataLoadError> {
            let result = self.search(query);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            result
        }
    }
}
