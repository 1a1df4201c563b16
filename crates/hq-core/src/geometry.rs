//! Geographic primitives shared by the loaders and the GIS joins.
//!
//! Coordinates are WGS84 decimal degrees. Rings are stored as
//! `(lon, lat)` pairs, the GeoJSON axis order.

use serde::{Deserialize, Serialize};

/// A named location, e.g. a geolocated substation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<(f64, f64)>,
    #[serde(default)]
    pub holes: Vec<Vec<(f64, f64)>>,
}

/// An administrative region (MRC) made of one or more polygons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

impl Region {
    /// Label for reports: the name when known, else the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.polygons.iter().flat_map(|p| p.exterior.iter());
        let first = points.next()?;
        let init = (first.0, first.1, first.0, first.1);
        Some(points.fold(init, |(x0, y0, x1, y1), (x, y)| {
            (x0.min(*x), y0.min(*y), x1.max(*x), y1.max(*y))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_polygons() {
        let region = Region {
            id: "66".into(),
            name: None,
            polygons: vec![
                Polygon {
                    exterior: vec![(-74.0, 45.0), (-73.0, 45.0), (-73.0, 46.0)],
                    holes: vec![],
                },
                Polygon {
                    exterior: vec![(-72.0, 44.5), (-71.5, 44.5), (-71.5, 45.0)],
                    holes: vec![],
                },
            ],
        };
        assert_eq!(region.bounds(), Some((-74.0, 44.5, -71.5, 46.0)));
        assert_eq!(region.label(), "66");
    }
}
