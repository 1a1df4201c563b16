//! Great-circle distances and line lengths.

use std::collections::HashMap;

use hq_core::{BusId, GeoPoint, Kilometers, Network};
use tracing::{debug, warn};

/// Mean Earth radius (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in decimal degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    distance_km(a.lat, a.lon, b.lat, b.lon)
}

/// Length of a polyline through `points`.
pub fn path_length_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(&w[0], &w[1])).sum()
}

/// Distance rounded to the nearest kilometre, as used for line records.
pub fn rounded_length_km(a: &GeoPoint, b: &GeoPoint) -> i64 {
    Kilometers(haversine_km(a, b)).rounded()
}

/// Give every line without a length the distance between its buses, then
/// re-derive impedances from the line types. Returns the number of lines
/// whose length was filled.
pub fn fill_line_lengths(network: &mut Network) -> usize {
    let coordinates: HashMap<BusId, GeoPoint> = network
        .buses()
        .into_iter()
        .filter(|b| b.has_coordinates())
        .map(|b| (b.id, GeoPoint::new(b.name.clone(), b.y, b.x)))
        .collect();

    let mut filled = 0;
    for line in network.lines_mut() {
        if line.length.value() > 0.0 {
            continue;
        }
        match (coordinates.get(&line.bus0), coordinates.get(&line.bus1)) {
            (Some(a), Some(b)) => {
                line.length = Kilometers(haversine_km(a, b));
                filled += 1;
            }
            _ => warn!(line = %line.name, "no coordinates for both ends, length left at 0"),
        }
    }

    if filled > 0 {
        let unknown = network.apply_line_types();
        for name in unknown {
            warn!(line = %name, "line type not found, impedance unchanged");
        }
    }
    debug!(filled, "line lengths computed from bus coordinates");
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::{Bus, Line, LineId, LineType};

    fn montreal() -> GeoPoint {
        GeoPoint::new("Montréal", 45.5017, -73.5673)
    }

    fn quebec() -> GeoPoint {
        GeoPoint::new("Québec", 46.8139, -71.2080)
    }

    #[test]
    fn montreal_to_quebec_is_about_233_km() {
        let d = haversine_km(&montreal(), &quebec());
        assert!((d - 233.0).abs() < 1.0, "got {d}");
        assert_eq!(rounded_length_km(&montreal(), &quebec()), 233);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let (a, b) = (montreal(), quebec());
        assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
        assert_eq!(haversine_km(&a, &a), 0.0);
    }

    #[test]
    fn path_length_sums_segments() {
        let mid = GeoPoint::new("Trois-Rivières", 46.3432, -72.5477);
        let points = [montreal(), mid.clone(), quebec()];
        let expected = haversine_km(&montreal(), &mid) + haversine_km(&mid, &quebec());
        assert!((path_length_km(&points) - expected).abs() < 1e-9);
        assert!(path_length_km(&points) >= haversine_km(&montreal(), &quebec()));
        assert_eq!(path_length_km(&points[..1]), 0.0);
    }

    #[test]
    fn fills_missing_lengths_and_impedances() {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(0), "Montreal").at(-73.5673, 45.5017));
        net.add_bus(Bus::new(BusId::new(1), "Quebec").at(-71.2080, 46.8139));
        net.line_types.insert(
            "735kV_line".into(),
            LineType {
                name: "735kV_line".into(),
                f_nom: 60.0,
                r_per_length: 0.01,
                x_per_length: 0.3,
                c_per_length: 13.0,
                b_per_length: None,
                i_nom: 3.0,
            },
        );
        let mut line = Line::new(LineId::new(0), "L0001", BusId::new(0), BusId::new(1));
        line.line_type = Some("735kV_line".into());
        net.add_line(line).unwrap();

        assert_eq!(fill_line_lengths(&mut net), 1);
        let line = &net.lines()[0];
        assert!((line.length.value() - 233.0).abs() < 1.0);
        assert!((line.x_ohm - 0.3 * line.length.value()).abs() < 1e-9);

        // nothing left to fill
        assert_eq!(fill_line_lengths(&mut net), 0);
    }
}
