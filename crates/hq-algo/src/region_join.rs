//! Map geolocated nodes onto MRC region polygons.
//!
//! Point-in-polygon uses ray casting on `(lon, lat)` rings. A point inside
//! a hole is outside the polygon; a region matches when any of its
//! polygons contains the point. Each point is assigned to the first
//! matching region in input order.
//!
//! Substations carry the role they play in the line records (start, end or
//! both), and every region counts its nodes per role.

use std::collections::BTreeMap;

use hq_core::{GeoPoint, Polygon, Region};
use serde::Serialize;
use tracing::debug;

/// How a node is used by the line records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeRole {
    pub start: bool,
    pub end: bool,
}

impl NodeRole {
    pub fn new(start: bool, end: bool) -> Self {
        Self { start, end }
    }
}

/// Node counts per role. A node used at both ends counts in all three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub start: usize,
    pub end: usize,
    pub both: usize,
}

impl RoleCounts {
    fn add(&mut self, role: NodeRole) {
        self.start += usize::from(role.start);
        self.end += usize::from(role.end);
        self.both += usize::from(role.start && role.end);
    }
}

/// Points that fell inside one region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionPoints {
    pub id: String,
    pub name: Option<String>,
    pub points: Vec<GeoPoint>,
    pub roles: RoleCounts,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionJoinSummary {
    pub num_points: usize,
    pub num_regions: usize,
    pub num_mapped: usize,
    pub num_unmapped: usize,
    /// Regions holding at least one point.
    pub num_regions_used: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionJoin {
    /// Regions with at least one point, in input order.
    pub by_region: Vec<RegionPoints>,
    pub unmatched: Vec<GeoPoint>,
    pub summary: RegionJoinSummary,
}

impl RegionJoin {
    pub fn region(&self, id: &str) -> Option<&RegionPoints> {
        self.by_region.iter().find(|r| r.id == id)
    }
}

/// Even-odd ray casting against one ring.
fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn polygon_contains(polygon: &Polygon, lon: f64, lat: f64) -> bool {
    ring_contains(&polygon.exterior, lon, lat)
        && !polygon.holes.iter().any(|h| ring_contains(h, lon, lat))
}

pub fn region_contains(region: &Region, lon: f64, lat: f64) -> bool {
    match region.bounds() {
        Some((x0, y0, x1, y1)) if lon >= x0 && lon <= x1 && lat >= y0 && lat <= y1 => region
            .polygons
            .iter()
            .any(|p| polygon_contains(p, lon, lat)),
        _ => false,
    }
}

/// Index of the first region containing the point.
pub fn locate(point: &GeoPoint, regions: &[Region]) -> Option<usize> {
    regions
        .iter()
        .position(|r| region_contains(r, point.lon, point.lat))
}

/// Group `points` by the region containing them.
///
/// `names` maps region ids to display names and takes precedence over the
/// names carried by the regions themselves.
pub fn join_points(
    points: &[GeoPoint],
    regions: &[Region],
    names: Option<&BTreeMap<String, String>>,
) -> RegionJoin {
    join(points.iter().map(|p| (p, NodeRole::default())), regions, names)
}

/// Like [`join_points`], counting each region's nodes by role.
pub fn join_nodes(
    nodes: &[(GeoPoint, NodeRole)],
    regions: &[Region],
    names: Option<&BTreeMap<String, String>>,
) -> RegionJoin {
    join(nodes.iter().map(|(p, role)| (p, *role)), regions, names)
}

fn join<'a>(
    nodes: impl Iterator<Item = (&'a GeoPoint, NodeRole)>,
    regions: &[Region],
    names: Option<&BTreeMap<String, String>>,
) -> RegionJoin {
    let mut grouped: BTreeMap<usize, (Vec<GeoPoint>, RoleCounts)> = BTreeMap::new();
    let mut unmatched = Vec::new();
    let mut num_points = 0;
    for (point, role) in nodes {
        num_points += 1;
        match locate(point, regions) {
            Some(idx) => {
                let (points, roles) = grouped.entry(idx).or_default();
                points.push(point.clone());
                roles.add(role);
            }
            None => unmatched.push(point.clone()),
        }
    }

    let by_region: Vec<RegionPoints> = grouped
        .into_iter()
        .map(|(idx, (points, roles))| {
            let region = &regions[idx];
            let name = names
                .and_then(|n| n.get(&region.id).cloned())
                .or_else(|| region.name.clone());
            RegionPoints {
                id: region.id.clone(),
                name,
                points,
                roles,
            }
        })
        .collect();

    let summary = RegionJoinSummary {
        num_points,
        num_regions: regions.len(),
        num_mapped: num_points - unmatched.len(),
        num_unmapped: unmatched.len(),
        num_regions_used: by_region.len(),
    };
    debug!(
        mapped = summary.num_mapped,
        unmapped = summary.num_unmapped,
        "region join"
    );

    RegionJoin {
        by_region,
        unmatched,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<(f64, f64)> {
        vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
            (x0, y0),
        ]
    }

    fn regions() -> Vec<Region> {
        vec![
            Region {
                id: "66".into(),
                name: None,
                polygons: vec![Polygon {
                    exterior: square(-74.0, 45.0, 1.0),
                    holes: vec![square(-73.6, 45.4, 0.2)],
                }],
            },
            Region {
                id: "23".into(),
                name: Some("Québec".into()),
                polygons: vec![
                    Polygon {
                        exterior: square(-72.0, 46.5, 1.0),
                        holes: vec![],
                    },
                    Polygon {
                        exterior: square(-70.0, 48.0, 0.5),
                        holes: vec![],
                    },
                ],
            },
        ]
    }

    #[test]
    fn holes_are_outside() {
        let region = &regions()[0];
        assert!(region_contains(region, -73.9, 45.1));
        assert!(!region_contains(region, -73.5, 45.5));
        assert!(!region_contains(region, -75.0, 45.5));
    }

    #[test]
    fn join_groups_points_and_reports_unmatched() {
        let points = vec![
            GeoPoint::new("Montreal", 45.1, -73.9),
            GeoPoint::new("Hole", 45.5, -73.5),
            GeoPoint::new("Quebec", 46.8, -71.2),
            GeoPoint::new("Saguenay", 48.2, -69.8),
            GeoPoint::new("Ottawa", 45.4, -75.7),
        ];
        let mut names = BTreeMap::new();
        names.insert("66".to_string(), "Montréal".to_string());

        let join = join_points(&points, &regions(), Some(&names));
        assert_eq!(join.summary.num_mapped, 3);
        assert_eq!(join.summary.num_unmapped, 2);
        assert_eq!(join.summary.num_regions_used, 2);

        let mtl = join.region("66").unwrap();
        assert_eq!(mtl.name.as_deref(), Some("Montréal"));
        assert_eq!(mtl.points.len(), 1);

        let qc = join.region("23").unwrap();
        assert_eq!(qc.name.as_deref(), Some("Québec"));
        assert_eq!(qc.points.len(), 2);

        let unmatched: Vec<_> = join.unmatched.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(unmatched, ["Hole", "Ottawa"]);
    }

    #[test]
    fn start_and_end_nodes_in_one_region_are_counted_apart() {
        let nodes = vec![
            (GeoPoint::new("Manic-5", 46.7, -71.9), NodeRole::new(true, false)),
            (GeoPoint::new("Levis", 46.8, -71.2), NodeRole::new(false, true)),
            (GeoPoint::new("Laurentides", 46.9, -71.5), NodeRole::new(true, true)),
            (GeoPoint::new("Chateauguay", 45.1, -73.9), NodeRole::new(false, true)),
        ];
        let join = join_nodes(&nodes, &regions(), None);

        let qc = join.region("23").unwrap();
        assert_eq!(qc.points.len(), 3);
        assert_eq!(qc.roles, RoleCounts { start: 2, end: 2, both: 1 });

        let mtl = join.region("66").unwrap();
        assert_eq!(mtl.roles, RoleCounts { start: 0, end: 1, both: 0 });
        assert_eq!(join.summary.num_points, 4);
    }
}
