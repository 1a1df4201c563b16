//! MRC region polygons (GeoJSON) and their names (CSV `ID,CDNAME`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hq_core::{Polygon, Region};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::DataLoadError;

const ID_PROPERTIES: &[&str] = &["ID", "id", "CDUID", "MRS_CO_MRC"];
const NAME_PROPERTIES: &[&str] = &["CDNAME", "name", "NAME", "MRS_NM_MRC"];

/// Read a GeoJSON FeatureCollection of Polygon / MultiPolygon features.
/// Features with other geometries are skipped with a warning.
pub fn load_regions_geojson(path: &Path) -> Result<Vec<Region>, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text).map_err(|source| DataLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    parse_regions(&doc).map_err(|message| DataLoadError::schema(path, message))
}

pub fn parse_regions(doc: &Value) -> Result<Vec<Region>, String> {
    let features = doc["features"]
        .as_array()
        .ok_or_else(|| "expected a FeatureCollection with a 'features' array".to_string())?;

    let mut regions = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let properties = &feature["properties"];
        let id = feature_id(feature, properties).unwrap_or_else(|| index.to_string());
        let name = NAME_PROPERTIES
            .iter()
            .find_map(|key| properties[*key].as_str())
            .map(str::to_string);

        let geometry = &feature["geometry"];
        let polygons = match geometry["type"].as_str() {
            Some("Polygon") => vec![parse_polygon(&geometry["coordinates"])?],
            Some("MultiPolygon") => geometry["coordinates"]
                .as_array()
                .ok_or_else(|| format!("feature {id}: MultiPolygon without coordinates"))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                warn!(feature = %id, geometry = ?other, "skipping non-polygon feature");
                continue;
            }
        };
        regions.push(Region { id, name, polygons });
    }
    debug!(regions = regions.len(), "parsed region polygons");
    Ok(regions)
}

fn feature_id(feature: &Value, properties: &Value) -> Option<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    ID_PROPERTIES
        .iter()
        .find_map(|key| scalar(&properties[*key]))
        .or_else(|| scalar(&feature["id"]))
}

fn parse_ring(value: &Value) -> Result<Vec<(f64, f64)>, String> {
    value
        .as_array()
        .ok_or_else(|| "ring is not an array".to_string())?
        .iter()
        .map(|pt| match (pt[0].as_f64(), pt[1].as_f64()) {
            (Some(lon), Some(lat)) => Ok((lon, lat)),
            _ => Err(format!("invalid position {pt}")),
        })
        .collect()
}

fn parse_polygon(value: &Value) -> Result<Polygon, String> {
    let rings = value
        .as_array()
        .ok_or_else(|| "polygon is not an array of rings".to_string())?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon without exterior ring".to_string())??;
    let holes = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon { exterior, holes })
}

#[derive(Debug, Deserialize)]
struct RegionNameRecord {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "CDNAME")]
    name: String,
}

/// Region id → display name.
pub fn load_region_names(path: &Path) -> Result<BTreeMap<String, String>, DataLoadError> {
    let rows: Vec<RegionNameRecord> = crate::loader::read_table(path)?;
    Ok(rows.into_iter().map(|r| (r.id, r.name)).collect())
}

/// Fill missing region names from a name table.
pub fn apply_region_names(regions: &mut [Region], names: &BTreeMap<String, String>) {
    for region in regions {
        if let Some(name) = names.get(&region.id) {
            region.name = Some(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_polygon_and_multipolygon() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ID": 66, "CDNAME": "Montréal"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [
                            [[-74.0, 45.3], [-73.4, 45.3], [-73.4, 45.8], [-74.0, 45.8], [-74.0, 45.3]],
                            [[-73.8, 45.5], [-73.7, 45.5], [-73.7, 45.6], [-73.8, 45.5]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "id": "23",
                    "properties": {},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[-71.5, 46.7], [-71.1, 46.7], [-71.1, 47.0], [-71.5, 46.7]]],
                            [[[-70.9, 46.9], [-70.8, 46.9], [-70.8, 47.0], [-70.9, 46.9]]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"ID": "99"},
                    "geometry": {"type": "Point", "coordinates": [-70.0, 48.0]}
                }
            ]
        });
        let regions = parse_regions(&doc).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, "66");
        assert_eq!(regions[0].label(), "Montréal");
        assert_eq!(regions[0].polygons[0].holes.len(), 1);
        assert_eq!(regions[1].id, "23");
        assert_eq!(regions[1].polygons.len(), 2);
    }

    #[test]
    fn rejects_non_collections() {
        assert!(parse_regions(&json!({"type": "Feature"})).is_err());
    }

    #[test]
    fn names_fill_regions() {
        let mut regions = vec![Region {
            id: "23".into(),
            ..Region::default()
        }];
        let names = BTreeMap::from([("23".to_string(), "Québec".to_string())]);
        apply_region_names(&mut regions, &names);
        assert_eq!(regions[0].label(), "Québec");
    }
}
