//! Map page: area markers, region search and plans created from a selected marker.

use serde::{Deserialize, Serialize};

use crate::backend::models::EnvironmentalRecord;
use crate::service::classifier::RiskClassifier;

/// Markers drawn on the map.
pub const MAX_MAP_AREAS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapPosition {
    pub top: String,
    pub left: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapArea {
    pub name: String,
    pub region_id: Option<String>,
    pub coordinates: String,
    pub ndvi: f64,
    pub erosion_risk: String,
    pub land_use: String,
    pub soil_health: f64,
    pub position: MapPosition,
}

pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.1}°N, {longitude:.1}°E")
}

fn erosion_label(record: &EnvironmentalRecord, classifier: &dyn RiskClassifier) -> &'static str {
    if classifier.is_high_erosion(record) {
        "High"
    } else {
        "Medium"
    }
}

pub fn area_from_record(
    record: &EnvironmentalRecord,
    index: usize,
    classifier: &dyn RiskClassifier,
) -> MapArea {
    MapArea {
        name: record.region_name.clone(),
        region_id: Some(record.region_id.clone()),
        coordinates: format_coordinates(
            record.latitude.unwrap_or_default(),
            record.longitude.unwrap_or_default(),
        ),
        ndvi: record.ndvi_value.filter(|v| *v != 0.0).unwrap_or(0.35),
        erosion_risk: erosion_label(record, classifier).to_string(),
        land_use: record
            .land_use_type
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Mixed".to_string()),
        soil_health: record
            .soil_health_score
            .filter(|v| *v != 0.0)
            .unwrap_or(50.0),
        position: MapPosition {
            top: format!("{}%", 20 + index * 8),
            left: format!("{}%", 30 + (index % 3) * 20),
        },
    }
}

/// Markers for the newest records, or the built-in sample sectors when nothing is measured.
pub fn map_areas(records: &[EnvironmentalRecord], classifier: &dyn RiskClassifier) -> Vec<MapArea> {
    if records.is_empty() {
        return sample_areas();
    }
    records
        .iter()
        .take(MAX_MAP_AREAS)
        .enumerate()
        .map(|(i, r)| area_from_record(r, i, classifier))
        .collect()
}

/// Case-insensitive name match, or a substring of the region id.
pub fn search<'a>(records: &'a [EnvironmentalRecord], query: &str) -> Option<&'a EnvironmentalRecord> {
    let needle = query.trim();
    if needle.is_empty() {
        return None;
    }
    let lowered = needle.to_lowercase();
    records.iter().find(|r| {
        r.region_name.to_lowercase().contains(&lowered) || r.region_id.contains(needle)
    })
}

/// Estimated success for a map-created plan, stepped on NDVI.
pub fn map_success_estimate(ndvi: f64) -> i64 {
    if ndvi < 0.3 {
        75
    } else if ndvi < 0.4 {
        82
    } else {
        88
    }
}

pub fn area_hectares_for_land_use(land_use: &str) -> f64 {
    match land_use {
        "Agricultural" => 450.0,
        "Mixed Forest" => 280.0,
        _ => 320.0,
    }
}

/// `"34.5°N, 45.2°E"` → `"34.5-N,-45.2-E"`.
pub fn region_id_from_coordinates(coordinates: &str) -> String {
    coordinates
        .chars()
        .map(|c| if c == '°' || c.is_whitespace() { '-' } else { c })
        .collect()
}

fn sample_areas() -> Vec<MapArea> {
    let sample = |name: &str, coords: &str, ndvi, erosion: &str, land: &str, soil, top: &str, left: &str| MapArea {
        name: name.to_string(),
        region_id: None,
        coordinates: coords.to_string(),
        ndvi,
        erosion_risk: erosion.to_string(),
        land_use: land.to_string(),
        soil_health: soil,
        position: MapPosition {
            top: top.to_string(),
            left: left.to_string(),
        },
    };
    vec![
        sample("Northern Plains - Sector 12", "34.5°N, 45.2°E", 0.35, "High", "Agricultural", 42.0, "20%", "30%"),
        sample("Eastern Valley - Sector 8", "32.1°N, 48.7°E", 0.52, "Medium", "Mixed Forest", 68.0, "45%", "65%"),
        sample("Southern Hills - Sector 5", "29.8°N, 43.9°E", 0.28, "High", "Degraded Land", 35.0, "70%", "40%"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::classifier::SevereLevels;

    #[test]
    fn markers_default_missing_values() {
        let mut r = EnvironmentalRecord::fixture("Kitui", 0.0);
        r.land_use_type = None;
        r.soil_health_score = None;
        r.erosion_risk_level = Some("severe".into());
        r.latitude = Some(-1.374);
        r.longitude = Some(38.01);

        let area = area_from_record(&r, 4, &SevereLevels::default());
        assert_eq!(area.coordinates, "-1.4°N, 38.0°E");
        assert_eq!(area.ndvi, 0.35);
        assert_eq!(area.land_use, "Mixed");
        assert_eq!(area.soil_health, 50.0);
        assert_eq!(area.erosion_risk, "High");
        assert_eq!(area.position, MapPosition { top: "52%".into(), left: "50%".into() });
    }

    #[test]
    fn empty_map_shows_samples_and_caps_markers() {
        assert_eq!(map_areas(&[], &SevereLevels::default()).len(), 3);
        let many: Vec<_> = (0..15)
            .map(|i| EnvironmentalRecord::fixture(&format!("R{i}"), 0.4))
            .collect();
        assert_eq!(map_areas(&many, &SevereLevels::default()).len(), MAX_MAP_AREAS);
    }

    #[test]
    fn search_by_name_or_id() {
        let records = [
            EnvironmentalRecord::fixture("Northern Plains", 0.3),
            EnvironmentalRecord::fixture("Athi River Basin", 0.3),
        ];
        assert_eq!(search(&records, "athi").unwrap().region_name, "Athi River Basin");
        assert_eq!(search(&records, "northern-pl").unwrap().region_name, "Northern Plains");
        assert!(search(&records, "Turkana").is_none());
        assert!(search(&records, "  ").is_none());
    }

    #[test]
    fn plan_heuristics() {
        assert_eq!(map_success_estimate(0.29), 75);
        assert_eq!(map_success_estimate(0.3), 82);
        assert_eq!(map_success_estimate(0.4), 88);
        assert_eq!(area_hectares_for_land_use("Mixed Forest"), 280.0);
        assert_eq!(area_hectares_for_land_use("Degraded Land"), 320.0);
        assert_eq!(region_id_from_coordinates("34.5°N, 45.2°E"), "34.5-N,-45.2-E");
    }
}
