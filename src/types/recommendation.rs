use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Validated input for a recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionProfile {
    pub region_name: String,
    pub ndvi_value: f64,
    pub soil_health_score: f64,
    pub erosion_risk_level: String,
    pub degradation_level: String,
    pub area_hectares: f64,
    pub climate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlantSpecies {
    #[serde(deserialize_with = "de_string")]
    pub name: String,
    #[serde(deserialize_with = "de_string")]
    pub scientific_name: String,
    #[serde(deserialize_with = "de_string")]
    pub description: String,
    #[serde(deserialize_with = "de_number")]
    pub survival_rate: f64,
    #[serde(deserialize_with = "de_number")]
    pub cost_per_unit: f64,
    #[serde(deserialize_with = "de_string")]
    pub planting_season: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SoilTechnique {
    #[serde(deserialize_with = "de_string")]
    pub name: String,
    #[serde(deserialize_with = "de_string")]
    pub description: String,
    #[serde(deserialize_with = "de_number")]
    pub estimated_cost: f64,
    #[serde(deserialize_with = "de_priority")]
    pub priority: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WaterManagement {
    #[serde(deserialize_with = "de_string")]
    pub name: String,
    #[serde(deserialize_with = "de_string")]
    pub description: String,
    #[serde(deserialize_with = "de_number")]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RestorationRecommendation {
    pub plant_species: Vec<PlantSpecies>,
    pub soil_techniques: Vec<SoilTechnique>,
    pub water_management: Vec<WaterManagement>,
    #[serde(deserialize_with = "de_number")]
    pub success_estimate: f64,
    #[serde(deserialize_with = "de_string")]
    pub reasoning: String,
}

/// Model replies quote numbers as often as not; unreadable values count as zero.
fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn de_priority<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = de_number(deserializer)?;
    Ok(if n.is_finite() && n > 0.0 {
        n.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    })
}

fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
