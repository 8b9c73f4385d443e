use tracing::{info, warn};

use crate::api::TextGenerator;
use crate::error::LandwatchError;
use crate::types::recommendation::{
    PlantSpecies, RegionProfile, RestorationRecommendation, SoilTechnique, WaterManagement,
};

pub const DEFAULT_CLIMATE: &str = "Tropical/Sub-tropical";

pub fn build_prompt(region: &RegionProfile) -> String {
    let climate = region.climate.as_deref().unwrap_or(DEFAULT_CLIMATE);
    format!(
        r#"You are an expert environmental scientist specializing in land restoration in Kenya and East Africa.

Given the following environmental data for a degraded area:
- Region: {region_name}
- NDVI Value: {ndvi} (vegetation health indicator, -1 to 1 scale)
- Soil Health Score: {soil}/100
- Erosion Risk: {erosion}
- Degradation Level: {degradation}
- Area Size: {area} hectares
- Climate: {climate}

Provide detailed restoration recommendations in the following JSON format:
{{
  "plantSpecies": [
    {{
      "name": "Common name",
      "scientificName": "Scientific name",
      "description": "Why this species is suitable",
      "survivalRate": 85,
      "costPerUnit": 2.5,
      "plantingSeason": "March-May"
    }}
  ],
  "soilTechniques": [
    {{
      "name": "Technique name",
      "description": "How it helps",
      "estimatedCost": 5000,
      "priority": 1
    }}
  ],
  "waterManagement": [
    {{
      "name": "Water management technique",
      "description": "Implementation details",
      "estimatedCost": 3000
    }}
  ],
  "successEstimate": 75,
  "reasoning": "Brief explanation of why these recommendations will work"
}}

Focus on native Kenyan species and techniques appropriate for the local climate and conditions. Provide 3-5 plant species, 2-4 soil conservation techniques, and 2-3 water management strategies."#,
        region_name = region.region_name,
        ndvi = region.ndvi_value,
        soil = region.soil_health_score,
        erosion = region.erosion_risk_level,
        degradation = region.degradation_level,
        area = region.area_hectares,
    )
}

/// The span from the first `{` to the last `}`; models often wrap JSON in prose or fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_recommendation(text: &str) -> Result<RestorationRecommendation, LandwatchError> {
    let json = extract_json_object(text)
        .ok_or_else(|| LandwatchError::Internal("Failed to parse AI response".to_string()))?;
    let rec: RestorationRecommendation = serde_json::from_str(json)?;
    if rec.plant_species.is_empty() && rec.soil_techniques.is_empty() && rec.water_management.is_empty() {
        return Err(LandwatchError::Internal("AI response had no recommendations".to_string()));
    }
    Ok(rec)
}

/// Ask the model; on any failure fall back to a fixed, field-tested plan.
pub async fn recommend(
    generator: &dyn TextGenerator,
    region: &RegionProfile,
    temperature: f32,
) -> RestorationRecommendation {
    let prompt = build_prompt(region);
    let outcome = match generator.generate(&prompt, temperature).await {
        Ok(text) => parse_recommendation(&text),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(rec) => {
            info!(
                region = %region.region_name,
                species = rec.plant_species.len(),
                "AI recommendations generated"
            );
            rec
        }
        Err(e) => {
            warn!(region = %region.region_name, error = %e, "AI recommendations failed; using fallback");
            fallback_recommendation()
        }
    }
}

pub fn fallback_recommendation() -> RestorationRecommendation {
    RestorationRecommendation {
        plant_species: vec![
            PlantSpecies {
                name: "Acacia".to_string(),
                scientific_name: "Acacia tortilis".to_string(),
                description: "Drought-resistant native tree excellent for soil stabilization"
                    .to_string(),
                survival_rate: 80.0,
                cost_per_unit: 2.0,
                planting_season: "March-May".to_string(),
            },
            PlantSpecies {
                name: "Grevillea".to_string(),
                scientific_name: "Grevillea robusta".to_string(),
                description: "Fast-growing tree for erosion control and timber".to_string(),
                survival_rate: 85.0,
                cost_per_unit: 3.5,
                planting_season: "March-May".to_string(),
            },
        ],
        soil_techniques: vec![
            SoilTechnique {
                name: "Contour Plowing".to_string(),
                description:
                    "Plowing along contour lines to reduce water runoff and soil erosion"
                        .to_string(),
                estimated_cost: 5000.0,
                priority: 1,
            },
            SoilTechnique {
                name: "Mulching".to_string(),
                description: "Apply organic mulch to retain moisture and improve soil structure"
                    .to_string(),
                estimated_cost: 3000.0,
                priority: 2,
            },
        ],
        water_management: vec![WaterManagement {
            name: "Rainwater Harvesting".to_string(),
            description: "Install water catchment systems to capture and store rainwater"
                .to_string(),
            estimated_cost: 8000.0,
        }],
        success_estimate: 70.0,
        reasoning: "These recommendations are based on proven techniques for similar degradation levels in East African climates.".to_string(),
    }
}
