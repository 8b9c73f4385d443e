use axum::extract::{FromRequest, Request};
use serde_json::Value;

use crate::LandwatchError;
use crate::middleware::json::{ApiJson, number_field, str_field};
use crate::types::recommendation::RegionProfile;

/// Validated body of an AI recommendation request.
pub struct RecommendationInput(pub RegionProfile);

impl RecommendationInput {
    /// `ndviValue` may legitimately be zero; soil score and area may not.
    pub fn from_body(body: &Value) -> Result<Self, LandwatchError> {
        let non_zero = |key: &str| number_field(body, key).filter(|v| *v != 0.0);

        let profile = RegionProfile {
            region_name: str_field(body, "regionName")
                .ok_or_else(LandwatchError::missing_fields)?
                .to_string(),
            ndvi_value: number_field(body, "ndviValue").ok_or_else(LandwatchError::missing_fields)?,
            soil_health_score: non_zero("soilHealthScore").ok_or_else(LandwatchError::missing_fields)?,
            erosion_risk_level: str_field(body, "erosionRiskLevel")
                .ok_or_else(LandwatchError::missing_fields)?
                .to_string(),
            degradation_level: str_field(body, "degradationLevel")
                .ok_or_else(LandwatchError::missing_fields)?
                .to_string(),
            area_hectares: non_zero("areaHectares").ok_or_else(LandwatchError::missing_fields)?,
            climate: str_field(body, "climate").map(str::to_string),
        };
        Ok(Self(profile))
    }
}

impl<S> FromRequest<S> for RecommendationInput
where
    S: Send + Sync,
{
    type Rejection = LandwatchError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(body) = ApiJson::<Value>::from_request(req, state).await?;
        Self::from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "regionName": "Machakos East",
            "ndviValue": 0,
            "soilHealthScore": "41",
            "erosionRiskLevel": "high",
            "degradationLevel": "severe",
            "areaHectares": 120
        })
    }

    #[test]
    fn zero_ndvi_is_accepted() {
        let RecommendationInput(profile) = RecommendationInput::from_body(&body()).unwrap();
        assert_eq!(profile.ndvi_value, 0.0);
        assert_eq!(profile.soil_health_score, 41.0);
        assert_eq!(profile.climate, None);
    }

    #[test]
    fn zero_area_or_missing_level_is_rejected() {
        let mut b = body();
        b["areaHectares"] = json!(0);
        assert!(RecommendationInput::from_body(&b).is_err());

        let mut b = body();
        b.as_object_mut().unwrap().remove("degradationLevel");
        let err = RecommendationInput::from_body(&b).err().unwrap();
        assert_eq!(err.to_string(), "Bad request: Missing required fields");
    }
}
