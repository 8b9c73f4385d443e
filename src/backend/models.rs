use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// User as returned by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AuthUser {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Metadata full name, else the email's local part, else `User`.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.metadata_str("full_name") {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

/// Token pair issued by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// Admin user creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub user_metadata: Value,
    pub email_confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub region_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub region_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub ndvi_value: Option<f64>,
    #[serde(default)]
    pub soil_health_score: Option<f64>,
    #[serde(default)]
    pub erosion_risk_level: Option<String>,
    #[serde(default)]
    pub land_use_type: Option<String>,
    #[serde(default)]
    pub degradation_level: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub measurement_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub area_hectares: Option<f64>,
}

#[cfg(test)]
impl EnvironmentalRecord {
    pub(crate) fn fixture(region_name: &str, ndvi: f64) -> Self {
        Self {
            id: None,
            region_id: region_name.to_ascii_lowercase().replace(' ', "-"),
            region_name: region_name.to_string(),
            latitude: Some(-1.3),
            longitude: Some(36.8),
            ndvi_value: Some(ndvi),
            soil_health_score: Some(45.0),
            erosion_risk_level: Some("moderate".to_string()),
            land_use_type: Some("Agricultural".to_string()),
            degradation_level: Some("moderate".to_string()),
            data_source: Some("satellite".to_string()),
            measurement_date: Some(Utc::now()),
            area_hectares: None,
        }
    }
}

/// Environmental row written by the upload processor.
#[derive(Debug, Clone, Serialize)]
pub struct NewEnvironmentalRecord {
    pub region_id: String,
    pub region_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ndvi_value: f64,
    pub soil_health_score: f64,
    pub erosion_risk_level: String,
    pub land_use_type: String,
    pub degradation_level: String,
    pub data_source: String,
    pub measurement_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestorationProject {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success_rate_estimate: Option<f64>,
    #[serde(default)]
    pub budget_allocated: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewRestorationProject {
    pub project_name: String,
    pub region_id: String,
    pub region_name: String,
    pub area_hectares: f64,
    pub budget_allocated: f64,
    pub budget_spent: f64,
    pub start_date: NaiveDate,
    pub estimated_completion_date: NaiveDate,
    pub status: String,
    pub success_rate_estimate: i64,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUploadedFile {
    pub user_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: usize,
    pub file_type: String,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Ids may be uuids or serial integers depending on the table.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| crate::backend::query::value_text(&v)))
}

/// Null or missing text columns read as empty.
fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| crate::backend::query::value_text(&v))
        .unwrap_or_default())
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates; anything else reads as `None`.
fn de_opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_datetime))
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}
