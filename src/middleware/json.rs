use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde_json::Value;

use crate::LandwatchError;

/// `Json<T>` whose rejections (bad syntax, wrong content type, oversized body)
/// surface as [`LandwatchError`] with the rejection's own status.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = LandwatchError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(LandwatchError::Rejected {
                status: rejection.status(),
                message: rejection.body_text(),
            }),
        }
    }
}

/// A JSON number, or a string that parses as one.
pub fn number_field(body: &Value, key: &str) -> Option<f64> {
    match body.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// A non-empty string field.
pub fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_accept_numeric_strings() {
        let body = json!({"a": 1.5, "b": " -36.8 ", "c": "north", "d": null, "e": ""});
        assert_eq!(number_field(&body, "a"), Some(1.5));
        assert_eq!(number_field(&body, "b"), Some(-36.8));
        assert_eq!(number_field(&body, "c"), None);
        assert_eq!(number_field(&body, "d"), None);
        assert_eq!(number_field(&body, "missing"), None);
        assert_eq!(str_field(&body, "e"), None);
        assert_eq!(str_field(&body, "c"), Some("north"));
    }
}
