//! Auth webhook payload handling: signature check and the profile row it produces.

use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::backend::tables::roles;

type HmacSha256 = Hmac<Sha256>;

/// Checked in order; the first present header wins.
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-supabase-signature", "x-supabase-signature-256"];

const USER_CREATED_EVENTS: [&str; 2] = ["user.created", "auth.user.created"];

/// Lowercase hex HMAC-SHA256 of `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(expected) = sign(secret, body) else {
        return false;
    };
    let provided = provided.trim();
    expected.len() == provided.len() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

/// Event name from `type`, `event` or `trigger`.
pub fn event_name(payload: &Value) -> Option<&str> {
    ["type", "event", "trigger"]
        .iter()
        .find_map(|k| present(payload, k))
        .and_then(Value::as_str)
}

pub fn is_user_created(payload: &Value) -> bool {
    event_name(payload).is_some_and(|e| USER_CREATED_EVENTS.contains(&e))
}

/// The user object, wherever this payload shape keeps it.
pub fn extract_user(payload: &Value) -> &Value {
    ["user", "record", "data", "new"]
        .iter()
        .find_map(|k| present(payload, k))
        .unwrap_or(payload)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileRow {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub role: &'static str,
}

/// Profile for a freshly created user; `None` when the payload carries no id.
pub fn profile_row(user: &Value) -> Option<ProfileRow> {
    let id = present(user, "id").and_then(crate::backend::query::value_text)?;
    let text = |key: &str| {
        user.get("user_metadata")
            .and_then(|m| present(m, key))
            .or_else(|| present(user, key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Some(ProfileRow {
        id,
        email: present(user, "email").and_then(Value::as_str).map(str::to_string),
        full_name: text("full_name"),
        organization: text("organization"),
        role: roles::USER,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signature_round_trip() {
        let body = br#"{"type":"user.created"}"#;
        let sig = sign("whsec", body).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify_signature("whsec", body, &sig));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature("whsec", body, &sig[..10]));
    }

    #[test]
    fn event_lookup_order() {
        assert!(is_user_created(&json!({"type": "user.created"})));
        assert!(is_user_created(&json!({"type": null, "event": "auth.user.created"})));
        assert!(!is_user_created(&json!({"trigger": "user.deleted"})));
        assert!(!is_user_created(&json!({})));
    }

    #[test]
    fn profile_from_nested_record() {
        let payload = json!({
            "type": "user.created",
            "record": {
                "id": "7f1c",
                "email": "amina@example.org",
                "user_metadata": {"full_name": "Amina K."},
                "organization": "KEFRI"
            }
        });
        let row = profile_row(extract_user(&payload)).unwrap();
        assert_eq!(row.id, "7f1c");
        assert_eq!(row.full_name.as_deref(), Some("Amina K."));
        assert_eq!(row.organization.as_deref(), Some("KEFRI"));
        assert_eq!(row.role, "user");
    }

    #[test]
    fn payload_itself_is_the_user_when_unwrapped() {
        let payload = json!({"type": "user.created", "email": "x@y.z"});
        assert!(profile_row(extract_user(&payload)).is_none());
    }
}
