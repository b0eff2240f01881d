//! # Response Decoding
//!
//! The backend wraps payloads inconsistently: some endpoints answer
//! `{ data: {...} }`, some `{ user: {...} }`, some put the fields at the
//! root. Everything is funnelled through [`extract_payload`] so the engine
//! works against one canonical shape.
//!
//! ```text
//!   body ──► data? ──► user? ──► root
//!              │         │         │
//!              └─────────┴─────────┴──► typed struct (serde)
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Picks the object carrying the actual payload: `data`, then `user`, then
/// the root itself. Null wrappers are skipped.
pub fn extract_payload(body: &Value) -> &Value {
    ["data", "user"]
        .iter()
        .filter_map(|key| body.get(key))
        .find(|v| !v.is_null())
        .unwrap_or(body)
}

/// Decodes the payload of `body` into `T`.
pub fn decode_payload<T: DeserializeOwned>(body: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(extract_payload(body))
}

/// Decodes a list endpoint. Accepts a bare array or `{ data: [...] }`;
/// anything else is an empty list. Items that fail to decode are skipped.
pub fn decode_list<T: DeserializeOwned>(body: &Value) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        other => match other.get("data") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
    };

    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable list item");
                None
            }
        })
        .collect()
}

// =============================================================================
// Attendance Submit
// =============================================================================

/// Canonical check-in/check-out response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitResponse {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub message: Option<String>,
    pub distance: Option<f64>,
    pub allowed_radius: Option<f64>,
    pub success: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubmitFields {
    check_in: Option<String>,
    check_out: Option<String>,
    message: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    distance: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    allowed_radius: Option<f64>,
    success: Option<bool>,
}

/// A server-side refusal carried in an otherwise successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub message: String,
    pub distance: Option<f64>,
    pub allowed_radius: Option<f64>,
}

impl SubmitResponse {
    /// Decodes a submit body. Root-level fields (`message`, `success`,
    /// `distance`) are read from the root; times fall back root-wards when
    /// the payload object lacks them.
    pub fn from_body(body: &Value) -> Self {
        let root: SubmitFields = SubmitFields::deserialize(body).unwrap_or_default();
        let payload: SubmitFields =
            SubmitFields::deserialize(extract_payload(body)).unwrap_or_default();

        SubmitResponse {
            check_in: payload.check_in.or(root.check_in),
            check_out: payload.check_out.or(root.check_out),
            message: root.message.or(payload.message),
            distance: root.distance.or(payload.distance),
            allowed_radius: root.allowed_radius.or(payload.allowed_radius),
            success: root.success.or(payload.success),
        }
    }

    /// Confirmed time for `kind`, as sent by the server.
    pub fn time_for(&self, kind: presensi_core::AttendanceKind) -> Option<&str> {
        match kind {
            presensi_core::AttendanceKind::CheckIn => self.check_in.as_deref(),
            presensi_core::AttendanceKind::CheckOut => self.check_out.as_deref(),
        }
    }

    /// `Some` when the server refused the action: `success == false`, or a
    /// geofence explanation without `success == true`.
    pub fn rejection(&self) -> Option<Rejection> {
        let refused = match self.success {
            Some(false) => true,
            Some(true) => false,
            None => self.distance.is_some() && self.allowed_radius.is_some(),
        };
        if !refused {
            return None;
        }

        let message = self.message.clone().unwrap_or_else(|| match (self.distance, self.allowed_radius) {
            (Some(d), Some(r)) => format!("{d:.0} m from office, allowed {r:.0} m"),
            _ => "Attendance refused by server".to_string(),
        });

        Some(Rejection {
            message,
            distance: self.distance,
            allowed_radius: self.allowed_radius,
        })
    }
}

// =============================================================================
// Errors & Auth
// =============================================================================

/// Body of a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    /// Lenient: a non-JSON or oddly shaped body yields an empty value.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Login response: the token may come as `token` or `access_token`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<presensi_core::EmployeeProfile>,
}

impl LoginResponse {
    pub fn from_body(body: &Value) -> Self {
        let token = ["token", "access_token"]
            .iter()
            .filter_map(|key| {
                body.get(key)
                    .or_else(|| body.get("data").and_then(|d| d.get(key)))
            })
            .filter_map(Value::as_str)
            .find(|t| !t.is_empty())
            .map(str::to_string);

        let user = body
            .get("user")
            .or_else(|| body.get("data").and_then(|d| d.get("user")))
            .and_then(|u| presensi_core::EmployeeProfile::deserialize(u).ok());

        LoginResponse { token, user }
    }
}

/// Accepts numbers and numeric strings (`"412.5"`).
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
