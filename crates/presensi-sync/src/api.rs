//! # REST API Client
//!
//! ## Endpoints
//! ```text
//! ┌──────────────────────────────────────┬────────┬───────────────────────────┐
//! │ Path                                 │ Method │ Body                      │
//! ├──────────────────────────────────────┼────────┼───────────────────────────┤
//! │ /login                               │ POST   │ JSON {email, password}    │
//! │ /forgot-password                     │ POST   │ JSON {email}              │
//! │ /reset-password                      │ POST   │ JSON                      │
//! │ /employee/profile                    │ GET    │                           │
//! │ /employee/profile                    │ POST   │ JSON, or multipart+photo  │
//! │ /employee/check-in                   │ POST   │ multipart (SubmitForm)    │
//! │ /employee/check-out                  │ POST   │ multipart (SubmitForm)    │
//! │ /employee/attendances/history        │ GET    │ ?month&year               │
//! │ /employee/attendances/calendar       │ GET    │ ?month&year               │
//! │ /employee/leave-requests/history     │ GET    │                           │
//! │ /employee/leave-request              │ POST   │ multipart (+support_file) │
//! └──────────────────────────────────────┴────────┴───────────────────────────┘
//! ```
//!
//! Authenticated requests carry `Authorization: Bearer <token>`. Attendance
//! submits are background-sync requests and carry `X-Background-Sync: 1`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use presensi_core::validation::{validate_email, validate_leave_request, validate_password};
use presensi_core::{
    AttendanceEvent, AttendanceKind, CalendarDay, DailyAttendanceRecord, EmployeeProfile,
    LeaveRequest, NewLeaveRequest, ProfileUpdate,
};

use crate::config::ApiSettings;
use crate::error::{SyncError, SyncResult};
use crate::response::{decode_list, decode_payload, ErrorBody, LoginResponse, SubmitResponse};
use crate::session::{RequestOrigin, SessionGuard};

/// Marker header for requests whose auth failures must not end the session.
pub const BACKGROUND_SYNC_HEADER: &str = "X-Background-Sync";

// =============================================================================
// Attendance Transport
// =============================================================================

/// Multipart fields of a check-in/check-out request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitForm {
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub accuracy: Option<f64>,
    pub distance: Option<f64>,
    pub user_id: Option<i64>,
}

impl SubmitForm {
    pub fn from_event(event: &AttendanceEvent, user_id: Option<i64>) -> Self {
        SubmitForm {
            latitude: event.latitude,
            longitude: event.longitude,
            status: event.status.clone(),
            accuracy: event.accuracy,
            distance: event.distance,
            user_id,
        }
    }

    /// Form pairs in wire order; optional fields only when present.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("status", self.status.clone()),
        ];
        if let Some(accuracy) = self.accuracy {
            fields.push(("accuracy", accuracy.to_string()));
        }
        if let Some(distance) = self.distance {
            fields.push(("distance", distance.to_string()));
        }
        if let Some(user_id) = self.user_id {
            fields.push(("user_id", user_id.to_string()));
        }
        fields
    }
}

/// The backend seen by the sync engine.
#[async_trait]
pub trait AttendanceTransport: Send + Sync {
    async fn submit(&self, kind: AttendanceKind, form: &SubmitForm) -> SyncResult<SubmitResponse>;
}

fn submit_path(kind: AttendanceKind) -> &'static str {
    match kind {
        AttendanceKind::CheckIn => "employee/check-in",
        AttendanceKind::CheckOut => "employee/check-out",
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// reqwest-backed client for the employee REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    session: SessionGuard,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, session: SessionGuard) -> SyncResult<Self> {
        url::Url::parse(&settings.base_url)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("presensi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client: {e}")))?;

        Ok(ApiClient {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
            session,
        })
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn authed(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let token = self.session.token().await?.ok_or(SyncError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Sends `request`, decodes the JSON body and routes failures through
    /// the session guard.
    async fn execute(&self, request: RequestBuilder, origin: RequestOrigin) -> SyncResult<Value> {
        let request = match origin {
            RequestOrigin::Background => request.header(BACKGROUND_SYNC_HEADER, "1"),
            RequestOrigin::Foreground => request,
        };

        let result = self.send(request).await;
        if let Err(e) = &result {
            self.session.inspect(e, origin).await;
        }
        result
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Value> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Request failed");
            return Err(error_from_response(
                status.as_u16(),
                status.canonical_reason(),
                &text,
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout.as_millis() as u64)
        } else {
            SyncError::from(err)
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Logs in and persists the token (and profile, when returned).
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> SyncResult<LoginResponse> {
        validate_email(email)?;
        let request = self
            .request(Method::POST, "login")
            .json(&json!({ "email": email.trim(), "password": password }));

        let body = self.send(request).await?;
        let login = LoginResponse::from_body(&body);
        self.session.store_login(&login).await?;
        Ok(login)
    }

    pub async fn logout(&self) -> SyncResult<()> {
        self.session.logout().await
    }

    /// Asks the backend to email a reset link. Returns the server message.
    pub async fn forgot_password(&self, email: &str) -> SyncResult<Option<String>> {
        validate_email(email)?;
        let request = self
            .request(Method::POST, "forgot-password")
            .json(&json!({ "email": email.trim() }));
        let body = self.send(request).await?;
        Ok(message_of(&body))
    }

    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
        confirmation: &str,
    ) -> SyncResult<Option<String>> {
        validate_email(email)?;
        validate_password(password, confirmation)?;
        let request = self.request(Method::POST, "reset-password").json(&json!({
            "email": email.trim(),
            "token": token,
            "password": password,
            "password_confirmation": confirmation,
        }));
        let body = self.send(request).await?;
        Ok(message_of(&body))
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Fetches the profile and refreshes the local cache.
    pub async fn profile(&self) -> SyncResult<EmployeeProfile> {
        let request = self.authed(Method::GET, "employee/profile").await?;
        let body = self.execute(request, RequestOrigin::Foreground).await?;
        let profile: EmployeeProfile = decode_payload(&body)?;
        self.session.remember_profile(&profile).await?;
        Ok(profile)
    }

    /// Updates the profile. With a photo the request is multipart, otherwise
    /// JSON.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        photo: Option<&Path>,
    ) -> SyncResult<EmployeeProfile> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let request = self.authed(Method::POST, "employee/profile").await?;
        let request = match photo {
            Some(path) => {
                let mut form = Form::new();
                for (key, value) in update.form_fields() {
                    form = form.text(key, value);
                }
                form = form.part("photo", file_part(path).await?);
                request.multipart(form)
            }
            None => request.json(update),
        };

        let body = self.execute(request, RequestOrigin::Foreground).await?;
        match decode_payload::<EmployeeProfile>(&body) {
            Ok(profile) if !profile.email.is_empty() => {
                self.session.remember_profile(&profile).await?;
                Ok(profile)
            }
            _ => self.profile().await,
        }
    }

    // =========================================================================
    // Attendance History
    // =========================================================================

    pub async fn attendance_history(
        &self,
        month: u32,
        year: i32,
    ) -> SyncResult<Vec<DailyAttendanceRecord>> {
        let request = self
            .authed(Method::GET, "employee/attendances/history")
            .await?
            .query(&[("month", month.to_string()), ("year", year.to_string())]);
        let body = self.execute(request, RequestOrigin::Foreground).await?;
        Ok(decode_list(&body))
    }

    pub async fn attendance_calendar(&self, month: u32, year: i32) -> SyncResult<Vec<CalendarDay>> {
        let request = self
            .authed(Method::GET, "employee/attendances/calendar")
            .await?
            .query(&[("month", month.to_string()), ("year", year.to_string())]);
        let body = self.execute(request, RequestOrigin::Foreground).await?;
        Ok(decode_list(&body))
    }

    // =========================================================================
    // Leave Requests
    // =========================================================================

    pub async fn leave_history(&self) -> SyncResult<Vec<LeaveRequest>> {
        let request = self
            .authed(Method::GET, "employee/leave-requests/history")
            .await?;
        let body = self.execute(request, RequestOrigin::Foreground).await?;
        Ok(decode_list(&body))
    }

    /// Submits a leave request with an optional supporting document.
    pub async fn submit_leave(
        &self,
        leave: &NewLeaveRequest,
        support_file: Option<&Path>,
    ) -> SyncResult<Option<String>> {
        validate_leave_request(leave)?;

        let mut form = Form::new()
            .text("reason", leave.reason.trim().to_string())
            .text("duration", leave.duration.trim().to_string())
            .text("start_date", presensi_core::time::date_key(leave.start_date))
            .text("end_date", presensi_core::time::date_key(leave.end_date));
        if let Some(description) = leave.description.as_deref().filter(|d| !d.trim().is_empty()) {
            form = form.text("description", description.to_string());
        }
        if let Some(path) = support_file {
            form = form.part("support_file", file_part(path).await?);
        }

        let request = self
            .authed(Method::POST, "employee/leave-request")
            .await?
            .multipart(form);
        let body = self.execute(request, RequestOrigin::Foreground).await?;
        Ok(message_of(&body))
    }
}

#[async_trait]
impl AttendanceTransport for ApiClient {
    #[instrument(skip(self, form), fields(kind = %kind))]
    async fn submit(&self, kind: AttendanceKind, form: &SubmitForm) -> SyncResult<SubmitResponse> {
        let mut multipart = Form::new();
        for (key, value) in form.fields() {
            multipart = multipart.text(key, value);
        }

        let request = self
            .authed(Method::POST, submit_path(kind))
            .await?
            .multipart(multipart);
        let body = self.execute(request, RequestOrigin::Background).await?;
        Ok(SubmitResponse::from_body(&body))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Maps a non-2xx response to `Validation` (422) or `Http`.
pub fn error_from_response(status: u16, reason: Option<&str>, body: &str) -> SyncError {
    let parsed = ErrorBody::parse(body);
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"));

    if status == 422 {
        SyncError::Validation {
            message,
            fields: parsed.errors,
        }
    } else {
        SyncError::Http { status, message }
    }
}

fn message_of(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

async fn file_part(path: &Path) -> SyncResult<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SyncError::Internal(format!("reading {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}
