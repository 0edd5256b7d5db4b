//! Blocking HTTP client for the DailySpark admin API
//!
//! Every authenticated call sends the stored bearer token. Calls are made
//! from worker threads (mutations) or directly from the UI loop (list loads).

use super::error::ApiError;
use super::forms::{ServerTime, Submission};
use super::mapping::{self, UserPage};
use super::session::{Session, SessionUser};
use super::AdminBackend;
use crate::types::{AudienceRow, FeedbackRow, NotificationRow, ResourceKind, SurveyRow};
use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Query for the paginated users endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub role: Option<String>,
}

impl UserQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(role) = &self.role {
            params.push(("role", role.clone()));
        }
        params
    }
}

/// Query for the feedbacks endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackQuery {
    pub search: Option<String>,
    pub rating: Option<u8>,
}

impl FeedbackQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(rating) = self.rating {
            params.push(("rating", rating.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: Option<String>,
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    email: String,
    full_name: Option<String>,
    #[serde(default)]
    role: String,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dailyspark-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a fixed API path
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// URL of one row, with the id percent-encoded as a single segment
    pub fn row_url(
        &self,
        kind: ResourceKind,
        id: &str,
        action: Option<&str>,
    ) -> Result<Url, ApiError> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidUrl(format!(
                "{} has no id",
                kind.as_str().to_lowercase()
            )));
        }

        let mut url = self.endpoint(kind.collection_path())?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(id)
            .extend(action);
        Ok(url)
    }

    fn authed(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NoSession)?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json"))
    }

    /// Send and return the body text, mapping non-2xx to `ApiError::Status`
    fn send(&self, request: RequestBuilder, action: &str) -> Result<String, ApiError> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            warn!(action, status = status.as_u16(), "request failed");
            return Err(ApiError::from_response(status.as_u16(), &body, action));
        }

        debug!(action, status = status.as_u16(), "request ok");
        Ok(body)
    }

    fn send_json(&self, request: RequestBuilder, action: &str) -> Result<Value, ApiError> {
        let body = self.send(request, action)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn get_list(&self, kind: ResourceKind, action: &str) -> Result<Value, ApiError> {
        let request = self.authed(Method::GET, self.endpoint(kind.collection_path())?)?;
        self.send_json(request, action)
    }

    fn post_action(&self, kind: ResourceKind, id: &str, verb: &str, action: &str) -> Result<(), ApiError> {
        let url = self.row_url(kind, id, Some(verb))?;
        let request = self.authed(Method::POST, url)?.json(&json!({}));
        self.send(request, action).map(|_| ())
    }

    /// Exchange credentials for a session; only ADMIN accounts are accepted
    pub fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let request = self
            .http
            .post(self.endpoint("/auth/login")?)
            .header(ACCEPT, "application/json")
            .json(&json!({ "email": email.trim(), "password": password }));

        let body = self.send(request, "Login")?;
        let response: LoginResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        let (Some(token), Some(user)) = (response.access_token, response.user) else {
            return Err(ApiError::Decode("login response missing token or user".into()));
        };

        if !user.role.eq_ignore_ascii_case("ADMIN") {
            return Err(ApiError::Forbidden(
                "This panel is only available to admin accounts".into(),
            ));
        }

        info!(email = %user.email, "logged in");
        Ok(Session {
            token,
            user: SessionUser {
                id: user.id,
                email: user.email,
                full_name: user.full_name,
                role: user.role.to_uppercase(),
            },
        })
    }
}

impl AdminBackend for ApiClient {
    fn list_users(&self, query: &UserQuery) -> Result<UserPage, ApiError> {
        let request = self
            .authed(Method::GET, self.endpoint(ResourceKind::User.collection_path())?)?
            .query(&query.params());
        let data = self.send_json(request, "Load users")?;
        Ok(mapping::users_from_response(&data))
    }

    fn list_audiences(&self) -> Result<Vec<AudienceRow>, ApiError> {
        let data = self.get_list(ResourceKind::Audience, "Load audiences")?;
        Ok(mapping::audiences_from_response(&data))
    }

    fn list_notifications(&self) -> Result<Vec<NotificationRow>, ApiError> {
        let data = self.get_list(ResourceKind::Notification, "Load notifications")?;
        Ok(mapping::notifications_from_response(&data, Utc::now()))
    }

    fn list_surveys(&self) -> Result<Vec<SurveyRow>, ApiError> {
        let data = self.get_list(ResourceKind::Survey, "Load surveys")?;
        Ok(mapping::surveys_from_response(&data))
    }

    fn list_feedbacks(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRow>, ApiError> {
        let request = self
            .authed(Method::GET, self.endpoint(ResourceKind::Feedback.collection_path())?)?
            .query(&query.params());
        let data = self.send_json(request, "Load feedbacks")?;
        Ok(mapping::feedbacks_from_response(&data))
    }

    fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), ApiError> {
        let request = self.authed(Method::DELETE, self.row_url(kind, id, None)?)?;
        self.send(request, &format!("Delete {}", kind.as_str().to_lowercase()))
            .map(|_| ())
    }

    fn set_user_status(&self, id: &str, active: bool) -> Result<(), ApiError> {
        let url = self.row_url(ResourceKind::User, id, Some("status"))?;
        let request = self
            .authed(Method::PATCH, url)?
            .json(&json!({ "isActive": active }));
        self.send(request, "Update status").map(|_| ())
    }

    fn resend_notification(&self, id: &str) -> Result<(), ApiError> {
        self.post_action(ResourceKind::Notification, id, "send-now", "Resend")
    }

    fn publish_survey(&self, id: &str) -> Result<(), ApiError> {
        self.post_action(ResourceKind::Survey, id, "publish", "Publish")
    }

    fn archive_survey(&self, id: &str) -> Result<(), ApiError> {
        self.post_action(ResourceKind::Survey, id, "archive", "Archive")
    }

    fn submit(&self, submission: &Submission) -> Result<Value, ApiError> {
        let request = match submission {
            // Registration is public; it must not carry the admin token
            Submission::RegisterUser(payload) => self
                .http
                .post(self.endpoint("/auth/register")?)
                .header(ACCEPT, "application/json")
                .json(payload),
            Submission::UpdateUser { id, payload } => self
                .authed(Method::PATCH, self.row_url(ResourceKind::User, id, None)?)?
                .json(payload),
            Submission::CreateAudience(payload) => self
                .authed(Method::POST, self.endpoint(ResourceKind::Audience.collection_path())?)?
                .json(payload),
            Submission::UpdateAudience { id, payload } => self
                .authed(Method::PATCH, self.row_url(ResourceKind::Audience, id, None)?)?
                .json(payload),
            Submission::CreateNotification(payload) => self
                .authed(Method::POST, self.endpoint(payload.target.path())?)?
                .json(payload),
            Submission::UpdateNotification { id, payload } => self
                .authed(Method::PATCH, self.row_url(ResourceKind::Notification, id, None)?)?
                .json(payload),
            Submission::CreateSurvey(payload) => self
                .authed(Method::POST, self.endpoint(ResourceKind::Survey.collection_path())?)?
                .json(payload),
        };

        let created = self.send_json(request, submission.action())?;
        info!(action = submission.action(), "submitted");
        Ok(created)
    }

    fn server_time(&self) -> Result<ServerTime, ApiError> {
        let request = self
            .http
            .get(self.endpoint("/time")?)
            .header(ACCEPT, "application/json");
        let data = self.send_json(request, "Read server time")?;
        let local = Utc::now();

        let (now, tz) = mapping::server_time_from_response(&data)
            .ok_or_else(|| ApiError::Decode("server time missing or invalid".into()))?;
        Ok(ServerTime {
            now,
            tz,
            drift: now - local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_query_params() {
        let query = UserQuery {
            page: 0,
            limit: 20,
            search: Some("  ayla ".into()),
            role: Some("ADMIN".into()),
        };
        assert_eq!(
            query.params(),
            vec![
                ("page", "1".to_string()),
                ("limit", "20".to_string()),
                ("search", "ayla".to_string()),
                ("role", "ADMIN".to_string()),
            ]
        );

        let blank = UserQuery {
            page: 2,
            limit: 10,
            search: Some("   ".into()),
            role: None,
        };
        assert_eq!(blank.params().len(), 2);
    }

    #[test]
    fn test_feedback_query_params() {
        let query = FeedbackQuery {
            search: Some(" slow ".into()),
            rating: Some(2),
        };
        assert_eq!(
            query.params(),
            vec![("search", "slow".to_string()), ("rating", "2".to_string())]
        );
        assert!(FeedbackQuery::default().params().is_empty());
    }

    #[test]
    fn test_row_url_encodes_id() {
        let client = ApiClient::new("http://localhost:3000", None, Duration::from_secs(1)).unwrap();

        let url = client.row_url(ResourceKind::Audience, "a/b#c", None).unwrap();
        assert_eq!(url.path(), "/admin/audiences/a%2Fb%23c");
        assert_eq!(url.fragment(), None);

        let url = client
            .row_url(ResourceKind::Notification, "12?x=1", Some("send-now"))
            .unwrap();
        assert_eq!(url.path(), "/admin/notifications/12%3Fx=1/send-now");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_row_url_rejects_empty_id() {
        let client = ApiClient::new("http://localhost:3000", Some("tok".into()), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.row_url(ResourceKind::User, "  ", None),
            Err(ApiError::InvalidUrl(_))
        ));
        // nothing is sent for an id-less row
        assert!(matches!(
            client.delete(ResourceKind::User, ""),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_missing_token_is_no_session() {
        let client = ApiClient::new("http://localhost:3000/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert!(matches!(
            client.delete(ResourceKind::Audience, "1"),
            Err(ApiError::NoSession)
        ));
    }
}
