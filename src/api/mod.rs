//! DailySpark backend access
//!
//! This module handles everything that talks to or about the REST API:
//! - Session storage (bearer token and signed-in admin)
//! - The blocking HTTP client
//! - Lenient decoding of list responses into rows
//! - Create and edit forms, survey payload normalization

pub mod client;
pub mod error;
pub mod forms;
pub mod mapping;
pub mod session;
pub mod survey;

pub use client::{ApiClient, FeedbackQuery, UserQuery};
pub use error::ApiError;
pub use forms::{ServerTime, Submission};
pub use mapping::UserPage;
pub use session::Session;
pub use survey::SurveyDraft;

use crate::types::{AudienceRow, FeedbackRow, NotificationRow, ResourceKind, SurveyRow};
use serde_json::Value;

/// Remote operations the dashboard needs from the backend
pub trait AdminBackend: Send + Sync {
    fn list_users(&self, query: &UserQuery) -> Result<UserPage, ApiError>;
    fn list_audiences(&self) -> Result<Vec<AudienceRow>, ApiError>;
    fn list_notifications(&self) -> Result<Vec<NotificationRow>, ApiError>;
    fn list_surveys(&self) -> Result<Vec<SurveyRow>, ApiError>;
    fn list_feedbacks(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRow>, ApiError>;

    fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), ApiError>;
    fn set_user_status(&self, id: &str, active: bool) -> Result<(), ApiError>;
    fn resend_notification(&self, id: &str) -> Result<(), ApiError>;
    fn publish_survey(&self, id: &str) -> Result<(), ApiError>;
    fn archive_survey(&self, id: &str) -> Result<(), ApiError>;

    /// Create or update a resource; returns the backend's echo of it
    fn submit(&self, submission: &Submission) -> Result<Value, ApiError>;
    fn server_time(&self) -> Result<ServerTime, ApiError>;
}
