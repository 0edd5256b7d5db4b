//! Core data types for dailyspark-admin
//!
//! This module defines the rows shown in each list screen, the keys used to
//! track deferred actions on them, and the status enums derived from raw
//! backend fields.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    User,
    Audience,
    Notification,
    Survey,
    Feedback,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "User",
            ResourceKind::Audience => "Audience",
            ResourceKind::Notification => "Notification",
            ResourceKind::Survey => "Survey",
            ResourceKind::Feedback => "Feedback",
        }
    }

    /// REST collection path for this resource
    pub fn collection_path(&self) -> &'static str {
        match self {
            ResourceKind::User => "/mobile/users",
            ResourceKind::Audience => "/admin/audiences",
            ResourceKind::Notification => "/admin/notifications",
            ResourceKind::Survey => "/admin/surveys",
            ResourceKind::Feedback => "/admin/feedbacks",
        }
    }

    /// Feedback is read-only in the admin API
    pub fn deletable(&self) -> bool {
        !matches!(self, ResourceKind::Feedback)
    }

    /// Search and facet go to the server, so changing them refetches
    pub fn server_filtered(&self) -> bool {
        matches!(self, ResourceKind::User | ResourceKind::Feedback)
    }

    /// Parse a command-line resource name (`user`, `audiences`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().trim_end_matches('s') {
            "user" => Some(ResourceKind::User),
            "audience" => Some(ResourceKind::Audience),
            "notification" => Some(ResourceKind::Notification),
            "survey" => Some(ResourceKind::Survey),
            "feedback" => Some(ResourceKind::Feedback),
            _ => None,
        }
    }
}

/// Identifies one row across all list screens
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub kind: ResourceKind,
    pub id: String,
}

impl RowKey {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.as_str(), self.id)
    }
}

/// A registered mobile user
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: Option<DateTime<Local>>,
    pub active: bool,
}

impl UserRow {
    pub fn status_label(&self) -> &'static str {
        if self.active { "ACTIVE" } else { "PASSIVE" }
    }
}

/// A user segment
#[derive(Debug, Clone, PartialEq)]
pub struct AudienceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub user_count: u64,
    pub created_at: Option<DateTime<Local>>,
}

/// A push notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRow {
    pub id: String,
    pub title: String,
    pub body_preview: String,
    pub segment_name: String,
    pub channel: String,
    pub status: NotificationStatus,
    pub created_at: Option<DateTime<Local>>,
    pub scheduled_at: Option<DateTime<Local>>,
    pub sent_at: Option<DateTime<Local>>,
    pub sent_count: u64,
    pub delivered_count: u64,
    pub open_count: u64,
}

/// A multiple-choice survey
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRow {
    pub id: String,
    pub title: String,
    pub description_preview: String,
    pub status: SurveyStatus,
    pub audience_name: String,
    pub question_count: u64,
    pub total_responses: u64,
    pub created_at: Option<DateTime<Local>>,
    pub published_at: Option<DateTime<Local>>,
}

/// A note left by a mobile user, with an optional 1-5 rating
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub id: String,
    pub note: String,
    pub note_preview: String,
    pub rating: Option<u8>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub created_at: Option<DateTime<Local>>,
}

/// Display status of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Draft,
    Scheduled,
    Sent,
    Failed,
}

impl NotificationStatus {
    /// Derive the display status from raw backend fields.
    ///
    /// The backend only knows PENDING/SENT/FAILED; a PENDING notification with
    /// a future send time that has not gone out yet is shown as scheduled.
    pub fn derive(
        backend_status: &str,
        send_at: Option<DateTime<Utc>>,
        already_sent: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let is_future = send_at.is_some_and(|at| at > now);
        match backend_status.trim().to_uppercase().as_str() {
            "PENDING" if is_future && !already_sent => NotificationStatus::Scheduled,
            "SENT" => NotificationStatus::Sent,
            "FAILED" => NotificationStatus::Failed,
            _ => NotificationStatus::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Draft => "DRAFT",
            NotificationStatus::Scheduled => "SCHEDULED",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
        }
    }
}

/// Lifecycle status of a survey
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyStatus {
    Draft,
    Active,
    Archived,
    Other(String),
}

impl SurveyStatus {
    /// Fold the backend's synonyms into one status
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "" | "DRAFT" => SurveyStatus::Draft,
            "ACTIVE" | "PUBLISHED" | "LIVE" => SurveyStatus::Active,
            "ARCHIVED" | "INACTIVE" => SurveyStatus::Archived,
            _ => SurveyStatus::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SurveyStatus::Draft => "DRAFT",
            SurveyStatus::Active => "ACTIVE",
            SurveyStatus::Archived => "ARCHIVED",
            SurveyStatus::Other(s) => s,
        }
    }
}

/// Application tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Users,
    Audiences,
    Notifications,
    Surveys,
    Feedbacks,
    Settings,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[
            Tab::Users,
            Tab::Audiences,
            Tab::Notifications,
            Tab::Surveys,
            Tab::Feedbacks,
            Tab::Settings,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Users => 0,
            Tab::Audiences => 1,
            Tab::Notifications => 2,
            Tab::Surveys => 3,
            Tab::Feedbacks => 4,
            Tab::Settings => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Users => "Users",
            Tab::Audiences => "Audiences",
            Tab::Notifications => "Notifications",
            Tab::Surveys => "Surveys",
            Tab::Feedbacks => "Feedbacks",
            Tab::Settings => "Settings",
        }
    }

    /// Resource listed on this tab, if any
    pub fn resource(&self) -> Option<ResourceKind> {
        match self {
            Tab::Users => Some(ResourceKind::User),
            Tab::Audiences => Some(ResourceKind::Audience),
            Tab::Notifications => Some(ResourceKind::Notification),
            Tab::Surveys => Some(ResourceKind::Survey),
            Tab::Feedbacks => Some(ResourceKind::Feedback),
            Tab::Settings => None,
        }
    }
}

// Helper functions

/// Format an optional timestamp for table cells
pub fn format_date(date: Option<&DateTime<Local>>) -> String {
    date.map(|d| d.format("%d.%m.%y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten text to at most `max` characters, ending with an ellipsis
pub fn preview(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_notification_status_derivation() {
        let now = Utc::now();
        let future = Some(now + Duration::hours(2));
        let past = Some(now - Duration::hours(2));

        assert_eq!(
            NotificationStatus::derive("PENDING", future, false, now),
            NotificationStatus::Scheduled
        );
        assert_eq!(
            NotificationStatus::derive("pending", past, false, now),
            NotificationStatus::Draft
        );
        assert_eq!(
            NotificationStatus::derive("PENDING", future, true, now),
            NotificationStatus::Draft
        );
        assert_eq!(
            NotificationStatus::derive("SENT", None, true, now),
            NotificationStatus::Sent
        );
        assert_eq!(
            NotificationStatus::derive("FAILED", future, false, now),
            NotificationStatus::Failed
        );
        assert_eq!(
            NotificationStatus::derive("", None, false, now),
            NotificationStatus::Draft
        );
    }

    #[test]
    fn test_survey_status_normalize() {
        assert_eq!(SurveyStatus::normalize("published"), SurveyStatus::Active);
        assert_eq!(SurveyStatus::normalize("LIVE"), SurveyStatus::Active);
        assert_eq!(SurveyStatus::normalize("inactive"), SurveyStatus::Archived);
        assert_eq!(SurveyStatus::normalize(""), SurveyStatus::Draft);
        assert_eq!(
            SurveyStatus::normalize("closed"),
            SurveyStatus::Other("CLOSED".into())
        );
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 80), "short");
        let long = "a".repeat(100);
        let p = preview(&long, 80);
        assert_eq!(p.chars().count(), 80);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!(ResourceKind::parse("user"), Some(ResourceKind::User));
        assert_eq!(ResourceKind::parse("Audiences"), Some(ResourceKind::Audience));
        assert_eq!(ResourceKind::parse("notification"), Some(ResourceKind::Notification));
        assert_eq!(ResourceKind::parse("feedbacks"), Some(ResourceKind::Feedback));
        assert_eq!(ResourceKind::parse("segment"), None);
        assert!(!ResourceKind::Feedback.deletable());
        assert!(ResourceKind::Survey.deletable());
    }

    #[test]
    fn test_row_key_display() {
        let key = RowKey::new(ResourceKind::Audience, "12");
        assert_eq!(key.to_string(), "Audience#12");
    }
}
