//! Lenient decoding of backend list responses into rows
//!
//! The backend is not consistent about envelope shape or field names, so
//! every field is read from a list of aliases with a fallback value.

use crate::types::{
    preview, AudienceRow, FeedbackRow, NotificationRow, NotificationStatus, SurveyRow,
    SurveyStatus, UserRow,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde_json::Value;

/// One page of users plus the server-side totals
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub rows: Vec<UserRow>,
    pub total: u64,
    pub total_pages: u64,
}

/// Items of a list response: a bare array, or `items`/`data` inside an object
pub fn extract_list(data: &Value) -> &[Value] {
    if let Some(items) = data.as_array() {
        return items;
    }
    for key in ["items", "data"] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            return items;
        }
    }
    &[]
}

pub fn users_from_response(data: &Value) -> UserPage {
    let rows: Vec<UserRow> = extract_list(data).iter().map(user_from_value).collect();
    let total = data
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(rows.len() as u64);
    let total_pages = data
        .get("totalPages")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .max(1);

    UserPage { rows, total, total_pages }
}

pub fn audiences_from_response(data: &Value) -> Vec<AudienceRow> {
    extract_list(data).iter().map(audience_from_value).collect()
}

pub fn notifications_from_response(data: &Value, now: DateTime<Utc>) -> Vec<NotificationRow> {
    extract_list(data)
        .iter()
        .map(|n| notification_from_value(n, now))
        .collect()
}

pub fn surveys_from_response(data: &Value) -> Vec<SurveyRow> {
    extract_list(data).iter().map(survey_from_value).collect()
}

pub fn feedbacks_from_response(data: &Value) -> Vec<FeedbackRow> {
    extract_list(data).iter().map(feedback_from_value).collect()
}

/// Server clock from `GET /time`
pub fn server_time_from_response(data: &Value) -> Option<(DateTime<Utc>, Option<String>)> {
    let now = first_utc(data, &["now", "serverNow", "date"])?;
    let tz = first_str(data, &["tz"]).filter(|tz| !tz.trim().is_empty());
    Some((now, tz))
}

pub fn user_from_value(u: &Value) -> UserRow {
    let name = first_str(u, &["fullName"]).unwrap_or_else(|| {
        let joined = format!(
            "{} {}",
            first_str(u, &["firstName"]).unwrap_or_default(),
            first_str(u, &["lastName"]).unwrap_or_default()
        );
        let joined = joined.trim();
        if joined.is_empty() {
            "Unnamed user".to_string()
        } else {
            joined.to_string()
        }
    });

    let active = first_bool(u, &["isActive", "active"]).unwrap_or_else(|| {
        first_str(u, &["status"])
            .map(|s| s.eq_ignore_ascii_case("ACTIVE"))
            .unwrap_or(true)
    });

    UserRow {
        id: row_id(u, &["id", "userId"]),
        name,
        email: first_str(u, &["email"]).unwrap_or_else(|| "—".to_string()),
        role: first_str(u, &["role", "userRole"])
            .unwrap_or_else(|| "USER".to_string())
            .to_uppercase(),
        created_at: first_time(u, &["createdAt", "created_at", "joinedAt", "createdDate"]),
        active,
    }
}

pub fn audience_from_value(a: &Value) -> AudienceRow {
    AudienceRow {
        id: row_id(a, &["id", "audienceId"]),
        name: first_str(a, &["name"]).unwrap_or_else(|| "Unnamed audience".to_string()),
        description: first_str(a, &["description"]).unwrap_or_default(),
        user_count: first_u64(a, &["userCount"]),
        created_at: first_time(a, &["createdAt", "created_at", "createdDate"]),
    }
}

pub fn notification_from_value(n: &Value, now: DateTime<Utc>) -> NotificationRow {
    let body = first_str(n, &["body", "message", "content"]).unwrap_or_default();
    let backend_status = first_str(n, &["status"]).unwrap_or_else(|| "DRAFT".to_string());
    let send_at = first_utc(n, &["sendAt", "scheduledAt", "scheduleAt"]);
    let sent_at = first_utc(n, &["sentAt"]);
    let already_sent = !matches!(n.get("sentAt"), None | Some(Value::Null));

    NotificationRow {
        id: row_id(n, &["id", "notificationId"]),
        title: first_str(n, &["title"]).unwrap_or_else(|| "Untitled notification".to_string()),
        body_preview: preview(&body, 80),
        segment_name: first_str(n, &["segmentName", "segment", "audienceName"])
            .unwrap_or_else(|| "All users".to_string()),
        channel: first_str(n, &["channel"])
            .unwrap_or_else(|| "PUSH".to_string())
            .to_uppercase(),
        status: NotificationStatus::derive(&backend_status, send_at, already_sent, now),
        created_at: first_time(n, &["createdAt", "created_at", "createdDate"]),
        scheduled_at: send_at.map(|d| d.with_timezone(&Local)),
        sent_at: sent_at.map(|d| d.with_timezone(&Local)),
        sent_count: first_u64(n, &["totalSent", "sentCount", "requestedCount"]),
        delivered_count: first_u64(n, &["deliveredCount", "successCount"]),
        open_count: first_u64(n, &["openCount", "opens", "clickCount"]),
    }
}

pub fn survey_from_value(s: &Value) -> SurveyRow {
    let description = first_str(s, &["description", "desc", "note"]).unwrap_or_default();

    let audience_name = first_str(s, &["audienceName", "segmentName"])
        .or_else(|| s.get("audience").and_then(|a| first_str(a, &["name", "title"])))
        .unwrap_or_else(|| "All users".to_string());

    let question_count = first_u64_opt(s, &["questionCount", "questionsCount"]).unwrap_or_else(|| {
        s.get("questions")
            .and_then(Value::as_array)
            .map(|q| q.len() as u64)
            .unwrap_or(0)
    });

    SurveyRow {
        id: row_id(s, &["id", "surveyId"]),
        title: first_str(s, &["title"]).unwrap_or_else(|| "Untitled survey".to_string()),
        description_preview: preview(&description, 90),
        status: SurveyStatus::normalize(
            &first_str(s, &["status", "surveyStatus"]).unwrap_or_default(),
        ),
        audience_name,
        question_count,
        total_responses: first_u64(
            s,
            &["totalResponses", "responsesCount", "answerCount", "submissionsCount"],
        ),
        created_at: first_time(s, &["createdAt", "created_at", "createdDate"]),
        published_at: first_time(s, &["publishedAt", "sentAt", "activatedAt"]),
    }
}

pub fn feedback_from_value(f: &Value) -> FeedbackRow {
    let note = first_str(f, &["note", "message", "text"])
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "(no note)".to_string());

    let user = f.get("user").filter(|u| u.is_object());
    let user_name = user.and_then(|u| {
        let joined = format!(
            "{} {}",
            first_str(u, &["firstName"]).unwrap_or_default(),
            first_str(u, &["lastName"]).unwrap_or_default()
        );
        Some(joined.trim().to_string()).filter(|n| !n.is_empty())
    });

    let rating = match first_present(f, &["rating"]) {
        Some(Value::Number(n)) => n.as_u64().and_then(|r| u8::try_from(r).ok()),
        _ => None,
    };

    FeedbackRow {
        id: row_id(f, &["id"]),
        note_preview: preview(&note, 100),
        note,
        rating,
        user_email: user.and_then(|u| first_str(u, &["email"])),
        user_name,
        created_at: first_time(f, &["createdAt", "created_at", "createdDate"]),
    }
}

// Field helpers

fn first_present<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| v.get(*key))
        .find(|value| !value.is_null())
}

/// Empty when the backend sent no usable id; such rows take no actions
fn row_id(v: &Value, keys: &[&str]) -> String {
    first_str(v, keys)
        .map(|id| id.trim().to_string())
        .unwrap_or_default()
}

fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    match first_present(v, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_u64_opt(v: &Value, keys: &[&str]) -> Option<u64> {
    match first_present(v, keys)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first_u64(v: &Value, keys: &[&str]) -> u64 {
    first_u64_opt(v, keys).unwrap_or(0)
}

fn first_bool(v: &Value, keys: &[&str]) -> Option<bool> {
    first_present(v, keys)?.as_bool()
}

fn first_utc(v: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    parse_timestamp(first_present(v, keys)?)
}

fn first_time(v: &Value, keys: &[&str]) -> Option<DateTime<Local>> {
    first_utc(v, keys).map(|d| d.with_timezone(&Local))
}

/// RFC 3339 strings, plain dates, or epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|d| Utc.from_utc_datetime(&d))
                })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_extract_list_envelopes() {
        assert_eq!(extract_list(&json!([1, 2])).len(), 2);
        assert_eq!(extract_list(&json!({"items": [1]})).len(), 1);
        assert_eq!(extract_list(&json!({"data": [1, 2, 3]})).len(), 3);
        assert!(extract_list(&json!({"message": "nope"})).is_empty());
    }

    #[test]
    fn test_user_aliases_and_defaults() {
        let page = users_from_response(&json!({
            "items": [
                {"id": 7, "fullName": "Ayla Demir", "email": "ayla@x.io", "role": "admin", "isActive": false},
                {"userId": "u-8", "firstName": "Can", "lastName": "Kaya", "userRole": "user", "status": "active"},
                {"id": 9}
            ],
            "total": 42,
            "totalPages": 3
        }));

        assert_eq!(page.total, 42);
        assert_eq!(page.total_pages, 3);

        let ayla = &page.rows[0];
        assert_eq!(ayla.id, "7");
        assert_eq!(ayla.role, "ADMIN");
        assert!(!ayla.active);

        let can = &page.rows[1];
        assert_eq!(can.id, "u-8");
        assert_eq!(can.name, "Can Kaya");
        assert_eq!(can.role, "USER");
        assert!(can.active);

        let bare = &page.rows[2];
        assert_eq!(bare.id, "9");
        assert_eq!(bare.name, "Unnamed user");
        assert_eq!(bare.email, "—");
        assert!(bare.active);
    }

    #[test]
    fn test_user_page_totals_default_to_row_count() {
        let page = users_from_response(&json!([{"id": 1}, {"id": 2}]));
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_notification_mapping_derives_status() {
        let now = Utc::now();
        let future = (now + Duration::days(1)).to_rfc3339();
        let data = json!([
            {
                "notificationId": 3,
                "title": "Morning spark",
                "message": "x".repeat(120),
                "status": "PENDING",
                "sendAt": future,
                "totalSent": 10,
                "successCount": "8",
                "clickCount": 2
            },
            {"id": 4, "status": "SENT", "sentAt": now.to_rfc3339(), "channel": "email"}
        ]);

        let rows = notifications_from_response(&data, now);
        assert_eq!(rows[0].id, "3");
        assert_eq!(rows[0].status, NotificationStatus::Scheduled);
        assert_eq!(rows[0].body_preview.chars().count(), 80);
        assert_eq!(rows[0].segment_name, "All users");
        assert_eq!(rows[0].sent_count, 10);
        assert_eq!(rows[0].delivered_count, 8);
        assert_eq!(rows[0].open_count, 2);

        assert_eq!(rows[1].status, NotificationStatus::Sent);
        assert_eq!(rows[1].channel, "EMAIL");
        assert_eq!(rows[1].title, "Untitled notification");
    }

    #[test]
    fn test_survey_mapping() {
        let data = json!({"data": [
            {
                "surveyId": 11,
                "title": "Mood check",
                "status": "published",
                "audience": {"title": "Night owls"},
                "questions": [{"text": "a"}, {"text": "b"}],
                "answerCount": 5
            }
        ]});

        let rows = surveys_from_response(&data);
        assert_eq!(rows[0].id, "11");
        assert_eq!(rows[0].status, SurveyStatus::Active);
        assert_eq!(rows[0].audience_name, "Night owls");
        assert_eq!(rows[0].question_count, 2);
        assert_eq!(rows[0].total_responses, 5);
    }

    #[test]
    fn test_audience_mapping() {
        let rows = audiences_from_response(&json!([
            {"audienceId": 2, "userCount": 130, "createdDate": "2024-05-01"}
        ]));
        assert_eq!(rows[0].id, "2");
        assert_eq!(rows[0].name, "Unnamed audience");
        assert_eq!(rows[0].user_count, 130);
        assert!(rows[0].created_at.is_some());
    }

    #[test]
    fn test_missing_id_maps_to_empty() {
        let rows = audiences_from_response(&json!([{"name": "No id"}, {"id": null, "audienceId": " "}]));
        assert_eq!(rows[0].id, "");
        assert_eq!(rows[1].id, "");
    }

    #[test]
    fn test_feedback_mapping() {
        let rows = feedbacks_from_response(&json!({"items": [
            {
                "id": 1,
                "message": "  Great daily prompts  ",
                "rating": 5,
                "user": {"email": "ece@x.io", "firstName": "Ece", "lastName": "Yilmaz"},
                "created_at": "2024-06-01T09:00:00Z"
            },
            {"id": 2, "note": "y".repeat(150), "rating": "4"},
            {"text": "", "rating": 3.5}
        ]}));

        assert_eq!(rows[0].note, "Great daily prompts");
        assert_eq!(rows[0].rating, Some(5));
        assert_eq!(rows[0].user_email.as_deref(), Some("ece@x.io"));
        assert_eq!(rows[0].user_name.as_deref(), Some("Ece Yilmaz"));
        assert!(rows[0].created_at.is_some());

        assert_eq!(rows[1].note_preview.chars().count(), 100);
        assert_eq!(rows[1].rating, None);
        assert_eq!(rows[1].user_email, None);

        assert_eq!(rows[2].id, "");
        assert_eq!(rows[2].note, "(no note)");
        assert_eq!(rows[2].rating, None);
    }

    #[test]
    fn test_server_time_aliases() {
        let (now, tz) =
            server_time_from_response(&json!({"serverNow": "2025-01-01T10:00:00Z", "tz": "Europe/Istanbul"}))
                .unwrap();
        assert_eq!(now.to_rfc3339(), "2025-01-01T10:00:00+00:00");
        assert_eq!(tz.as_deref(), Some("Europe/Istanbul"));

        assert!(server_time_from_response(&json!({"date": "2025-01-01", "tz": " "})).unwrap().1.is_none());
        assert!(server_time_from_response(&json!({"now": "soon"})).is_none());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert!(parse_timestamp(&json!("2024-03-01T10:00:00Z")).is_some());
        assert!(parse_timestamp(&json!("2024-03-01")).is_some());
        assert!(parse_timestamp(&json!(1_700_000_000_000i64)).is_some());
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }
}
