//! Create and edit forms for users, audiences and notifications
//!
//! Forms are written as JSON drafts, the same way survey drafts are. Each
//! draft is trimmed into the exact payload the backend whitelists, then
//! validated before anything is sent.

use super::survey::SurveyPayload;
use crate::types::ResourceKind;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::Path;

pub const ROLES: &[&str] = &["USER", "ADMIN"];
pub const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER", "PREFER_NOT_TO_SAY"];
pub const MIN_PASSWORD_LEN: usize = 6;
pub const NOTIFICATION_BODY_MAX: usize = 240;

/// Read a JSON draft from disk
pub fn read_draft<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read draft {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse draft {:?}", path))
}

/// A validated write request, ready for the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    RegisterUser(RegisterPayload),
    UpdateUser { id: String, payload: UserUpdate },
    CreateAudience(AudiencePayload),
    UpdateAudience { id: String, payload: AudiencePayload },
    CreateNotification(NotificationPayload),
    UpdateNotification { id: String, payload: NotificationUpdate },
    CreateSurvey(SurveyPayload),
}

impl Submission {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Submission::RegisterUser(_) | Submission::UpdateUser { .. } => ResourceKind::User,
            Submission::CreateAudience(_) | Submission::UpdateAudience { .. } => {
                ResourceKind::Audience
            }
            Submission::CreateNotification(_) | Submission::UpdateNotification { .. } => {
                ResourceKind::Notification
            }
            Submission::CreateSurvey(_) => ResourceKind::Survey,
        }
    }

    /// Action name used in logs and fallback error messages
    pub fn action(&self) -> &'static str {
        match self {
            Submission::RegisterUser(_) => "Create user",
            Submission::UpdateUser { .. } => "Update user",
            Submission::CreateAudience(_) => "Create audience",
            Submission::UpdateAudience { .. } => "Update audience",
            Submission::CreateNotification(_) => "Create notification",
            Submission::UpdateNotification { .. } => "Update notification",
            Submission::CreateSurvey(_) => "Create survey",
        }
    }
}

// === USERS ===

/// New user as written in a draft; the password may be prompted for
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserDraft {
    pub email: String,
    pub password: Option<String>,
    pub full_name: String,
    pub role: Option<String>,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

impl UserDraft {
    pub fn normalize(&self, password: String) -> RegisterPayload {
        RegisterPayload {
            email: self.email.trim().to_string(),
            password,
            full_name: self.full_name.trim().to_string(),
            role: normalize_role(self.role.as_deref()),
        }
    }
}

impl RegisterPayload {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.full_name.is_empty() {
            bail!("Full name is empty");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
        }
        validate_role(&self.role)
    }
}

/// Changes to an existing user; blank fields are sent as null
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserEditDraft {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
}

/// Body of `PATCH /mobile/users/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
}

impl UserEditDraft {
    pub fn normalize(&self) -> Result<UserUpdate> {
        // A missing role would silently demote admins
        let Some(role) = self.role.as_deref().filter(|r| !r.trim().is_empty()) else {
            bail!("Role is required when editing a user");
        };

        Ok(UserUpdate {
            full_name: non_blank(self.full_name.as_deref()),
            email: non_blank(self.email.as_deref()),
            role: normalize_role(Some(role)),
            birth_year: self.birth_year,
            gender: non_blank(self.gender.as_deref()).map(|g| g.to_uppercase()),
        })
    }
}

impl UserUpdate {
    pub fn validate(&self, today: DateTime<Local>) -> Result<()> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        validate_role(&self.role)?;
        if let Some(gender) = &self.gender {
            if !GENDERS.contains(&gender.as_str()) {
                bail!("Gender must be one of {}", GENDERS.join(", "));
            }
        }
        if let Some(year) = self.birth_year {
            if !(1900..=today.year()).contains(&year) {
                bail!("Birth year {} is out of range", year);
            }
        }
        Ok(())
    }
}

fn normalize_role(role: Option<&str>) -> String {
    role.map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("USER")
        .to_uppercase()
}

fn validate_role(role: &str) -> Result<()> {
    if !ROLES.contains(&role) {
        bail!("Role must be one of {}", ROLES.join(", "));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        bail!("\"{}\" is not an email address", email);
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// === AUDIENCES ===

/// Field an audience rule can match on; `values` is None for free text
struct RuleField {
    name: &'static str,
    values: Option<&'static [&'static str]>,
}

const RULE_FIELDS: &[RuleField] = &[
    RuleField {
        name: "gender",
        values: Some(&["MALE", "FEMALE", "OTHER"]),
    },
    RuleField {
        name: "city",
        values: None,
    },
    RuleField {
        name: "interests",
        values: Some(&[
            "PERSONAL_DEVELOPMENT",
            "RELATIONSHIPS_PSYCHOLOGY",
            "BUSINESS_ENTREPRENEURSHIP",
            "FITNESS_HEALTH",
            "FOOD_LIFESTYLE",
            "FINANCE_INVESTING",
            "FASHION_STYLE",
            "TECHNOLOGY",
            "MINIMALISM",
            "MOTIVATION_HABITS",
        ]),
    },
    RuleField {
        name: "stressLevel",
        values: Some(&["LOW", "MEDIUM", "HIGH"]),
    },
    RuleField {
        name: "primaryGoal",
        values: Some(&[
            "SELF_IMPROVEMENT",
            "MORE_MONEY",
            "BETTER_RELATIONSHIP",
            "BETTER_APPEARANCE",
            "HEALTHIER",
            "CAREER_ADVANCEMENT",
            "QUIT_BAD_HABITS",
        ]),
    },
];

const ENUM_OPERATORS: &[&str] = &["EQUALS", "NOT_EQUALS", "CONTAINS"];
const TEXT_OPERATORS: &[&str] = &["EQUALS", "CONTAINS"];

/// Audience as written in a draft, for both create and edit
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudienceDraft {
    pub name: String,
    pub description: String,
    pub rules: Vec<AudienceRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceRule {
    pub field: String,
    pub operator: String,
    pub value: String,
}

/// Body of `POST /admin/audiences` and `PATCH /admin/audiences/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudiencePayload {
    pub name: String,
    pub description: String,
    pub rules: Vec<AudienceRule>,
}

impl AudienceDraft {
    /// Trim everything and upper-case operators and enum values
    pub fn normalize(&self) -> AudiencePayload {
        let rules = self
            .rules
            .iter()
            .map(|rule| {
                let field = rule.field.trim().to_string();
                let is_enum = RULE_FIELDS
                    .iter()
                    .any(|f| f.name == field && f.values.is_some());
                let value = rule.value.trim();
                AudienceRule {
                    operator: rule.operator.trim().to_uppercase(),
                    value: if is_enum { value.to_uppercase() } else { value.to_string() },
                    field,
                }
            })
            .collect();

        AudiencePayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            rules,
        }
    }
}

impl AudiencePayload {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("Audience name is empty");
        }

        for (i, rule) in self.rules.iter().enumerate() {
            let n = i + 1;
            let Some(field) = RULE_FIELDS.iter().find(|f| f.name == rule.field) else {
                let names: Vec<&str> = RULE_FIELDS.iter().map(|f| f.name).collect();
                bail!(
                    "Rule {}: unknown field \"{}\" (expected one of {})",
                    n,
                    rule.field,
                    names.join(", ")
                );
            };

            let operators = if field.values.is_some() { ENUM_OPERATORS } else { TEXT_OPERATORS };
            if !operators.contains(&rule.operator.as_str()) {
                bail!(
                    "Rule {}: {} supports {}",
                    n,
                    field.name,
                    operators.join(", ")
                );
            }

            if rule.value.is_empty() {
                bail!("Rule {}: value is empty", n);
            }
            if let Some(values) = field.values {
                if !values.contains(&rule.value.as_str()) {
                    bail!("Rule {}: {} must be one of {}", n, field.name, values.join(", "));
                }
            }
        }
        Ok(())
    }
}

// === NOTIFICATIONS ===

/// Notification as written in a draft.
///
/// `sendAt` is RFC 3339, or `YYYY-MM-DD HH:MM` in local time; leave it
/// out to send immediately. Edits ignore the target fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub audience_id: Option<u64>,
    pub user_ids: Vec<u64>,
    pub send_at: Option<String>,
}

/// Who receives a new notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NotificationTarget {
    #[serde(rename = "audienceId")]
    Audience(u64),
    #[serde(rename = "userIds")]
    Users(Vec<u64>),
}

impl NotificationTarget {
    /// Endpoint that accepts this target
    pub fn path(&self) -> &'static str {
        match self {
            NotificationTarget::Audience(_) => "/admin/notifications",
            NotificationTarget::Users(_) => "/admin/notifications/send-to-users",
        }
    }
}

/// Body of a notification create request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "iso_millis")]
    pub send_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub target: NotificationTarget,
}

/// Body of `PATCH /admin/notifications/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdate {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "iso_millis")]
    pub send_at: Option<DateTime<Utc>>,
}

impl NotificationDraft {
    pub fn to_create(&self) -> Result<NotificationPayload> {
        let target = match (self.audience_id, self.user_ids.is_empty()) {
            (Some(id), true) => NotificationTarget::Audience(id),
            (None, false) => NotificationTarget::Users(self.user_ids.clone()),
            (Some(_), false) => bail!("Pick either audienceId or userIds, not both"),
            (None, true) => bail!("Pick a target: audienceId or userIds"),
        };

        Ok(NotificationPayload {
            title: self.title.trim().to_string(),
            body: self.body.trim().to_string(),
            send_at: self.schedule()?,
            target,
        })
    }

    pub fn to_update(&self) -> Result<NotificationUpdate> {
        Ok(NotificationUpdate {
            title: self.title.trim().to_string(),
            body: self.body.trim().to_string(),
            send_at: self.schedule()?,
        })
    }

    fn schedule(&self) -> Result<Option<DateTime<Utc>>> {
        match self.send_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => parse_send_at(raw)
                .map(Some)
                .with_context(|| format!("\"{}\" is not a valid date and time", raw)),
        }
    }
}

impl NotificationPayload {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        validate_message(&self.title, &self.body, self.send_at, now)
    }
}

impl NotificationUpdate {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        validate_message(&self.title, &self.body, self.send_at, now)
    }
}

fn validate_message(
    title: &str,
    body: &str,
    send_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<()> {
    if title.is_empty() {
        bail!("Notification title is empty");
    }
    if body.is_empty() {
        bail!("Notification body is empty");
    }
    let len = body.chars().count();
    if len > NOTIFICATION_BODY_MAX {
        bail!(
            "Notification body is {} characters (max {})",
            len,
            NOTIFICATION_BODY_MAX
        );
    }
    if let Some(at) = send_at {
        if at <= now {
            bail!("Scheduled time {} is not in the future", at.to_rfc3339());
        }
    }
    Ok(())
}

/// RFC 3339, or a local `YYYY-MM-DD HH:MM` / `YYYY-MM-DDTHH:MM`
fn parse_send_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))?;
    match Local.from_local_datetime(&naive).earliest() {
        Some(at) => Ok(at.with_timezone(&Utc)),
        None => bail!("{} does not exist in the local time zone", raw),
    }
}

/// Same shape as a browser's `toISOString`
fn iso_millis<S: Serializer>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_none(),
    }
}

/// Server clock as reported by `GET /time`
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTime {
    pub now: DateTime<Utc>,
    pub tz: Option<String>,
    /// Server minus local clock, measured when the answer arrived
    pub drift: chrono::Duration,
}

impl ServerTime {
    pub fn drift_minutes(&self) -> i64 {
        (self.drift.num_seconds().abs() + 30) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn register(password: &str) -> RegisterPayload {
        UserDraft {
            email: "  deniz@dailyspark.app ".into(),
            password: None,
            full_name: " Deniz Aksoy ".into(),
            role: None,
        }
        .normalize(password.into())
    }

    #[test]
    fn test_register_payload() {
        let payload = register("secret1");
        assert_eq!(payload.email, "deniz@dailyspark.app");
        assert_eq!(payload.role, "USER");
        assert!(payload.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "email": "deniz@dailyspark.app",
                "password": "secret1",
                "fullName": "Deniz Aksoy",
                "role": "USER"
            })
        );

        assert!(register("12345").validate().is_err());

        let mut bad = register("secret1");
        bad.email = "deniz".into();
        assert!(bad.validate().is_err());

        bad = register("secret1");
        bad.role = "OWNER".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_user_update_sends_nulls() {
        let draft: UserEditDraft = serde_json::from_value(json!({
            "fullName": "  ",
            "role": "admin",
            "gender": "female",
            "birthYear": 1994
        }))
        .unwrap();
        let update = draft.normalize().unwrap();
        assert!(update.validate(Local::now()).is_ok());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "fullName": null,
                "email": null,
                "role": "ADMIN",
                "birthYear": 1994,
                "gender": "FEMALE"
            })
        );
    }

    #[test]
    fn test_user_update_validation() {
        assert!(UserEditDraft::default().normalize().is_err());

        let mut update = UserEditDraft {
            role: Some("USER".into()),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert!(update.validate(Local::now()).is_ok());

        update.gender = Some("ROBOT".into());
        assert!(update.validate(Local::now()).is_err());

        update.gender = Some("PREFER_NOT_TO_SAY".into());
        update.birth_year = Some(Local::now().year() + 1);
        assert!(update.validate(Local::now()).is_err());
    }

    #[test]
    fn test_audience_rules() {
        let draft: AudienceDraft = serde_json::from_value(json!({
            "name": " Stressed founders ",
            "rules": [
                {"field": "stressLevel", "operator": "equals", "value": " high "},
                {"field": "city", "operator": "CONTAINS", "value": " Izmir "}
            ]
        }))
        .unwrap();
        let payload = draft.normalize();
        assert_eq!(payload.name, "Stressed founders");
        assert_eq!(payload.rules[0].value, "HIGH");
        assert_eq!(payload.rules[0].operator, "EQUALS");
        assert_eq!(payload.rules[1].value, "Izmir");
        assert!(payload.validate().is_ok());

        let mut text_not_equals = payload.clone();
        text_not_equals.rules[1].operator = "NOT_EQUALS".into();
        assert!(text_not_equals.validate().is_err());

        let mut unknown_value = payload.clone();
        unknown_value.rules[0].value = "EXTREME".into();
        assert!(unknown_value.validate().is_err());

        let mut unknown_field = payload.clone();
        unknown_field.rules[0].field = "age".into();
        let err = unknown_field.validate().unwrap_err().to_string();
        assert!(err.contains("unknown field \"age\""));

        let mut empty = payload;
        empty.rules[1].value.clear();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_notification_targets() {
        let draft = NotificationDraft {
            title: " Morning spark ".into(),
            body: "Take five minutes for yourself".into(),
            audience_id: Some(3),
            ..Default::default()
        };
        let payload = draft.to_create().unwrap();
        assert_eq!(payload.target.path(), "/admin/notifications");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "title": "Morning spark",
                "body": "Take five minutes for yourself",
                "audienceId": 3
            })
        );

        let direct = NotificationDraft {
            audience_id: None,
            user_ids: vec![42],
            ..draft.clone()
        };
        let payload = direct.to_create().unwrap();
        assert_eq!(payload.target.path(), "/admin/notifications/send-to-users");
        assert_eq!(serde_json::to_value(&payload).unwrap()["userIds"], json!([42]));

        let both = NotificationDraft {
            user_ids: vec![42],
            ..draft.clone()
        };
        assert!(both.to_create().is_err());
        assert!(NotificationDraft::default().to_create().is_err());
    }

    #[test]
    fn test_notification_schedule_against_server_clock() {
        let server_now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut draft = NotificationDraft {
            title: "Reminder".into(),
            body: "Journal tonight".into(),
            audience_id: Some(1),
            send_at: Some("2025-03-01T12:30:00Z".into()),
            ..Default::default()
        };

        let payload = draft.to_create().unwrap();
        assert!(payload.validate(server_now).is_ok());
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["sendAt"],
            json!("2025-03-01T12:30:00.000Z")
        );

        // the local clock may be ahead; the server decides what is past
        assert!(payload.validate(server_now + Duration::hours(1)).is_err());

        draft.send_at = Some("next tuesday".into());
        assert!(draft.to_update().is_err());

        draft.send_at = Some("2025-03-01 18:45".into());
        assert!(draft.to_update().unwrap().send_at.is_some());
    }

    #[test]
    fn test_notification_body_limit() {
        let update = NotificationDraft {
            title: "Long".into(),
            body: "x".repeat(NOTIFICATION_BODY_MAX + 1),
            ..Default::default()
        }
        .to_update()
        .unwrap();
        assert!(update.validate(Utc::now()).is_err());

        let ok = NotificationUpdate {
            body: "x".repeat(NOTIFICATION_BODY_MAX),
            ..update
        };
        assert!(ok.validate(Utc::now()).is_ok());
        assert!(serde_json::to_value(&ok).unwrap().get("sendAt").is_none());
    }

    #[test]
    fn test_read_draft_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audience.json");
        fs::write(&path, r#"{"name": "Night owls", "rules": []}"#).unwrap();

        let draft: AudienceDraft = read_draft(&path).unwrap();
        assert_eq!(draft.name, "Night owls");
        assert!(read_draft::<AudienceDraft>(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_server_drift_minutes() {
        let time = ServerTime {
            now: Utc::now(),
            tz: None,
            drift: Duration::seconds(-150),
        };
        assert_eq!(time.drift_minutes(), 3);
    }
}
