//! Survey drafts and the create payload sent to the backend
//!
//! The backend whitelists fields strictly: questions carry `text`, options
//! are objects with `text`, and audiences go in `audienceIds`. Drafts are
//! normalized before sending so blank entries never reach it.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Survey as written by the user (file or form)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurveyDraft {
    pub title: String,
    pub audience_ids: Vec<u64>,
    pub questions: Vec<DraftQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftQuestion {
    pub text: String,
    pub options: Vec<DraftOption>,
}

/// Options may be written as plain strings or `{ "text": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DraftOption {
    Text(String),
    Object { text: String },
}

impl DraftOption {
    fn text(&self) -> &str {
        match self {
            DraftOption::Text(text) | DraftOption::Object { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPayload {
    pub title: String,
    pub audience_ids: Vec<u64>,
    pub questions: Vec<PayloadQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadQuestion {
    pub text: String,
    pub options: Vec<PayloadOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadOption {
    pub text: String,
}

impl SurveyDraft {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read survey draft {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse survey draft {:?}", path))
    }

    /// Trim everything, drop blank options and questions left without options
    pub fn normalize(&self) -> SurveyPayload {
        let mut seen = HashSet::new();
        let audience_ids = self
            .audience_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let questions = self
            .questions
            .iter()
            .filter_map(|q| {
                let text = q.text.trim();
                let options: Vec<PayloadOption> = q
                    .options
                    .iter()
                    .map(|o| o.text().trim())
                    .filter(|t| !t.is_empty())
                    .map(|t| PayloadOption { text: t.to_string() })
                    .collect();

                if text.is_empty() || options.is_empty() {
                    return None;
                }
                Some(PayloadQuestion {
                    text: text.to_string(),
                    options,
                })
            })
            .collect();

        SurveyPayload {
            title: self.title.trim().to_string(),
            audience_ids,
            questions,
        }
    }
}

impl SurveyPayload {
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            bail!("Survey title is empty");
        }
        if self.audience_ids.is_empty() {
            bail!("Select at least one audience");
        }
        if self.questions.is_empty() {
            bail!("Add at least one question with a non-empty option");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_drops_blank_entries() {
        let draft: SurveyDraft = serde_json::from_value(json!({
            "title": "  Weekly mood ",
            "audienceIds": [3, 1, 3, 2, 1],
            "questions": [
                {"text": " How was your week? ", "options": ["Great", " ", {"text": " Meh "}]},
                {"text": "   ", "options": ["ignored"]},
                {"text": "No options left", "options": ["", "  "]}
            ]
        }))
        .unwrap();

        let payload = draft.normalize();
        assert_eq!(payload.title, "Weekly mood");
        assert_eq!(payload.audience_ids, vec![3, 1, 2]);
        assert_eq!(payload.questions.len(), 1);
        assert_eq!(payload.questions[0].text, "How was your week?");
        assert_eq!(
            payload.questions[0].options,
            vec![
                PayloadOption { text: "Great".into() },
                PayloadOption { text: "Meh".into() }
            ]
        );
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = SurveyDraft {
            title: "T".into(),
            audience_ids: vec![5],
            questions: vec![DraftQuestion {
                text: "Q".into(),
                options: vec![DraftOption::Text("A".into())],
            }],
        }
        .normalize();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "title": "T",
                "audienceIds": [5],
                "questions": [{"text": "Q", "options": [{"text": "A"}]}]
            })
        );
    }

    #[test]
    fn test_validate_requirements() {
        let empty = SurveyDraft::default().normalize();
        assert!(empty.validate().is_err());

        let no_questions = SurveyDraft {
            title: "T".into(),
            audience_ids: vec![1],
            questions: vec![],
        }
        .normalize();
        assert!(no_questions.validate().is_err());
    }
}
