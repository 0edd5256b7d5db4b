//! Stored login session
//!
//! The bearer token and the signed-in admin live in a small JSON file:
//! ~/.local/share/dailyspark-admin/session.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::io::Write;
use std::path::{Path, PathBuf};

/// Signed-in admin as returned by `/auth/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: serde_json::Value,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

impl Session {
    pub fn path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?
            .join("dailyspark-admin");
        Ok(data_dir.join("session.json"))
    }

    /// Load the stored session, `None` when nobody is logged in
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session from {:?}", path))?;

        let session: Session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session from {:?}", path))?;

        if session.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize session")?;

        write_private(path, content.as_bytes())
            .with_context(|| format!("Failed to write session to {:?}", path))?;

        Ok(())
    }

    /// Remove the stored session; true if one existed
    pub fn clear() -> Result<bool> {
        Self::clear_at(&Self::path()?)
    }

    pub fn clear_at(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session {:?}", path))?;
        Ok(true)
    }

    pub fn display_name(&self) -> &str {
        self.user
            .full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.user.email)
    }
}

/// Write a file only the owner can read; the token is a credential
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies when the file is created
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            token: "tok-123".into(),
            user: SessionUser {
                id: serde_json::json!(1),
                email: "admin@dailyspark.app".into(),
                full_name: Some("Ada Admin".into()),
                role: "ADMIN".into(),
            },
        }
    }

    #[test]
    fn test_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        assert_eq!(Session::load_from(&path).unwrap(), None);

        sample().save_to(&path).unwrap();
        assert_eq!(Session::load_from(&path).unwrap(), Some(sample()));

        assert!(Session::clear_at(&path).unwrap());
        assert!(!Session::clear_at(&path).unwrap());
        assert_eq!(Session::load_from(&path).unwrap(), None);
    }

    #[test]
    fn test_blank_token_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = sample();
        session.token = "  ".into();
        session.save_to(&path).unwrap();

        assert_eq!(Session::load_from(&path).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        // an existing world-readable file is tightened on save
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        sample().save_to(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(Session::load_from(&path).unwrap(), Some(sample()));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut session = sample();
        assert_eq!(session.display_name(), "Ada Admin");
        session.user.full_name = None;
        assert_eq!(session.display_name(), "admin@dailyspark.app");
    }
}
