//! Persisted OAuth token.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Result, SheetsError};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Token as stored in `token.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Body of a token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    /// Build a token from an endpoint response. A refresh response usually
    /// omits the refresh token, so the previous one is kept.
    pub(crate) fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => requested_scopes.to_vec(),
        };

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes,
        }
    }

    /// Load the token at `path`. A missing or unreadable file gives `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No stored token at {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring malformed token file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the token to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let store_error = |reason: String| SheetsError::TokenStore {
            path: path.to_path_buf(),
            reason,
        };

        let content = serde_json::to_string_pretty(self).map_err(|e| store_error(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| store_error(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| store_error(e.to_string()))
    }

    /// True while the access token can be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) < expiry,
            None => true,
        }
    }

    /// True when the token was granted every scope in `scopes`.
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|s| self.scopes.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

    fn token(expiry: Option<DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry,
            scopes: vec![SCOPE.to_string()],
        }
    }

    #[test]
    fn test_validity_with_skew() {
        let now = Utc::now();
        assert!(token(Some(now + Duration::minutes(10))).is_valid_at(now));
        assert!(!token(Some(now + Duration::seconds(30))).is_valid_at(now));
        assert!(!token(Some(now - Duration::minutes(1))).is_valid_at(now));
        assert!(token(None).is_valid_at(now));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let now = Utc::now();
        let response = TokenResponse {
            access_token: "new".to_string(),
            expires_in: Some(3599),
            refresh_token: None,
            token_type: Some("Bearer".to_string()),
            scope: None,
        };
        let refreshed = StoredToken::from_response(
            response,
            Some("1//refresh".to_string()),
            &[SCOPE.to_string()],
            now,
        );

        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(refreshed.expiry, Some(now + Duration::seconds(3599)));
        assert!(refreshed.covers(&[SCOPE.to_string()]));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth").join("token.json");
        let stored = token(Some(Utc::now()));

        stored.save(&path).unwrap();
        assert_eq!(StoredToken::load(&path), Some(stored));
    }

    #[test]
    fn test_malformed_or_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert_eq!(StoredToken::load(&path), None);

        std::fs::write(&path, "{broken").unwrap();
        assert_eq!(StoredToken::load(&path), None);
    }

    #[test]
    fn test_scope_coverage() {
        let t = token(None);
        assert!(t.covers(&[]));
        assert!(!t.covers(&["https://www.googleapis.com/auth/drive".to_string()]));
    }
}
