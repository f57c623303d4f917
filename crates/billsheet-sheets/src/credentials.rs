//! OAuth client secret file, as downloaded from the Google Cloud console.

use std::path::Path;

use serde::Deserialize;

use crate::{Result, SheetsError};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Client identity used for consent and token requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,

    /// Installed-app clients may omit the secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read a client secret file (`installed` or `web` layout).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SheetsError::Credentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, path)
    }

    /// Parse client secret JSON; `path` is only used in errors.
    pub fn from_json(content: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| SheetsError::Credentials {
            path: path.to_path_buf(),
            reason,
        };

        let file: SecretFile = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| invalid("expected an 'installed' or 'web' client".to_string()))?;

        if secret.client_id.trim().is_empty() {
            return Err(invalid("empty client_id".to_string()));
        }
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_installed_client() {
        let json = r#"{"installed":{"client_id":"123.apps.googleusercontent.com",
            "project_id":"bills","client_secret":"s3cret",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "token_uri":"https://oauth2.googleapis.com/token",
            "redirect_uris":["http://localhost"]}}"#;
        let secret = ClientSecret::from_json(json, Path::new("credentials.json")).unwrap();

        assert_eq!(secret.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secret.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(secret.redirect_uris, vec!["http://localhost".to_string()]);
    }

    #[test]
    fn test_web_client_with_defaults() {
        let secret =
            ClientSecret::from_json(r#"{"web":{"client_id":"abc"}}"#, Path::new("c.json")).unwrap();
        assert_eq!(secret.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(secret.client_secret, None);
    }

    #[test]
    fn test_rejects_other_layouts() {
        assert!(ClientSecret::from_json(r#"{"type":"service_account"}"#, Path::new("c.json")).is_err());
        assert!(ClientSecret::from_json("not json", Path::new("c.json")).is_err());
        assert!(ClientSecret::from_file(Path::new("/nonexistent/credentials.json")).is_err());
    }
}
