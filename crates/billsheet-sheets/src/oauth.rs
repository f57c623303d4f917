//! OAuth2 installed-app authorization: stored token, refresh, or browser
//! consent through a loopback redirect.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use billsheet_core::models::config::SheetsConfig;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::credentials::ClientSecret;
use crate::token::{StoredToken, TokenResponse};
use crate::{Result, SheetsError};

/// How long the loopback listener waits for the browser redirect.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const MAX_REQUEST_HEAD: usize = 16 * 1024;

const SUCCESS_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
    <p>You may close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
    <p>Check the terminal for details.</p></body></html>";

/// Obtains access tokens for the configured scopes.
pub struct Authenticator {
    http: reqwest::Client,
    credentials_path: PathBuf,
    token_path: PathBuf,
    scopes: Vec<String>,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl Authenticator {
    pub fn new(http: reqwest::Client, config: &SheetsConfig) -> Self {
        Self {
            http,
            credentials_path: config.credentials_path.clone(),
            token_path: config.token_path.clone(),
            scopes: config.scopes.clone(),
        }
    }

    /// A usable access token, refreshing or asking for consent as needed.
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.authorize(false).await?.access_token)
    }

    /// Return a usable token and persist it.
    ///
    /// The stored token is reused while valid and refreshed once expired.
    /// Consent runs only when neither works, or when `force_consent` is set.
    pub async fn authorize(&self, force_consent: bool) -> Result<StoredToken> {
        if !force_consent {
            if let Some(token) = self.stored_token().await? {
                return Ok(token);
            }
        }

        let secret = ClientSecret::from_file(&self.credentials_path)?;
        let token = self.consent(&secret).await?;
        token.save(&self.token_path)?;
        info!("Token saved to {}", self.token_path.display());
        Ok(token)
    }

    async fn stored_token(&self) -> Result<Option<StoredToken>> {
        let Some(token) = StoredToken::load(&self.token_path) else {
            return Ok(None);
        };

        if !token.covers(&self.scopes) {
            info!("Stored token does not cover the requested scopes");
            return Ok(None);
        }
        if token.is_valid_at(Utc::now()) {
            debug!("Using stored token from {}", self.token_path.display());
            return Ok(Some(token));
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            info!("Stored token expired and cannot be refreshed");
            return Ok(None);
        };

        let secret = ClientSecret::from_file(&self.credentials_path)?;
        match self.refresh(&secret, refresh_token).await {
            Ok(refreshed) => {
                refreshed.save(&self.token_path)?;
                info!("Access token refreshed");
                Ok(Some(refreshed))
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<StoredToken> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secret.client_id.as_str()),
        ];
        if let Some(client_secret) = &secret.client_secret {
            form.push(("client_secret", client_secret.as_str()));
        }

        let response = self.token_request(&secret.token_uri, &form).await?;
        Ok(StoredToken::from_response(
            response,
            Some(refresh_token.to_string()),
            &self.scopes,
            Utc::now(),
        ))
    }

    async fn consent(&self, secret: &ClientSecret) -> Result<StoredToken> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());

        let verifier = pkce_verifier();
        let state = Uuid::new_v4().simple().to_string();
        let url = authorization_url(
            secret,
            &self.scopes,
            &redirect_uri,
            &state,
            &pkce_challenge(&verifier),
        )
        .map_err(|e| SheetsError::Credentials {
            path: self.credentials_path.clone(),
            reason: format!("bad auth_uri: {}", e),
        })?;

        println!("Please visit this URL to authorize this application:\n{}", url);
        if let Err(e) = opener::open(url.as_str()) {
            warn!("Could not open a browser: {}", e);
        }

        let code = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_code(&listener, &state))
            .await
            .map_err(|_| SheetsError::Consent("timed out waiting for the browser".to_string()))??;
        debug!("Authorization code received");

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", secret.client_id.as_str()),
            ("code_verifier", verifier.as_str()),
        ];
        if let Some(client_secret) = &secret.client_secret {
            form.push(("client_secret", client_secret.as_str()));
        }

        let response = self.token_request(&secret.token_uri, &form).await?;
        Ok(StoredToken::from_response(response, None, &self.scopes, Utc::now()))
    }

    async fn token_request(&self, uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(uri).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// PKCE S256 code challenge for `verifier`.
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn pkce_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn authorization_url(
    secret: &ClientSecret,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> std::result::Result<Url, url::ParseError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
}

async fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        debug!("Loopback connection from {}", peer);

        let head = read_request_head(&mut stream).await?;
        let request_line = head.lines().next().unwrap_or_default();

        match parse_callback(request_line, state) {
            Ok(Some(code)) => {
                respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                return Ok(code);
            }
            Ok(None) => respond(&mut stream, "404 Not Found", "").await,
            Err(e) => {
                respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
                return Err(e);
            }
        }
    }
}

async fn read_request_head(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer loopback request: {}", e);
    }
}

/// Read the authorization code from the redirect's request line.
///
/// Requests without a `code` (a favicon fetch, say) give `None`.
fn parse_callback(request_line: &str, expected_state: &str) -> Result<Option<String>> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| SheetsError::Consent(format!("malformed redirect: {:?}", request_line)))?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| SheetsError::Consent(format!("malformed redirect: {}", e)))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(SheetsError::Consent(format!("consent refused: {}", error)));
    }
    let Some(code) = params.get("code") else {
        return Ok(None);
    };
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(SheetsError::Consent("state mismatch in redirect".to_string()));
    }
    Ok(Some(code.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pkce_challenge_rfc7636() {
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pkce_verifier_length() {
        let verifier = pkce_verifier();
        assert!((43..=128).contains(&verifier.len()));
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_parse_callback() {
        let code = parse_callback("GET /?state=xyz&code=4%2F0Adeu&scope=s HTTP/1.1", "xyz").unwrap();
        assert_eq!(code.as_deref(), Some("4/0Adeu"));

        assert_eq!(parse_callback("GET /favicon.ico HTTP/1.1", "xyz").unwrap(), None);
        assert!(parse_callback("GET /?code=abc&state=other HTTP/1.1", "xyz").is_err());
        assert!(parse_callback("GET /?error=access_denied&state=xyz HTTP/1.1", "xyz").is_err());
        assert!(parse_callback("", "xyz").is_err());
    }

    #[test]
    fn test_authorization_url() {
        let secret = ClientSecret {
            client_id: "id.apps".to_string(),
            client_secret: None,
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uris: vec![],
        };
        let url = authorization_url(
            &secret,
            &["https://www.googleapis.com/auth/spreadsheets".to_string()],
            "http://127.0.0.1:8085/",
            "st",
            "ch",
        )
        .unwrap();

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "id.apps");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8085/");
        assert_eq!(params["scope"], "https://www.googleapis.com/auth/spreadsheets");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], "st");
    }
}
