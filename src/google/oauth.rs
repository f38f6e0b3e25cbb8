//! Mint Google OAuth access tokens from a credential file without any
//! user interaction. Two credential file shapes are supported, the
//! same ones `gcloud` writes out:
//!
//! - `service_account`: signs a JWT assertion with the private key
//! - `authorized_user`: exchanges a long lived refresh token

use std::path::Path;

use anyhow::{Context, Error, Result, bail};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
}

// Keep key material out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ServiceAccount { client_email, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_email", client_email)
                .finish_non_exhaustive(),
            Credentials::AuthorizedUser { client_id, .. } => f
                .debug_struct("AuthorizedUser")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid credential file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let creds: Credentials = serde_json::from_str(raw)?;
        Ok(creds)
    }

    /// Fetch a fresh access token for the calendar scope.
    pub async fn access_token(&self) -> Result<OAuthToken, Error> {
        match self {
            Credentials::ServiceAccount {
                client_email,
                private_key,
                token_uri,
            } => {
                let assertion = sign_assertion(client_email, private_key, token_uri)?;
                exchange_assertion(&assertion, token_uri).await
            }
            Credentials::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => refresh_access_token(client_id, client_secret, refresh_token, token_uri).await,
        }
    }
}

/// Build the RS256 signed JWT a service account trades for an access
/// token. Tokens are requested for one hour, the maximum Google
/// allows.
fn sign_assertion(client_email: &str, private_key: &str, token_uri: &str) -> Result<String> {
    let iat = Utc::now().timestamp();
    let claims = Claims {
        iss: client_email,
        scope: CALENDAR_SCOPE,
        aud: token_uri,
        iat,
        exp: iat + 3600,
    };
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .context("Service account private key is not a valid RSA PEM")?;
    let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)?;
    Ok(jwt)
}

async fn exchange_assertion(assertion: &str, token_uri: &str) -> Result<OAuthToken> {
    let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)];
    request_token(token_uri, &params).await
}

pub async fn refresh_access_token(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
    token_uri: &str,
) -> Result<OAuthToken> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    request_token(token_uri, &params).await
}

async fn request_token(token_uri: &str, params: &[(&str, &str)]) -> Result<OAuthToken> {
    let res = Client::new().post(token_uri).form(params).send().await?;
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        bail!("Token request failed: {} ({})", status, text);
    }
    let token: OAuthToken = serde_json::from_str(&text)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");

    #[test]
    fn test_parse_authorized_user() {
        let creds = Credentials::from_json(
            r#"{
                "type": "authorized_user",
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "shh",
                "refresh_token": "1//refresh"
            }"#,
        )
        .unwrap();
        match creds {
            Credentials::AuthorizedUser { token_uri, .. } => {
                assert_eq!(token_uri, DEFAULT_TOKEN_URI)
            }
            _ => panic!("Expected AuthorizedUser variant"),
        }
    }

    #[test]
    fn test_parse_service_account_ignores_extra_fields() {
        let raw = serde_json::json!({
            "type": "service_account",
            "project_id": "booker",
            "private_key_id": "abc",
            "private_key": TEST_KEY,
            "client_email": "booker@booker.iam.gserviceaccount.com",
            "token_uri": "https://oauth2.googleapis.com/token"
        })
        .to_string();
        let creds = Credentials::from_json(&raw).unwrap();
        assert!(matches!(creds, Credentials::ServiceAccount { .. }));
        // Private key must not leak through Debug
        assert!(!format!("{:?}", creds).contains("PRIVATE KEY"));
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = Credentials::from_json(r#"{"type": "external_account"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = Credentials::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read credential file"));
    }

    #[test]
    fn test_sign_assertion() {
        let jwt = sign_assertion("svc@example.com", TEST_KEY, DEFAULT_TOKEN_URI).unwrap();
        // header.payload.signature
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn test_sign_assertion_bad_key() {
        assert!(sign_assertion("svc@example.com", "not a key", DEFAULT_TOKEN_URI).is_err());
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.token", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create();

        let creds = Credentials::AuthorizedUser {
            client_id: "id".into(),
            client_secret: "secret".into(),
            refresh_token: "1//refresh".into(),
            token_uri: format!("{}/token", server.url()),
        };
        let token = creds.access_token().await.unwrap();

        mock.assert();
        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn test_service_account_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                JWT_BEARER_GRANT.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.svc", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create();

        let creds = Credentials::ServiceAccount {
            client_email: "svc@example.com".into(),
            private_key: TEST_KEY.into(),
            token_uri: format!("{}/token", server.url()),
        };
        let token = creds.access_token().await.unwrap();

        mock.assert();
        assert_eq!(token.access_token, "ya29.svc");
    }

    #[tokio::test]
    async fn test_token_request_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create();

        let err = refresh_access_token("id", "secret", "revoked", &format!("{}/token", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
