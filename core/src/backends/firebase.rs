//! Firebase Realtime Database over its REST API.
//!
//! Requests are authorised with an OAuth2 access token minted from a Google
//! service-account key: an RS256-signed JWT assertion is exchanged at the
//! key's `token_uri`, and the resulting token is cached until shortly before
//! it expires.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use super::{check_status, compare_child_keys, TreeBackend};

const TOKEN_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
/// Tokens are refreshed this long before the expiry the server reported.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account key file needed to mint access tokens.
#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading service account key {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing service account key {}", path.display()))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FirebaseClient {
    http: reqwest::Client,
    database_url: String,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl FirebaseClient {
    pub fn new(database_url: &str, key: ServiceAccountKey) -> Self {
        Self {
            http: reqwest::Client::new(),
            database_url: database_url.trim_end_matches('/').to_string(),
            key,
            token: Mutex::new(None),
        }
    }

    pub fn from_key_file(database_url: &str, key_path: &Path) -> Result<Self> {
        Ok(Self::new(database_url, ServiceAccountKey::from_file(key_path)?))
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    fn sign_assertion(&self, now_secs: u64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: TOKEN_SCOPES,
            aud: &self.key.token_uri,
            iat: now_secs,
            exp: now_secs + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("service account private key is not a valid RSA PEM")?;
        jsonwebtoken::encode(&header, &claims, &signing_key).context("signing token assertion")
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?
            .as_secs();
        let assertion = self.sign_assertion(now_secs)?;

        debug!("Requesting Firebase access token for {}", self.key.client_email);
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("requesting Firebase access token")?;
        let response =
            check_status(response, "Firebase", "token exchange", firebase_message).await?;
        let token: TokenResponse = response
            .json()
            .await
            .context("decoding Firebase token response")?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(token.access_token)
    }
}

/// Reads `{"error": "..."}` from the database and `{"error": {"message": ...}}`
/// from the token endpoint.
fn firebase_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        other => other.get("message").and_then(Value::as_str).map(str::to_string),
    }
}

/// Query parameters for one page of children ordered by key.
///
/// `startAt` is inclusive and takes a JSON value, so the cursor is quoted and
/// one extra child is requested to make up for the cursor coming back first.
pub fn page_query(after: Option<&str>, limit: usize) -> Vec<(&'static str, String)> {
    let mut query = vec![("orderBy", "\"$key\"".to_string())];
    match after {
        Some(cursor) => {
            query.push(("startAt", Value::String(cursor.to_string()).to_string()));
            query.push(("limitToFirst", (limit + 1).to_string()));
        }
        None => query.push(("limitToFirst", limit.to_string())),
    }
    query
}

/// Converts a REST query result into key-ordered children.
///
/// The REST API returns an unordered object, or an array when the keys are
/// dense integers. `startAt` is inclusive, so the cursor child is dropped here.
pub fn ordered_children(body: Value, after: Option<&str>, limit: usize) -> Result<Vec<(String, Value)>> {
    let mut children: Vec<(String, Value)> = match body {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index.to_string(), value))
            .collect(),
        other => bail!("unexpected Firebase query result: {other}"),
    };

    children.sort_by(|(a, _), (b, _)| compare_child_keys(a, b));
    if let Some(cursor) = after {
        children.retain(|(key, _)| compare_child_keys(key, cursor).is_gt());
    }
    children.truncate(limit);
    Ok(children)
}

#[async_trait]
impl TreeBackend for FirebaseClient {
    async fn update_children(&self, path: &str, children: Map<String, Value>) -> Result<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .patch(self.node_url(path))
            .query(&[("access_token", token.as_str()), ("print", "silent")])
            .json(&children)
            .send()
            .await
            .with_context(|| format!("Firebase PATCH {path}"))?;
        check_status(response, "Firebase", &format!("PATCH {path}"), firebase_message)
            .await?;
        Ok(())
    }

    async fn children_after(
        &self,
        path: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Value)>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.node_url(path))
            .query(&[("access_token", token.as_str())])
            .query(&page_query(after, limit))
            .send()
            .await
            .with_context(|| format!("Firebase GET {path}"))?;
        let response =
            check_status(response, "Firebase", &format!("GET {path}"), firebase_message)
                .await?;
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("decoding Firebase GET {path}"))?;
        ordered_children(body, after, limit)
    }

    async fn release(&self) {
        self.token.lock().await.take();
        info!("Firebase client released");
    }
}
