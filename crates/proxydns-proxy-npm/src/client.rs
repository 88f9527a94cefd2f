//! Authenticated HTTP client for the proxy manager API
//!
//! A bearer token is obtained lazily and reused across requests. When a
//! request comes back `401`, the token is dropped, a fresh one is obtained
//! and the request is retried exactly once. A second `401` is returned to
//! the caller as a status error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proxydns_core::traits::ProxyApi;
use proxydns_core::{Error, ProxyHost, Result};
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::payload::{ProxyHostPayload, TokenRequest, TokenResponse};

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROXY_HOSTS_ENDPOINT: &str = "/nginx/proxy-hosts";

/// Cached login
struct Session {
    token: String,
    expires: Option<DateTime<Utc>>,
}

/// Proxy manager API client
///
/// # Security
///
/// The Debug implementation does NOT expose the password or the token.
pub struct NpmClient {
    /// API root, e.g. `http://npm.lan:81/api`
    base_url: String,

    /// Login identity
    email: String,

    /// Login secret
    /// ⚠️ NEVER log this value
    password: String,

    /// Certificate attached to created hosts
    certificate_id: u64,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Current token, if logged in
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for NpmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"<REDACTED>")
            .field("certificate_id", &self.certificate_id)
            .finish()
    }
}

impl NpmClient {
    /// Create a client for the proxy manager at `host` (no scheme, optional port)
    pub fn new(
        host: &str,
        email: impl Into<String>,
        password: impl Into<String>,
        certificate_id: u64,
    ) -> Result<Self> {
        Self::with_base_url(format!("http://{}/api", host), email, password, certificate_id)
    }

    /// Create a client against an explicit API root
    pub fn with_base_url(
        base_url: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        certificate_id: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            password: password.into(),
            certificate_id,
            client,
            session: Mutex::new(None),
        })
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Expiry reported at the last login, if any
    pub async fn token_expires(&self) -> Option<DateTime<Utc>> {
        self.session.lock().await.as_ref().and_then(|s| s.expires)
    }

    /// `POST /tokens`
    async fn login(&self) -> Result<Session> {
        let url = format!("{}/tokens", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                identity: &self.email,
                secret: &self.password,
            })
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = error_body(response).await;
            tracing::error!(
                "Failed to authenticate with NPM API: {} {}",
                status.as_u16(),
                body
            );
            return Err(Error::auth(format!("status {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Unreadable token response: {}", e)))?;
        let expires = token.expires_at();
        match expires {
            Some(at) => tracing::debug!("NPM token valid until {}", at),
            None => tracing::debug!("NPM token expiry unknown"),
        }

        tracing::info!("Successfully authenticated with NPM API");
        Ok(Session {
            token: token.token,
            expires,
        })
    }

    /// Cached token, logging in first if there is none
    async fn bearer_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(existing) = session.as_ref() {
            return Ok(existing.token.clone());
        }
        let fresh = self.login().await?;
        let token = fresh.token.clone();
        *session = Some(fresh);
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.session.lock().await = None;
    }

    /// Authenticated request returning the response body
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&ProxyHostPayload>,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, endpoint);

        let token = self.bearer_token().await?;
        let response = self.send(&method, &url, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response).await;
        }

        tracing::info!("Token expired, refreshing...");
        self.invalidate().await;
        let token = self.bearer_token().await?;
        let response = self.send(&method, &url, body, &token).await?;
        read_body(response).await
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&ProxyHostPayload>,
        token: &str,
    ) -> Result<reqwest::Response> {
        tracing::debug!("{} {}", method, url);
        let mut request = self.client.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(map_request_error)
    }
}

fn map_request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(DEFAULT_HTTP_TIMEOUT)
    } else {
        Error::transport(format!("HTTP request failed: {}", e))
    }
}

async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::status(status.as_u16(), error_body(response).await));
    }
    response.text().await.map_err(map_request_error)
}

#[async_trait]
impl ProxyApi for NpmClient {
    /// `GET /nginx/proxy-hosts`
    async fn list_hosts(&self) -> Result<Vec<ProxyHost>> {
        let body = self.request(Method::GET, PROXY_HOSTS_ENDPOINT, None).await?;
        let hosts: Vec<ProxyHost> = serde_json::from_str(&body)?;
        Ok(hosts)
    }

    /// `POST /nginx/proxy-hosts`
    async fn create_host(
        &self,
        domain: &str,
        forward_host: &str,
        forward_port: u16,
    ) -> Result<ProxyHost> {
        let payload = ProxyHostPayload::new(domain, forward_host, forward_port, self.certificate_id);
        let body = self
            .request(Method::POST, PROXY_HOSTS_ENDPOINT, Some(&payload))
            .await?;
        let host: ProxyHost = serde_json::from_str(&body)?;
        Ok(host)
    }

    /// `DELETE /nginx/proxy-hosts/{id}`
    async fn delete_host(&self, id: u64) -> Result<()> {
        let endpoint = format!("{}/{}", PROXY_HOSTS_ENDPOINT, id);
        self.request(Method::DELETE, &endpoint, None).await?;
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "npm-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_host() {
        let client = NpmClient::new("npm.lan:81", "a@b.c", "pw", 1).unwrap();
        assert_eq!(client.base_url(), "http://npm.lan:81/api");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = NpmClient::with_base_url("http://127.0.0.1:9/api/", "a@b.c", "pw", 1).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9/api");
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let client = NpmClient::new("npm.lan", "admin@lan", "hunter2-secret", 1).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("hunter2-secret"));
        assert!(debug_str.contains("NpmClient"));
        assert!(debug_str.contains("admin@lan"));
    }

    #[tokio::test]
    async fn test_no_expiry_before_login() {
        let client = NpmClient::new("npm.lan", "a@b.c", "pw", 1).unwrap();
        assert!(client.token_expires().await.is_none());
    }
}
