//! Request and response bodies of the proxy manager API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/tokens`
#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub identity: &'a str,
    pub secret: &'a str,
}

/// Response of `POST /api/tokens`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub expires: Option<String>,
}

impl TokenResponse {
    /// Parsed expiry, if the server sent a readable one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Body of `POST /api/nginx/proxy-hosts`
///
/// Every created host gets the same fixed policy: plain HTTP upstream,
/// forced TLS with the configured certificate, HTTP/2 and websockets on,
/// no caching, no exploit blocking, no HSTS, no access list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyHostPayload {
    pub domain_names: Vec<String>,
    pub forward_scheme: &'static str,
    pub forward_host: String,
    pub forward_port: u16,
    pub access_list_id: u64,
    pub caching_enabled: bool,
    pub block_exploits: bool,
    pub allow_websocket_upgrade: bool,
    pub locations: Vec<Value>,
    pub certificate_id: u64,
    pub ssl_forced: bool,
    pub http2_support: bool,
    pub hsts_enabled: bool,
    pub hsts_subdomains: bool,
    pub advanced_config: String,
    pub meta: Map<String, Value>,
}

impl ProxyHostPayload {
    /// Single-domain host routed to `forward_host:forward_port`
    pub fn new(domain: &str, forward_host: &str, forward_port: u16, certificate_id: u64) -> Self {
        Self {
            domain_names: vec![domain.to_string()],
            forward_scheme: "http",
            forward_host: forward_host.to_string(),
            forward_port,
            access_list_id: 0,
            caching_enabled: false,
            block_exploits: false,
            allow_websocket_upgrade: true,
            locations: Vec::new(),
            certificate_id,
            ssl_forced: true,
            http2_support: true,
            hsts_enabled: false,
            hsts_subdomains: false,
            advanced_config: String::new(),
            meta: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_wire_shape() {
        let payload = ProxyHostPayload::new("grafana.lab.lan", "10.0.0.5", 3000, 7);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "domain_names": ["grafana.lab.lan"],
                "forward_scheme": "http",
                "forward_host": "10.0.0.5",
                "forward_port": 3000,
                "access_list_id": 0,
                "caching_enabled": false,
                "block_exploits": false,
                "allow_websocket_upgrade": true,
                "locations": [],
                "certificate_id": 7,
                "ssl_forced": true,
                "http2_support": true,
                "hsts_enabled": false,
                "hsts_subdomains": false,
                "advanced_config": "",
                "meta": {}
            })
        );
    }

    #[test]
    fn test_token_expiry_parsing() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"token":"abc","expires":"2026-01-02T03:04:05.000Z"}"#).unwrap();
        assert_eq!(
            parsed.expires_at().map(|ts| ts.to_rfc3339()),
            Some("2026-01-02T03:04:05+00:00".to_string())
        );

        let garbled: TokenResponse =
            serde_json::from_str(r#"{"token":"abc","expires":"tomorrow"}"#).unwrap();
        assert!(garbled.expires_at().is_none());

        let missing: TokenResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert!(missing.expires_at().is_none());
    }
}
