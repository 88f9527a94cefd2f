//! Server-block template rendering
//!
//! Placeholders are plain `{{name}}` tokens replaced verbatim:
//! `{{domain}}`, `{{hostname}}`, `{{forward_host}}`, `{{forward_port}}`
//! and `{{description}}` (falls back to the hostname).

use proxydns_core::{Error, Result, ServiceSpec};
use std::path::Path;

/// First line of every generated file; only files carrying it are ever pruned
pub const MANAGED_MARKER: &str = "# Managed by proxydns - changes will be overwritten";

const BUILTIN_TEMPLATE: &str = r#"# {{description}}
server {
    listen 80;
    listen [::]:80;
    server_name {{domain}};

    location / {
        proxy_pass http://{{forward_host}}:{{forward_port}};
        proxy_http_version 1.1;
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection "upgrade";
    }
}
"#;

/// A loaded config template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTemplate {
    text: String,
}

impl ConfigTemplate {
    /// The built-in nginx server block
    pub fn builtin() -> Self {
        Self::from_text(BUILTIN_TEMPLATE)
    }

    /// Template from literal text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a template file
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!(
                "Cannot read config template {}: {}",
                path.display(),
                e
            ))
        })?;
        if !text.contains("{{domain}}") {
            tracing::warn!(
                "Config template {} has no {{{{domain}}}} placeholder",
                path.display()
            );
        }
        Ok(Self::from_text(text))
    }

    /// Render the file contents for one service
    pub fn render(&self, service: &ServiceSpec, domain: &str) -> String {
        // Keep the description on one line so it can't break out of a comment
        let description = service
            .description
            .as_deref()
            .unwrap_or(&service.hostname)
            .replace(['\r', '\n'], " ");

        let body = self
            .text
            .replace("{{domain}}", domain)
            .replace("{{hostname}}", &service.hostname)
            .replace("{{forward_host}}", &service.backend_address)
            .replace("{{forward_port}}", &service.backend_port.to_string())
            .replace("{{description}}", &description);

        format!("{}\n{}", MANAGED_MARKER, body)
    }
}
