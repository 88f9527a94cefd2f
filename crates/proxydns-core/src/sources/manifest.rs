// # Manifest Service Source
//
// Reads a JSON manifest:
//
// ```json
// {
//   "services": [
//     {
//       "domain_names": ["grafana", "metrics"],
//       "forward_host": "10.0.0.5",
//       "forward_port": 3000,
//       "description": "Dashboards"
//     }
//   ]
// }
// ```
//
// Every name in `domain_names` becomes its own `ServiceSpec`. `forward_port`
// may be a number or a numeric string. Entries are validated one by one;
// a bad entry is skipped and the rest of the file still loads. A missing
// file or malformed JSON is an error for the whole source.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::{ServiceSpec, parse_port, validate_label};
use crate::traits::ServiceSource;
use crate::{Error, Result};

/// Service source over a JSON manifest file
#[derive(Debug, Clone)]
pub struct ManifestServiceSource {
    path: PathBuf,
}

impl ManifestServiceSource {
    /// Create a source reading `path` on every load
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Manifest location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ServiceSource for ManifestServiceSource {
    async fn load(&self) -> Result<Vec<ServiceSpec>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::manifest(format!(
                "Failed to read manifest {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let services = parse_manifest(&text)?;
        info!(
            "Loaded {} service(s) from {}",
            services.len(),
            self.path.display()
        );
        Ok(services)
    }

    fn source_name(&self) -> &'static str {
        "manifest"
    }
}

/// Parse manifest text into services, skipping invalid entries
pub fn parse_manifest(text: &str) -> Result<Vec<ServiceSpec>> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| Error::manifest(format!("Malformed manifest JSON: {}", e)))?;

    let entries = document
        .get("services")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::manifest("Manifest has no 'services' list"))?;

    let mut services = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry) {
            Ok(mut expanded) => services.append(&mut expanded),
            Err(e) => warn!("Skipping manifest entry #{}: {}", index, e),
        }
    }

    Ok(services)
}

fn parse_entry(entry: &Value) -> Result<Vec<ServiceSpec>> {
    let names = entry
        .get("domain_names")
        .and_then(Value::as_array)
        .filter(|names| !names.is_empty())
        .ok_or_else(|| Error::invalid_input("missing or empty 'domain_names'"))?;

    let forward_host = entry
        .get("forward_host")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::invalid_input("missing 'forward_host'"))?;

    let forward_port = entry
        .get("forward_port")
        .ok_or_else(|| Error::invalid_input("missing 'forward_port'"))
        .and_then(coerce_port)?;

    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut services = Vec::with_capacity(names.len());
    for name in names {
        let Some(name) = name.as_str().map(str::trim) else {
            warn!("Skipping non-string domain name: {}", name);
            continue;
        };

        if let Err(e) = validate_label(name) {
            warn!("Skipping domain name '{}': {}", name, e);
            continue;
        }

        let mut spec = ServiceSpec::new(name, forward_host, forward_port);
        spec.description = description.clone();
        services.push(spec);
    }

    Ok(services)
}

fn coerce_port(value: &Value) -> Result<u16> {
    let port = match value {
        Value::Number(n) => match n.as_u64() {
            Some(n) => u16::try_from(n).ok().filter(|port| *port != 0),
            // 80.0 is still port 80
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && (1.0..=65535.0).contains(f))
                .map(|f| f as u16),
        },
        Value::String(s) => parse_port(s),
        _ => None,
    };

    port.ok_or_else(|| Error::invalid_input(format!("invalid 'forward_port': {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_entry_expands_per_name_with_string_port() {
        let services = parse_manifest(
            r#"{"services": [
                {"domain_names": ["a", "b"], "forward_host": "10.0.0.5", "forward_port": "80"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            services,
            vec![
                ServiceSpec::new("a", "10.0.0.5", 80),
                ServiceSpec::new("b", "10.0.0.5", 80),
            ]
        );
    }

    #[test]
    fn test_bad_port_skips_entry_only() {
        let services = parse_manifest(
            r#"{"services": [
                {"domain_names": ["bad"], "forward_host": "10.0.0.5", "forward_port": "notanumber"},
                {"domain_names": ["good"], "forward_host": "10.0.0.6", "forward_port": 8080,
                 "description": "kept"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(services.len(), 1);
        assert_eq!(services[0].hostname, "good");
        assert_eq!(services[0].backend_port, 8080);
        assert_eq!(services[0].description.as_deref(), Some("kept"));
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let services = parse_manifest(
            r#"{"services": [
                {"domain_names": [], "forward_host": "10.0.0.1", "forward_port": 80},
                {"forward_host": "10.0.0.1", "forward_port": 80},
                {"domain_names": ["x"], "forward_port": 80},
                {"domain_names": ["y"], "forward_host": "10.0.0.1"},
                {"domain_names": ["z"], "forward_host": "10.0.0.1", "forward_port": 70000},
                {"domain_names": ["ok"], "forward_host": "10.0.0.1", "forward_port": 80}
            ]}"#,
        )
        .unwrap();

        let names: Vec<&str> = services.iter().map(|s| s.hostname.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_integral_float_port_accepted() {
        let services = parse_manifest(
            r#"{"services": [
                {"domain_names": ["whole"], "forward_host": "10.0.0.1", "forward_port": 80.0},
                {"domain_names": ["half"], "forward_host": "10.0.0.1", "forward_port": 80.5},
                {"domain_names": ["neg"], "forward_host": "10.0.0.1", "forward_port": -1},
                {"domain_names": ["big"], "forward_host": "10.0.0.1", "forward_port": 65536.0}
            ]}"#,
        )
        .unwrap();

        assert_eq!(services, vec![ServiceSpec::new("whole", "10.0.0.1", 80)]);
    }

    #[test]
    fn test_invalid_name_skipped_within_entry() {
        let services = parse_manifest(
            r#"{"services": [
                {"domain_names": ["good", "bad name", 7], "forward_host": "h", "forward_port": 1}
            ]}"#,
        )
        .unwrap();

        assert_eq!(services.len(), 1);
        assert_eq!(services[0].hostname, "good");
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = parse_manifest("{ not json").unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
    }

    #[test]
    fn test_missing_services_key_is_error() {
        assert!(matches!(
            parse_manifest(r#"{"hosts": []}"#),
            Err(Error::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"services": [{{"domain_names": ["app"], "forward_host": "10.0.0.9", "forward_port": 9000}}]}}"#
        )
        .unwrap();

        let source = ManifestServiceSource::new(file.path());
        let services = source.load().await.unwrap();
        assert_eq!(services, vec![ServiceSpec::new("app", "10.0.0.9", 9000)]);
    }

    #[tokio::test]
    async fn test_missing_file_is_error_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let source = ManifestServiceSource::new(dir.path().join("absent.json"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
    }
}
