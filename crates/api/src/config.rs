use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use titanic_core::model;

/// Startup configuration error. Fatal: the process exits before binding.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Output format of the fmt tracing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// Empty by default, which disables cross-origin access.
    pub cors_origins: Vec<HeaderValue>,
    /// Model artifact location (default: `<install root>/titanic_model.json`).
    /// The install root is fixed at build time, so deployed binaries that do
    /// not run from the source tree should set `MODEL_PATH`.
    pub model_path: PathBuf,
    /// Directory for run records; when unset runs are only logged.
    pub tracking_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                            |
    /// | `PORT`                 | `8000`                               |
    /// | `CORS_ORIGINS`         | empty                                |
    /// | `MODEL_PATH`           | `<install root>/titanic_model.json`  |
    /// | `TRACKING_DIR`         | unset                                |
    /// | `LOG_FORMAT`           | `text`                               |
    ///
    /// The install root comes from the build-time manifest location (see
    /// [`install_root`]); set `MODEL_PATH` when the binary is deployed
    /// outside the source tree.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port = parse_var(&lookup, "PORT", "8000", "a valid u16")?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    expected: "a list of valid header values",
                    value: origin.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model::default_model_path(&install_root()));

        let tracking_dir = lookup("TRACKING_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    expected: "'text' or 'json'",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            model_path,
            tracking_dir,
            log_format,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = lookup(var).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value,
    })
}

/// The workspace root: two directories above this crate's manifest
/// (`crates/api` -> root).
///
/// Resolved from `CARGO_MANIFEST_DIR` at compile time, so it names the
/// build machine's checkout, not the directory of a copied binary.
pub fn install_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.model_path, install_root().join("titanic_model.json"));
        assert_eq!(config.tracking_dir, None);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn install_root_is_two_levels_above_crate() {
        let root = install_root();
        assert!(Path::new(env!("CARGO_MANIFEST_DIR")).starts_with(&root));
        assert!(root.join("crates").join("api").join("Cargo.toml").exists());
    }

    #[test]
    fn overrides_are_read() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "9001"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("MODEL_PATH", "/models/forest.json"),
            ("TRACKING_DIR", "/var/lib/titanic"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.model_path, PathBuf::from("/models/forest.json"));
        assert_eq!(config.tracking_dir, Some(PathBuf::from("/var/lib/titanic")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn timeout_variable_is_not_read() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "not-a-number")]));
        assert!(config.is_ok());
    }

    #[test]
    fn invalid_cors_origin_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("CORS_ORIGINS", "http://a\u{1}.test")]));
        assert_matches!(result, Err(ConfigError::Invalid { var: "CORS_ORIGINS", .. }));
    }

    #[test]
    fn invalid_port_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert_matches!(result, Err(ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("LOG_FORMAT", "xml")]));
        assert_matches!(result, Err(ConfigError::Invalid { var: "LOG_FORMAT", .. }));
    }
}
