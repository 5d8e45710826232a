//! Settings from environment variables (after `dotenvy::dotenv()` in each binary).

use crate::error::ConfigError;
use crate::model::registry::check_identifier;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/saintsophia";
pub const DEFAULT_ANNOTATION_API: &str = "https://saintsophia.dh.gu.se";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    /// PostgreSQL schema of the catalog tables. `SAINTSOPHIA_SCHEMA`, default `public`.
    pub schema: String,
    /// `SAINTSOPHIA_BIND`, default `0.0.0.0:8000`.
    pub bind: SocketAddr,
    /// Base URL of the remote annotation API. `SAINTSOPHIA_ANNOTATION_API`.
    pub annotation_api: String,
    /// `SAINTSOPHIA_ANNOTATIONS_DIR`, default `annotations`.
    pub annotations_dir: PathBuf,
    /// Models without generated routes. `SAINTSOPHIA_EXCLUDE_MODELS`, comma separated.
    pub exclude_models: Vec<String>,
    /// Create missing catalog tables at server start. `SAINTSOPHIA_AUTO_MIGRATE`.
    pub auto_migrate: bool,
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidSetting {
            name,
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let schema = lookup("SAINTSOPHIA_SCHEMA").unwrap_or_else(|| "public".into());
        check_identifier(&schema).map_err(|_| ConfigError::InvalidSetting {
            name: "SAINTSOPHIA_SCHEMA",
            message: format!("'{}' is not a lowercase identifier", schema),
        })?;
        let bind_raw = lookup("SAINTSOPHIA_BIND").unwrap_or_else(|| "0.0.0.0:8000".into());
        let bind = bind_raw.parse().map_err(|e| ConfigError::InvalidSetting {
            name: "SAINTSOPHIA_BIND",
            message: format!("'{}': {}", bind_raw, e),
        })?;
        let annotation_api = lookup("SAINTSOPHIA_ANNOTATION_API")
            .unwrap_or_else(|| DEFAULT_ANNOTATION_API.into())
            .trim_end_matches('/')
            .to_string();
        if !annotation_api.starts_with("http://") && !annotation_api.starts_with("https://") {
            return Err(ConfigError::InvalidSetting {
                name: "SAINTSOPHIA_ANNOTATION_API",
                message: format!("'{}' is not an http(s) URL", annotation_api),
            });
        }
        let exclude_models = lookup("SAINTSOPHIA_EXCLUDE_MODELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let auto_migrate = match lookup("SAINTSOPHIA_AUTO_MIGRATE") {
            Some(raw) => parse_bool("SAINTSOPHIA_AUTO_MIGRATE", &raw)?,
            None => false,
        };
        Ok(Settings {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            schema,
            bind,
            annotation_api,
            annotations_dir: PathBuf::from(
                lookup("SAINTSOPHIA_ANNOTATIONS_DIR").unwrap_or_else(|| "annotations".into()),
            ),
            exclude_models,
            auto_migrate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.schema, "public");
        assert_eq!(s.bind, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(s.annotation_api, DEFAULT_ANNOTATION_API);
        assert_eq!(s.annotations_dir, PathBuf::from("annotations"));
        assert!(s.exclude_models.is_empty());
        assert!(!s.auto_migrate);
    }

    #[test]
    fn overrides() {
        let s = settings(&[
            ("SAINTSOPHIA_SCHEMA", "catalog"),
            ("SAINTSOPHIA_EXCLUDE_MODELS", "tag, genre,,"),
            ("SAINTSOPHIA_AUTO_MIGRATE", "true"),
            ("SAINTSOPHIA_ANNOTATION_API", "http://localhost:9000/"),
        ])
        .unwrap();
        assert_eq!(s.schema, "catalog");
        assert_eq!(s.exclude_models, ["tag", "genre"]);
        assert!(s.auto_migrate);
        assert_eq!(s.annotation_api, "http://localhost:9000");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            settings(&[("SAINTSOPHIA_BIND", "nowhere")]),
            Err(ConfigError::InvalidSetting { name: "SAINTSOPHIA_BIND", .. })
        ));
        assert!(matches!(
            settings(&[("SAINTSOPHIA_SCHEMA", "Bad-Schema")]),
            Err(ConfigError::InvalidSetting { name: "SAINTSOPHIA_SCHEMA", .. })
        ));
        assert!(matches!(
            settings(&[("SAINTSOPHIA_AUTO_MIGRATE", "maybe")]),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }
}
