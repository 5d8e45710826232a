//! Apps and the model registry. Populated at startup, read-only afterwards.

use crate::error::ConfigError;
use crate::model::ModelDescriptor;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static regex"))
}

pub(crate) fn check_identifier(name: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

/// A labelled group of models, e.g. `inscriptions`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub label: String,
    models: Vec<Arc<ModelDescriptor>>,
}

impl AppConfig {
    pub fn new(label: &str) -> Self {
        AppConfig {
            label: label.to_string(),
            models: Vec::new(),
        }
    }

    pub fn model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(Arc::new(model));
        self
    }

    /// Models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.models.iter()
    }

    pub fn get_model(&self, name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Identifiers are safe to quote, names are unique, relation targets exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier(&self.label)?;
        let mut seen = HashSet::new();
        for model in &self.models {
            check_identifier(&model.name)?;
            if model.app_label != self.label {
                return Err(ConfigError::MissingReference {
                    kind: "app",
                    id: model.app_label.clone(),
                });
            }
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::InvalidIdentifier(format!(
                    "duplicate model {}",
                    model.name
                )));
            }
            let mut field_names = HashSet::new();
            for field in &model.fields {
                check_identifier(&field.name)?;
                if !field_names.insert(field.name.as_str()) {
                    return Err(ConfigError::InvalidIdentifier(format!(
                        "duplicate field {}.{}",
                        model.name, field.name
                    )));
                }
            }
            if let Some(display) = &model.display_field {
                if model.get_field(display).is_none() {
                    return Err(ConfigError::MissingReference {
                        kind: "field",
                        id: format!("{}.{}", model.name, display),
                    });
                }
            }
        }
        for model in &self.models {
            for to in model.fields.iter().filter_map(|f| f.related_model()) {
                if !seen.contains(to) {
                    return Err(ConfigError::MissingReference {
                        kind: "model",
                        id: to.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    apps: Vec<Arc<AppConfig>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, app: AppConfig) -> Result<(), ConfigError> {
        app.validate()?;
        if self.apps.iter().any(|a| a.label == app.label) {
            return Err(ConfigError::DuplicateApp(app.label));
        }
        tracing::debug!(app = %app.label, models = app.models.len(), "registered app");
        self.apps.push(Arc::new(app));
        Ok(())
    }

    pub fn get_app_config(&self, label: &str) -> Result<&Arc<AppConfig>, ConfigError> {
        self.apps
            .iter()
            .find(|a| a.label == label)
            .ok_or_else(|| ConfigError::AppNotFound(label.to_string()))
    }

    pub fn apps(&self) -> impl Iterator<Item = &Arc<AppConfig>> {
        self.apps.iter()
    }
}
