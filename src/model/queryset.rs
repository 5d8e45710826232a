//! The unfiltered record set of one model, plus the app it lives in (for relation lookups).

use crate::model::{AppConfig, ModelDescriptor};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct QuerySet {
    pub app: Arc<AppConfig>,
    pub model: Arc<ModelDescriptor>,
}

impl QuerySet {
    pub fn all(app: Arc<AppConfig>, model: Arc<ModelDescriptor>) -> Self {
        QuerySet { app, model }
    }

    /// Target model of a relation field, if the field is a relation and the target is registered.
    pub fn related(&self, model: &ModelDescriptor, field: &str) -> Option<&Arc<ModelDescriptor>> {
        model
            .get_field(field)
            .and_then(|f| f.related_model())
            .and_then(|to| self.app.get_model(to))
    }
}
