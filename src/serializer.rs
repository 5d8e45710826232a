//! Serializer definitions: which fields of a model are rendered, and how deep relations expand.
//!
//! A definition is a plain owned value. Every call to [`serializer_for`] builds a new one, so two
//! routes (or two requests) never share a field list.

use crate::model::{default_fields, FieldDescriptor, ModelDescriptor};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SerializerDefinition {
    pub app_label: String,
    pub model: String,
    pub fields: Vec<String>,
    /// 0 renders relations as ids; n > 0 renders related records inline at depth n - 1.
    pub depth: u8,
    /// Component name in the OpenAPI document; the model's own name so apps never collide.
    pub ref_name: String,
}

pub fn serializer_for<F>(model: &ModelDescriptor, fields: F, depth: u8) -> SerializerDefinition
where
    F: Fn(&ModelDescriptor) -> Vec<String>,
{
    SerializerDefinition {
        app_label: model.app_label.clone(),
        model: model.name.clone(),
        fields: fields(model),
        depth,
        ref_name: model.name.clone(),
    }
}

/// All non-excluded fields, relations as ids.
pub fn default_serializer(model: &ModelDescriptor) -> SerializerDefinition {
    serializer_for(model, default_fields, 0)
}

impl SerializerDefinition {
    /// Selected fields that exist on `model`, in the definition's order.
    pub fn selected<'a>(&'a self, model: &'a ModelDescriptor) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        self.fields.iter().filter_map(move |name| model.get_field(name))
    }

    /// Definition used for a related model one level down.
    pub fn nested(&self, related: &ModelDescriptor) -> SerializerDefinition {
        serializer_for(related, default_fields, self.depth.saturating_sub(1))
    }
}
