//! Field listing over model descriptors.

use crate::model::{FieldDescriptor, ModelDescriptor};

/// Bookkeeping fields every model carries.
pub const DEFAULT_FIELDS: &[&str] = &["created_at", "updated_at", "id"];

/// Internal type-discriminator columns never exposed through the API.
pub const DEFAULT_EXCLUDE: &[&str] = &["polymorphic_ctype"];

fn names<'a>(fields: impl Iterator<Item = &'a FieldDescriptor>, exclude: &[&str]) -> Vec<String> {
    fields
        .filter(|f| !exclude.contains(&f.name.as_str()))
        .map(|f| f.name.clone())
        .collect()
}

/// Concrete fields (scalars and foreign keys) in declaration order, then many-to-many fields
/// in declaration order, minus `exclude`.
pub fn fields_of(model: &ModelDescriptor, exclude: &[&str]) -> Vec<String> {
    names(model.concrete_fields().chain(model.many_to_many_fields()), exclude)
}

pub fn m2m_fields_of(model: &ModelDescriptor, exclude: &[&str]) -> Vec<String> {
    names(model.many_to_many_fields(), exclude)
}

/// Plain columns only: no foreign keys, no many-to-many.
pub fn scalar_fields_of(model: &ModelDescriptor, exclude: &[&str]) -> Vec<String> {
    names(model.fields.iter().filter(|f| !f.is_relation()), exclude)
}

/// `fields_of` with the default exclusions; the usual serializer field selector.
pub fn default_fields(model: &ModelDescriptor) -> Vec<String> {
    fields_of(model, DEFAULT_EXCLUDE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

    fn model() -> ModelDescriptor {
        ModelDescriptor::new("inscriptions", "inscription")
            .field(FieldDescriptor::many_to_many("genre", "genre"))
            .field(FieldDescriptor::text("title"))
            .field(FieldDescriptor::scalar("polymorphic_ctype", ColumnType::BigInt))
            .field(FieldDescriptor::foreign_key("panel", "panel"))
            .field(FieldDescriptor::many_to_many("tags", "tag"))
            .field(FieldDescriptor::scalar("min_year", ColumnType::Int))
    }

    #[test]
    fn concrete_fields_precede_many_to_many_in_declaration_order() {
        assert_eq!(
            fields_of(&model(), DEFAULT_EXCLUDE),
            ["id", "created_at", "updated_at", "title", "panel", "min_year", "genre", "tags"]
        );
    }

    #[test]
    fn excluded_names_never_appear() {
        let exclude = ["title", "tags", "id"];
        let fields = fields_of(&model(), &exclude);
        assert!(fields.iter().all(|f| !exclude.contains(&f.as_str())));
        assert!(fields.contains(&"polymorphic_ctype".to_string()));
    }

    #[test]
    fn exclusion_preserves_relative_order() {
        let all = fields_of(&model(), &[]);
        let some = fields_of(&model(), &["created_at", "panel"]);
        let filtered: Vec<_> = all
            .into_iter()
            .filter(|f| f != "created_at" && f != "panel")
            .collect();
        assert_eq!(some, filtered);
    }

    #[test]
    fn many_to_many_only() {
        assert_eq!(m2m_fields_of(&model(), DEFAULT_EXCLUDE), ["genre", "tags"]);
        assert_eq!(m2m_fields_of(&model(), &["genre"]), ["tags"]);
    }

    #[test]
    fn scalars_skip_relations() {
        let mut exclude = DEFAULT_FIELDS.to_vec();
        exclude.extend_from_slice(DEFAULT_EXCLUDE);
        assert_eq!(scalar_fields_of(&model(), &exclude), ["title", "min_year"]);
    }
}
