//! The `inscriptions` app: panels, inscriptions, and their classification lookups.

use crate::error::ConfigError;
use crate::model::{AppConfig, ColumnType, FieldDescriptor, ModelDescriptor, ModelRegistry};

pub const APP_LABEL: &str = "inscriptions";

/// Lookup models rendered by a single `text` column: (model name, display column).
const TEXT_LOOKUPS: &[(&str, &str)] = &[
    ("inscriptiontype", "text"),
    ("genre", "text"),
    ("tag", "text"),
    ("language", "text"),
    ("writingsystem", "text"),
    ("datingcriterion", "text"),
    ("condition", "text"),
    ("alignment", "text"),
    ("extraalphabeticalsign", "text"),
];

fn lookup(name: &str, display: &str) -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, name)
        .field(FieldDescriptor::text(display).not_null())
        .display(display)
}

fn panel() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "panel")
        .field(FieldDescriptor::text("title").not_null())
        .field(FieldDescriptor::text("room"))
        .field(FieldDescriptor::text("file"))
        .field(FieldDescriptor::text("attached_photograph"))
        .field(FieldDescriptor::many_to_many("tags", "tag"))
        .display("title")
}

fn mentioned_person() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "mentionedperson")
        .field(FieldDescriptor::text("name").not_null())
        .field(FieldDescriptor::text("name_ukr"))
        .display("name")
}

fn inscriber() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "inscriber")
        .field(FieldDescriptor::text("name").not_null())
        .field(FieldDescriptor::text("information"))
        .display("name")
}

fn bibliography_item() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "bibliographyitem")
        .field(FieldDescriptor::text("title").not_null())
        .field(FieldDescriptor::text("authors"))
        .field(FieldDescriptor::scalar("year", ColumnType::Int))
        .display("title")
}

fn author() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "author")
        .field(FieldDescriptor::text("name").not_null())
        .field(FieldDescriptor::text("orcid"))
        .display("name")
}

fn inscription() -> ModelDescriptor {
    ModelDescriptor::new(APP_LABEL, "inscription")
        .field(FieldDescriptor::text("title"))
        .field(FieldDescriptor::foreign_key("panel", "panel"))
        .field(FieldDescriptor::foreign_key("type_of_inscription", "inscriptiontype"))
        .field(FieldDescriptor::many_to_many("genre", "genre"))
        .field(FieldDescriptor::many_to_many("tags", "tag"))
        .field(FieldDescriptor::text("position_on_surface"))
        .field(FieldDescriptor::scalar("elevation", ColumnType::Float))
        .field(FieldDescriptor::scalar("height", ColumnType::Float))
        .field(FieldDescriptor::scalar("width", ColumnType::Float))
        .field(FieldDescriptor::foreign_key("language", "language"))
        .field(FieldDescriptor::foreign_key("writing_system", "writingsystem"))
        .field(FieldDescriptor::scalar("min_year", ColumnType::Int))
        .field(FieldDescriptor::scalar("max_year", ColumnType::Int))
        .field(FieldDescriptor::many_to_many("dating_criteria", "datingcriterion"))
        .field(FieldDescriptor::text("transcription"))
        .field(FieldDescriptor::text("interpretative_edition"))
        .field(FieldDescriptor::text("romanisation"))
        .field(FieldDescriptor::many_to_many("mentioned_person", "mentionedperson"))
        .field(FieldDescriptor::foreign_key("inscriber", "inscriber"))
        .field(FieldDescriptor::text("translation_eng"))
        .field(FieldDescriptor::text("translation_ukr"))
        .field(FieldDescriptor::text("comments_eng"))
        .field(FieldDescriptor::text("comments_ukr"))
        .field(FieldDescriptor::many_to_many("condition", "condition"))
        .field(FieldDescriptor::many_to_many("alignment", "alignment"))
        .field(FieldDescriptor::many_to_many("extra_alphabetical_sign", "extraalphabeticalsign"))
        .field(FieldDescriptor::many_to_many("bibliography", "bibliographyitem"))
        .field(FieldDescriptor::many_to_many("author", "author"))
        .display("title")
}

pub fn inscriptions_app() -> AppConfig {
    let mut app = AppConfig::new(APP_LABEL);
    for (name, display) in TEXT_LOOKUPS {
        app = app.model(lookup(name, display));
    }
    app.model(mentioned_person())
        .model(inscriber())
        .model(bibliography_item())
        .model(author())
        .model(panel())
        .model(inscription())
}

/// Registry with every app this service knows about.
pub fn registry() -> Result<ModelRegistry, ConfigError> {
    let mut registry = ModelRegistry::new();
    registry.register(inscriptions_app())?;
    Ok(registry)
}
