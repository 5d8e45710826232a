//! Model and field descriptors. Built once at startup and never mutated afterwards.

/// Storage type of a scalar column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing primary key.
    AutoId,
    BigInt,
    Int,
    Float,
    Text,
    Bool,
    Timestamptz,
}

impl ColumnType {
    /// PostgreSQL type name used in casts (`$1::<type>`).
    pub fn pg_type(&self) -> &'static str {
        match self {
            ColumnType::AutoId | ColumnType::BigInt => "bigint",
            ColumnType::Int => "integer",
            ColumnType::Float => "double precision",
            ColumnType::Text => "text",
            ColumnType::Bool => "boolean",
            ColumnType::Timestamptz => "timestamptz",
        }
    }

    /// Type used in CREATE TABLE.
    pub fn ddl_type(&self) -> &'static str {
        match self {
            ColumnType::AutoId => "BIGSERIAL",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Int => "INTEGER",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Timestamptz => "TIMESTAMPTZ",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::AutoId | ColumnType::BigInt | ColumnType::Int)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ColumnType),
    /// Stored as `<name>_id` referencing the target model's primary key.
    ForeignKey { to: String },
    /// Stored in a join table; see [`ModelDescriptor::join_table`].
    ManyToMany { to: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// SQL default expression, e.g. `NOW()`.
    pub default: Option<String>,
}

impl FieldDescriptor {
    pub fn scalar(name: &str, ty: ColumnType) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind: FieldKind::Scalar(ty),
            nullable: true,
            default: None,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::scalar(name, ColumnType::Text)
    }

    pub fn foreign_key(name: &str, to: &str) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind: FieldKind::ForeignKey { to: to.to_string() },
            nullable: true,
            default: None,
        }
    }

    pub fn many_to_many(name: &str, to: &str) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind: FieldKind::ManyToMany { to: to.to_string() },
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, expression: &str) -> Self {
        self.default = Some(expression.to_string());
        self
    }

    /// Scalars and foreign keys live on the model's own table.
    pub fn is_concrete(&self) -> bool {
        !self.is_many_to_many()
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, FieldKind::ManyToMany { .. })
    }

    pub fn is_relation(&self) -> bool {
        !matches!(self.kind, FieldKind::Scalar(_))
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        match self.kind {
            FieldKind::Scalar(ty) => Some(ty),
            FieldKind::ForeignKey { .. } => Some(ColumnType::BigInt),
            FieldKind::ManyToMany { .. } => None,
        }
    }

    /// Column on the model's own table; `None` for many-to-many.
    pub fn column(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Scalar(_) => Some(self.name.clone()),
            FieldKind::ForeignKey { .. } => Some(format!("{}_id", self.name)),
            FieldKind::ManyToMany { .. } => None,
        }
    }

    pub fn related_model(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Scalar(_) => None,
            FieldKind::ForeignKey { to } | FieldKind::ManyToMany { to } => Some(to),
        }
    }
}

/// A model: named entity with ordered scalar, foreign-key and many-to-many fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub app_label: String,
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    /// Field used when the model is rendered as text (CSV lookups, joined lists).
    pub display_field: Option<String>,
}

pub const PK_FIELD: &str = "id";

impl ModelDescriptor {
    /// New model with the primary key and the created/updated bookkeeping columns.
    pub fn new(app_label: &str, name: &str) -> Self {
        ModelDescriptor {
            app_label: app_label.to_string(),
            name: name.to_string(),
            fields: vec![
                FieldDescriptor::scalar(PK_FIELD, ColumnType::AutoId).not_null(),
                FieldDescriptor::scalar("created_at", ColumnType::Timestamptz)
                    .not_null()
                    .with_default("NOW()"),
                FieldDescriptor::scalar("updated_at", ColumnType::Timestamptz)
                    .not_null()
                    .with_default("NOW()"),
            ],
            display_field: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn display(mut self, field: &str) -> Self {
        self.display_field = Some(field.to_string());
        self
    }

    pub fn pk(&self) -> &str {
        PK_FIELD
    }

    pub fn table_name(&self) -> String {
        format!("{}_{}", self.app_label, self.name)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn concrete_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_concrete())
    }

    pub fn many_to_many_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_many_to_many())
    }

    /// Column rendered when the model is shown as text; the primary key when no display field is set.
    pub fn display_column(&self) -> &str {
        self.display_field.as_deref().unwrap_or(PK_FIELD)
    }

    /// Join table for a many-to-many field: `<app>_<model>_<field>`.
    pub fn join_table(&self, field: &FieldDescriptor) -> String {
        format!("{}_{}_{}", self.app_label, self.name, field.name)
    }

    /// (our key column, their key column) in the join table of `field`.
    pub fn join_columns(&self, field: &FieldDescriptor) -> (String, String) {
        let to = field.related_model().unwrap_or_default();
        if to == self.name {
            (format!("from_{}_id", self.name), format!("to_{}_id", to))
        } else {
            (format!("{}_id", self.name), format!("{}_id", to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inscription() -> ModelDescriptor {
        ModelDescriptor::new("inscriptions", "inscription")
            .field(FieldDescriptor::text("title"))
            .field(FieldDescriptor::foreign_key("panel", "panel"))
            .field(FieldDescriptor::many_to_many("tags", "tag"))
    }

    #[test]
    fn new_model_starts_with_bookkeeping_fields() {
        let m = ModelDescriptor::new("inscriptions", "panel");
        let names: Vec<_> = m.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "created_at", "updated_at"]);
        assert_eq!(m.table_name(), "inscriptions_panel");
    }

    #[test]
    fn foreign_key_column_gets_id_suffix() {
        let m = inscription();
        assert_eq!(m.get_field("panel").and_then(|f| f.column()).as_deref(), Some("panel_id"));
        assert_eq!(m.get_field("tags").and_then(|f| f.column()), None);
    }

    #[test]
    fn join_table_naming() {
        let m = inscription();
        let tags = m.get_field("tags").unwrap();
        assert_eq!(m.join_table(tags), "inscriptions_inscription_tags");
        assert_eq!(
            m.join_columns(tags),
            ("inscription_id".to_string(), "tag_id".to_string())
        );
    }

    #[test]
    fn self_referencing_join_columns_do_not_collide() {
        let m = ModelDescriptor::new("inscriptions", "inscription")
            .field(FieldDescriptor::many_to_many("related", "inscription"));
        let f = m.get_field("related").unwrap();
        let (ours, theirs) = m.join_columns(f);
        assert_ne!(ours, theirs);
    }
}
