//! Flat text SELECTs for CSV export: every column rendered as non-null text.

use crate::error::ConfigError;
use crate::model::{AppConfig, FieldDescriptor, FieldKind, ModelDescriptor};
use crate::sql::{qualified_table, quoted, QueryBuf};

/// Where an export column's text comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnSource {
    /// Plain column on the exported model.
    Field(&'static str),
    /// Column of the record a foreign key points to; `None` uses the related display field.
    Related {
        field: &'static str,
        attr: Option<&'static str>,
    },
    /// Display values of a many-to-many relation joined with `"; "`.
    Joined(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportColumn {
    pub header: &'static str,
    pub source: ColumnSource,
}

impl ExportColumn {
    pub const fn field(header: &'static str) -> Self {
        ExportColumn {
            header,
            source: ColumnSource::Field(header),
        }
    }

    pub const fn related(header: &'static str, field: &'static str, attr: Option<&'static str>) -> Self {
        ExportColumn {
            header,
            source: ColumnSource::Related { field, attr },
        }
    }

    pub const fn joined(header: &'static str, field: &'static str) -> Self {
        ExportColumn {
            header,
            source: ColumnSource::Joined(field),
        }
    }
}

/// Row selection: any listed text field non-empty, or any listed many-to-many relation non-empty.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub text_fields: Vec<&'static str>,
    pub related_any: Vec<&'static str>,
}

const MAIN: &str = "t0";

fn field<'a>(model: &'a ModelDescriptor, name: &str) -> Result<&'a FieldDescriptor, ConfigError> {
    model.get_field(name).ok_or_else(|| ConfigError::MissingReference {
        kind: "field",
        id: format!("{}.{}", model.name, name),
    })
}

fn related_model<'a>(
    app: &'a AppConfig,
    field: &FieldDescriptor,
) -> Result<&'a ModelDescriptor, ConfigError> {
    let to = field.related_model().ok_or_else(|| ConfigError::MissingReference {
        kind: "relation",
        id: field.name.clone(),
    })?;
    app.get_model(to)
        .map(|m| m.as_ref())
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: to.to_string(),
        })
}

fn column_expr(
    app: &AppConfig,
    model: &ModelDescriptor,
    column: &ExportColumn,
    n: usize,
    schema: &str,
) -> Result<String, ConfigError> {
    let expr = match column.source {
        ColumnSource::Field(name) => {
            let f = field(model, name)?;
            let col = f.column().ok_or_else(|| ConfigError::MissingReference {
                kind: "column",
                id: name.to_string(),
            })?;
            format!("{}.{}::text", MAIN, quoted(&col))
        }
        ColumnSource::Related { field: name, attr } => {
            let f = field(model, name)?;
            if !matches!(f.kind, FieldKind::ForeignKey { .. }) {
                return Err(ConfigError::MissingReference {
                    kind: "foreign key",
                    id: name.to_string(),
                });
            }
            let related = related_model(app, f)?;
            let attr = attr.unwrap_or_else(|| related.display_column());
            let r = format!("r{}", n);
            format!(
                "(SELECT {r}.{attr}::text FROM {table} {r} WHERE {r}.{pk} = {main}.{fk})",
                r = r,
                attr = quoted(attr),
                table = qualified_table(schema, &related.table_name()),
                pk = quoted(related.pk()),
                main = MAIN,
                fk = quoted(&format!("{}_id", f.name)),
            )
        }
        ColumnSource::Joined(name) => {
            let f = field(model, name)?;
            if !f.is_many_to_many() {
                return Err(ConfigError::MissingReference {
                    kind: "many-to-many",
                    id: name.to_string(),
                });
            }
            let related = related_model(app, f)?;
            let (ours, theirs) = model.join_columns(f);
            let (r, j) = (format!("r{}", n), format!("j{}", n));
            format!(
                "(SELECT string_agg({r}.{disp}::text, '; ' ORDER BY {r}.{pk}) FROM {jt} {j} JOIN {rt} {r} ON {r}.{pk} = {j}.{theirs} WHERE {j}.{ours} = {main}.{main_pk})",
                r = r,
                j = j,
                disp = quoted(related.display_column()),
                pk = quoted(related.pk()),
                jt = qualified_table(schema, &model.join_table(f)),
                rt = qualified_table(schema, &related.table_name()),
                theirs = quoted(&theirs),
                ours = quoted(&ours),
                main = MAIN,
                main_pk = quoted(model.pk()),
            )
        }
    };
    Ok(format!("COALESCE({}, '') AS {}", expr, quoted(column.header)))
}

fn selection_clause(model: &ModelDescriptor, selection: &Selection, schema: &str) -> Result<String, ConfigError> {
    let mut any = Vec::new();
    for name in &selection.text_fields {
        let f = field(model, name)?;
        if let Some(col) = f.column() {
            any.push(format!("COALESCE({}.{}, '') <> ''", MAIN, quoted(&col)));
        }
    }
    for (i, name) in selection.related_any.iter().enumerate() {
        let f = field(model, name)?;
        let (ours, _) = model.join_columns(f);
        let j = format!("s{}", i);
        any.push(format!(
            "EXISTS (SELECT 1 FROM {} {j} WHERE {j}.{} = {}.{})",
            qualified_table(schema, &model.join_table(f)),
            quoted(&ours),
            MAIN,
            quoted(model.pk()),
            j = j,
        ));
    }
    Ok(if any.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", any.join(" OR "))
    })
}

pub fn select_export_rows(
    app: &AppConfig,
    model: &ModelDescriptor,
    columns: &[ExportColumn],
    selection: &Selection,
    schema: &str,
) -> Result<QueryBuf, ConfigError> {
    let mut q = QueryBuf::new();
    let exprs = columns
        .iter()
        .enumerate()
        .map(|(n, c)| column_expr(app, model, c, n, schema))
        .collect::<Result<Vec<_>, _>>()?;
    let where_sql = selection_clause(model, selection, schema)?;
    q.sql = format!(
        "SELECT {} FROM {} {}{} ORDER BY {}.{}",
        exprs.join(", "),
        qualified_table(schema, &model.table_name()),
        MAIN,
        where_sql,
        MAIN,
        quoted(model.pk())
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::inscriptions_app;

    #[test]
    fn renders_lookups_and_joined_lists() {
        let app = inscriptions_app();
        let model = app.get_model("inscription").unwrap().clone();
        let columns = [
            ExportColumn::field("id"),
            ExportColumn::related("panel_title", "panel", Some("title")),
            ExportColumn::related("language", "language", None),
            ExportColumn::joined("tags", "tags"),
        ];
        let selection = Selection {
            text_fields: vec!["transcription"],
            related_any: vec![],
        };
        let q = select_export_rows(&app, &model, &columns, &selection, "public").unwrap();
        assert!(q.sql.starts_with("SELECT COALESCE(t0.\"id\"::text, '') AS \"id\""));
        assert!(q.sql.contains("(SELECT r1.\"title\"::text FROM \"public\".\"inscriptions_panel\" r1"));
        assert!(q.sql.contains("(SELECT r2.\"text\"::text FROM \"public\".\"inscriptions_language\" r2"));
        assert!(q.sql.contains("string_agg(r3.\"text\"::text, '; '"));
        assert!(q.sql.contains("WHERE COALESCE(t0.\"transcription\", '') <> '' ORDER BY t0.\"id\""));
    }

    #[test]
    fn widened_selection_checks_relations() {
        let app = inscriptions_app();
        let model = app.get_model("inscription").unwrap().clone();
        let selection = Selection {
            text_fields: vec!["transcription", "romanisation"],
            related_any: vec!["author", "mentioned_person"],
        };
        let q = select_export_rows(&app, &model, &[ExportColumn::field("id")], &selection, "public").unwrap();
        assert!(q.sql.contains(" OR EXISTS (SELECT 1 FROM \"public\".\"inscriptions_inscription_author\" s0"));
        assert!(q.sql.contains("\"inscriptions_inscription_mentioned_person\" s1"));
    }

    #[test]
    fn unknown_field_is_a_config_error() {
        let app = inscriptions_app();
        let model = app.get_model("inscription").unwrap().clone();
        let err = select_export_rows(
            &app,
            &model,
            &[ExportColumn::field("nope")],
            &Selection::default(),
            "public",
        );
        assert!(matches!(err, Err(ConfigError::MissingReference { kind: "field", .. })));
    }
}
