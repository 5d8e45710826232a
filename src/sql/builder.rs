//! Builds parameterized SELECT / COUNT / UPDATE statements from model descriptors.
//!
//! Records are rendered by PostgreSQL itself with `json_build_object`, one JSON value per row,
//! so relation expansion (ids at depth 0, nested objects deeper) stays in a single query.

use crate::model::{FieldDescriptor, FieldKind, ModelDescriptor, QuerySet};
use crate::serializer::SerializerDefinition;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from the registry).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Single-quoted SQL string literal.
pub fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub(crate) fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Hands out unique table aliases inside one statement.
struct Aliases(usize);

impl Aliases {
    fn next(&mut self) -> String {
        let a = format!("t{}", self.0);
        self.0 += 1;
        a
    }
}

const MAIN_ALIAS: &str = "t0";

/// `json_build_object(...)` rendering `serializer`'s fields of the row aliased `alias`.
fn record_expr(
    qs: &QuerySet,
    model: &ModelDescriptor,
    serializer: &SerializerDefinition,
    alias: &str,
    schema: &str,
    aliases: &mut Aliases,
) -> String {
    let mut parts = Vec::new();
    for field in serializer.selected(model) {
        let expr = field_expr(qs, model, field, serializer, alias, schema, aliases);
        parts.push(format!("{}, {}", literal(&field.name), expr));
    }
    format!("json_build_object({})", parts.join(", "))
}

fn field_expr(
    qs: &QuerySet,
    model: &ModelDescriptor,
    field: &FieldDescriptor,
    serializer: &SerializerDefinition,
    alias: &str,
    schema: &str,
    aliases: &mut Aliases,
) -> String {
    match &field.kind {
        FieldKind::Scalar(_) => format!("{}.{}", alias, quoted(&field.name)),
        FieldKind::ForeignKey { .. } => {
            let fk = format!("{}.{}", alias, quoted(&format!("{}_id", field.name)));
            if serializer.depth == 0 {
                return fk;
            }
            let Some(related) = qs.related(model, &field.name) else {
                return "NULL".into();
            };
            let r = aliases.next();
            let nested = serializer.nested(related);
            let inner = record_expr(qs, related, &nested, &r, schema, aliases);
            format!(
                "(SELECT {} FROM {} {} WHERE {}.{} = {})",
                inner,
                qualified_table(schema, &related.table_name()),
                r,
                r,
                quoted(related.pk()),
                fk
            )
        }
        FieldKind::ManyToMany { .. } => {
            let Some(related) = qs.related(model, &field.name) else {
                return "'[]'::json".into();
            };
            let j = aliases.next();
            let join_table = qualified_table(schema, &model.join_table(field));
            let (ours, theirs) = model.join_columns(field);
            let owner = format!("{}.{}", alias, quoted(model.pk()));
            if serializer.depth == 0 {
                return format!(
                    "(SELECT COALESCE(json_agg({j}.{theirs} ORDER BY {j}.{theirs}), '[]'::json) FROM {jt} {j} WHERE {j}.{ours} = {owner})",
                    j = j,
                    theirs = quoted(&theirs),
                    ours = quoted(&ours),
                    jt = join_table,
                    owner = owner,
                );
            }
            let r = aliases.next();
            let nested = serializer.nested(related);
            let inner = record_expr(qs, related, &nested, &r, schema, aliases);
            format!(
                "(SELECT COALESCE(json_agg({inner} ORDER BY {r}.{pk}), '[]'::json) FROM {jt} {j} JOIN {rt} {r} ON {r}.{pk} = {j}.{theirs} WHERE {j}.{ours} = {owner})",
                inner = inner,
                r = r,
                pk = quoted(related.pk()),
                jt = join_table,
                j = j,
                rt = qualified_table(schema, &related.table_name()),
                theirs = quoted(&theirs),
                ours = quoted(&ours),
                owner = owner,
            )
        }
    }
}

/// WHERE clause over concrete fields; unknown names and many-to-many fields are ignored.
fn where_clause(q: &mut QueryBuf, model: &ModelDescriptor, filters: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (name, val) in filters {
        let Some(field) = model.get_field(name) else { continue };
        let (Some(column), Some(ty)) = (field.column(), field.column_type()) else { continue };
        let n = q.push_param(val.clone());
        parts.push(format!("{}.{} = ${}::{}", MAIN_ALIAS, quoted(&column), n, ty.pg_type()));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// One JSON `record` per row, exact-match filters, ORDER BY pk, LIMIT/OFFSET.
pub fn select_records(
    qs: &QuerySet,
    serializer: &SerializerDefinition,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
    schema: &str,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = qs.model.as_ref();
    let mut aliases = Aliases(1);
    let record = record_expr(qs, model, serializer, MAIN_ALIAS, schema, &mut aliases);
    let where_sql = where_clause(&mut q, model, filters);
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n.min(1000))).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} AS \"record\" FROM {} {}{} ORDER BY {}.{}{}{}",
        record,
        qualified_table(schema, &model.table_name()),
        MAIN_ALIAS,
        where_sql,
        MAIN_ALIAS,
        quoted(model.pk()),
        limit_clause,
        offset_clause
    );
    q
}

/// Single record by primary key, bound as $1.
pub fn select_record_by_id(qs: &QuerySet, serializer: &SerializerDefinition, id: i64, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = qs.model.as_ref();
    let mut aliases = Aliases(1);
    let record = record_expr(qs, model, serializer, MAIN_ALIAS, schema, &mut aliases);
    let n = q.push_param(Value::Number(id.into()));
    q.sql = format!(
        "SELECT {} AS \"record\" FROM {} {} WHERE {}.{} = ${}",
        record,
        qualified_table(schema, &model.table_name()),
        MAIN_ALIAS,
        MAIN_ALIAS,
        quoted(model.pk()),
        n
    );
    q
}

pub fn count_records(qs: &QuerySet, filters: &[(String, Value)], schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let model = qs.model.as_ref();
    let where_sql = where_clause(&mut q, model, filters);
    q.sql = format!(
        "SELECT COUNT(*) AS \"count\" FROM {} {}{}",
        qualified_table(schema, &model.table_name()),
        MAIN_ALIAS,
        where_sql
    );
    q
}

/// Current values of plain columns as text (NULL stays NULL), by primary key.
pub fn select_text_columns(model: &ModelDescriptor, fields: &[String], id: i64, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols: Vec<String> = fields
        .iter()
        .filter_map(|f| model.get_field(f))
        .filter_map(|f| f.column().map(|c| format!("{}::text AS {}", quoted(&c), quoted(&f.name))))
        .collect();
    let n = q.push_param(Value::Number(id.into()));
    let select = if cols.is_empty() {
        quoted(model.pk())
    } else {
        cols.join(", ")
    };
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select,
        qualified_table(schema, &model.table_name()),
        quoted(model.pk()),
        n
    );
    q
}

/// UPDATE plain columns from text values. Empty text becomes NULL on non-text columns;
/// `updated_at` is bumped.
pub fn update_text_columns(
    model: &ModelDescriptor,
    id: i64,
    changes: &[(String, String)],
    schema: &str,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (name, value) in changes {
        if name == model.pk() {
            continue;
        }
        let Some(field) = model.get_field(name) else { continue };
        let (Some(column), Some(ty)) = (field.column(), field.column_type()) else { continue };
        let v = if value.is_empty() && !ty.is_text() {
            Value::Null
        } else {
            Value::String(value.clone())
        };
        let n = q.push_param(v);
        sets.push(format!("{} = ${}::{}", quoted(&column), n, ty.pg_type()));
    }
    if model.get_field("updated_at").is_some() {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let n = q.push_param(Value::Number(id.into()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        qualified_table(schema, &model.table_name()),
        sets.join(", "),
        quoted(model.pk()),
        n
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::inscriptions_app;
    use crate::model::default_fields;
    use crate::serializer::{default_serializer, serializer_for};
    use std::sync::Arc;

    fn qs(model: &str) -> QuerySet {
        let app = Arc::new(inscriptions_app());
        let model = app.get_model(model).unwrap().clone();
        QuerySet::all(app, model)
    }

    #[test]
    fn depth_zero_renders_relations_as_ids() {
        let qs = qs("inscription");
        let s = default_serializer(&qs.model);
        let q = select_records(&qs, &s, &[], Some(10), None, "public");
        assert!(q.sql.contains("'panel', t0.\"panel_id\""));
        assert!(q.sql.contains("json_agg(t"));
        assert!(q.sql.contains("\"public\".\"inscriptions_inscription_tags\""));
        assert!(q.sql.ends_with("ORDER BY t0.\"id\" LIMIT 10"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn depth_one_nests_related_objects() {
        let qs = qs("inscription");
        let s = serializer_for(&qs.model, default_fields, 1);
        let q = select_records(&qs, &s, &[], None, None, "public");
        assert!(q.sql.contains("FROM \"public\".\"inscriptions_panel\""));
        assert!(q.sql.contains("JOIN \"public\".\"inscriptions_tag\""));
    }

    #[test]
    fn filters_cast_to_column_type_and_skip_unknown() {
        let qs = qs("inscription");
        let filters = vec![
            ("min_year".to_string(), Value::from(1100)),
            ("panel".to_string(), Value::from(3)),
            ("tags".to_string(), Value::from(1)),
            ("nonsense".to_string(), Value::from("x")),
        ];
        let q = count_records(&qs, &filters, "public");
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) AS \"count\" FROM \"public\".\"inscriptions_inscription\" t0 WHERE t0.\"min_year\" = $1::integer AND t0.\"panel_id\" = $2::bigint"
        );
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn limit_is_capped() {
        let qs = qs("tag");
        let s = default_serializer(&qs.model);
        let q = select_records(&qs, &s, &[], Some(5000), Some(20), "public");
        assert!(q.sql.ends_with("LIMIT 1000 OFFSET 20"));
    }

    #[test]
    fn by_id_binds_single_param() {
        let qs = qs("panel");
        let s = default_serializer(&qs.model);
        let q = select_record_by_id(&qs, &s, 12, "public");
        assert!(q.sql.ends_with("WHERE t0.\"id\" = $1"));
        assert_eq!(q.params, vec![Value::from(12)]);
    }

    #[test]
    fn update_nulls_empty_numbers_and_bumps_updated_at() {
        let qs = qs("inscription");
        let changes = vec![
            ("title".to_string(), String::new()),
            ("min_year".to_string(), String::new()),
        ];
        let q = update_text_columns(&qs.model, 7, &changes, "public");
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"inscriptions_inscription\" SET \"title\" = $1::text, \"min_year\" = $2::integer, \"updated_at\" = NOW() WHERE \"id\" = $3"
        );
        assert_eq!(q.params, vec![Value::from(""), Value::Null, Value::from(7)]);
    }

    #[test]
    fn text_columns_are_cast() {
        let qs = qs("inscription");
        let q = select_text_columns(&qs.model, &["elevation".into(), "title".into()], 1, "public");
        assert!(q.sql.starts_with("SELECT \"elevation\"::text AS \"elevation\", \"title\"::text AS \"title\""));
    }
}
