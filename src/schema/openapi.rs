//! OpenAPI document for a route table, built with the utoipa builders.

use crate::model::{ColumnType, FieldKind, ModelDescriptor, QuerySet};
use crate::routes::{Action, RouteEntry, RouteTable};
use crate::schema::FilterParameter;
use crate::serializer::SerializerDefinition;
use std::collections::BTreeMap;
use utoipa::openapi::path::{
    HttpMethod, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, PathItem, PathsBuilder,
};
use utoipa::openapi::schema::{Array, ComponentsBuilder, KnownFormat, ObjectBuilder, Ref, Schema, SchemaFormat, Type};
use utoipa::openapi::{
    ContentBuilder, InfoBuilder, LicenseBuilder, OpenApi, OpenApiBuilder, RefOr, Required, Response,
    ResponseBuilder,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub license: String,
}

fn object(ty: Type) -> RefOr<Schema> {
    RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(ty).build()))
}

fn column_schema(ty: ColumnType) -> RefOr<Schema> {
    match ty {
        ColumnType::AutoId | ColumnType::BigInt | ColumnType::Int => object(Type::Integer),
        ColumnType::Float => object(Type::Number),
        ColumnType::Bool => object(Type::Boolean),
        ColumnType::Text => object(Type::String),
        ColumnType::Timestamptz => RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
                .build(),
        )),
    }
}

fn array_of(item: RefOr<Schema>) -> RefOr<Schema> {
    RefOr::T(Schema::Array(Array::new(item)))
}

/// Component schemas for `serializer` and, at depth > 0, every nested serializer it expands to.
fn collect_components(
    qs: &QuerySet,
    model: &ModelDescriptor,
    serializer: &SerializerDefinition,
    out: &mut BTreeMap<String, RefOr<Schema>>,
) {
    if out.contains_key(&serializer.ref_name) {
        return;
    }
    let mut builder = ObjectBuilder::new().schema_type(Type::Object);
    let mut nested = Vec::new();
    for field in serializer.selected(model) {
        let schema = match &field.kind {
            FieldKind::Scalar(ty) => column_schema(*ty),
            FieldKind::ForeignKey { .. } | FieldKind::ManyToMany { .. } => {
                let related = qs.related(model, &field.name).filter(|_| serializer.depth > 0);
                let item = match related {
                    Some(related) => {
                        let inner = serializer.nested(related);
                        let r = RefOr::Ref(Ref::from_schema_name(inner.ref_name.clone()));
                        nested.push((related.clone(), inner));
                        r
                    }
                    None => object(Type::Integer),
                };
                if field.is_many_to_many() {
                    array_of(item)
                } else {
                    item
                }
            }
        };
        builder = builder.property(field.name.clone(), schema);
        if !field.nullable && !field.is_many_to_many() {
            builder = builder.required(field.name.clone());
        }
    }
    out.insert(serializer.ref_name.clone(), RefOr::T(Schema::Object(builder.build())));
    for (related, inner) in nested {
        collect_components(qs, &related, &inner, out);
    }
}

fn envelope(data: RefOr<Schema>, with_count: bool) -> RefOr<Schema> {
    let mut builder = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("data", data)
        .required("data");
    if with_count {
        let meta = ObjectBuilder::new()
            .schema_type(Type::Object)
            .property("count", object(Type::Integer))
            .required("count")
            .build();
        builder = builder.property("meta", RefOr::T(Schema::Object(meta))).required("meta");
    }
    RefOr::T(Schema::Object(builder.build()))
}

fn response_for(entry: &RouteEntry) -> Response {
    let record = RefOr::Ref(Ref::from_schema_name(entry.serializer.ref_name.clone()));
    let (description, schema) = match entry.action {
        Action::List => ("Records ordered by id.", envelope(array_of(record), true)),
        Action::Retrieve => ("A single record.", envelope(record, false)),
        Action::Count => {
            let count = ObjectBuilder::new()
                .schema_type(Type::Object)
                .property("count", object(Type::Integer))
                .required("count")
                .build();
            ("Number of matching records.", envelope(RefOr::T(Schema::Object(count)), false))
        }
    };
    ResponseBuilder::new()
        .description(description)
        .content("application/json", ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn to_parameter(p: &FilterParameter) -> Parameter {
    let ty = match p.schema.ty.as_str() {
        "integer" => Type::Integer,
        "number" => Type::Number,
        "boolean" => Type::Boolean,
        _ => Type::String,
    };
    ParameterBuilder::new()
        .name(p.name.clone())
        .parameter_in(ParameterIn::Query)
        .required(if p.required { Required::True } else { Required::False })
        .description(Some(p.description.clone()))
        .schema(Some(object(ty)))
        .build()
}

fn operation_for(entry: &RouteEntry) -> utoipa::openapi::path::Operation {
    let method = entry.method.clone();
    let mut op = OperationBuilder::new()
        .operation_id(Some(entry.name.clone()))
        .summary(Some(format!("{} {}", entry.action.as_str(), entry.queryset.model.name)));
    match entry.schema.tags_for(&entry.pattern, &method) {
        Ok(tags) => op = op.tags(Some(tags)),
        Err(e) => tracing::warn!(route = %entry.name, error = %e, "operation left untagged"),
    }
    if entry.action == Action::Retrieve {
        op = op.parameter(
            ParameterBuilder::new()
                .name("id")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(object(Type::Integer)))
                .build(),
        );
    }
    for p in entry.schema.filter_parameters_for(entry, &entry.pattern, &method) {
        op = op.parameter(to_parameter(&p));
    }
    op.response("200", response_for(entry)).build()
}

pub fn openapi_for(table: &RouteTable, info: &SchemaInfo) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut components = BTreeMap::new();
    for entry in table.entries() {
        paths = paths.path(entry.pattern.clone(), PathItem::new(HttpMethod::Get, operation_for(entry)));
        collect_components(&entry.queryset, &entry.queryset.model, &entry.serializer, &mut components);
    }
    let mut builder = ComponentsBuilder::new();
    for (name, schema) in components {
        builder = builder.schema(name, schema);
    }
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(info.title.clone())
                .description(Some(info.description.clone()))
                .version(info.version.clone())
                .license(Some(LicenseBuilder::new().name(info.license.clone()).build()))
                .build(),
        )
        .paths(paths.build())
        .components(Some(builder.build()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::registry;
    use crate::routes::routes_for;
    use crate::schema::AutoSchema;
    use serde_json::Value;

    fn info() -> SchemaInfo {
        SchemaInfo {
            title: "Inscriptions API".into(),
            description: "test".into(),
            version: "v1".into(),
            license: "BSD License".into(),
        }
    }

    fn document(entries: Vec<RouteEntry>) -> Value {
        let table = RouteTable::new(entries).unwrap();
        serde_json::to_value(openapi_for(&table, &info())).unwrap()
    }

    #[test]
    fn paths_carry_tags_and_parameters() {
        let registry = registry().unwrap();
        let doc = document(routes_for(&registry, "inscriptions", "api/inscriptions", &[]).unwrap());
        assert_eq!(doc["info"]["title"], "Inscriptions API");
        assert_eq!(doc["info"]["license"]["name"], "BSD License");

        let list = &doc["paths"]["/api/inscriptions/datingcriterion/"]["get"];
        assert_eq!(list["tags"][0], "datingcriterion");
        let names: Vec<_> = list["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"text"));
        assert!(names.contains(&"limit"));

        let retrieve = &doc["paths"]["/api/inscriptions/panel/{id}/"]["get"];
        assert_eq!(retrieve["parameters"][0]["in"], "path");
        assert_eq!(retrieve["parameters"].as_array().unwrap().len(), 1);

        assert!(doc["components"]["schemas"]["inscription"]["properties"]["tags"].is_object());
    }

    #[test]
    fn shallow_route_is_emitted_untagged() {
        let registry = registry().unwrap();
        let mut entries = routes_for(&registry, "inscriptions", "api", &[]).unwrap();
        entries.retain(|e| e.extra["model"] == "tag");
        for e in &mut entries {
            e.pattern = e.pattern.replacen("/api/", "/", 1);
            e.schema = AutoSchema::new();
        }
        let doc = document(entries);
        let list = &doc["paths"]["/tag/"]["get"];
        assert!(list.is_object());
        assert!(list.get("tags").map_or(true, |t| t.is_null()));
    }
}
