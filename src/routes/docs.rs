//! API documentation routes: the OpenAPI schema and a ReDoc page that renders it.

use crate::error::ConfigError;
use crate::handlers::docs::{redoc_page, render_redoc, schema_document};
use crate::routes::RouteRegistry;
use crate::schema::{openapi_for, SchemaInfo};
use axum::{routing::get, Router};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocOptions {
    pub app_name: Option<String>,
    pub endpoint: String,
    pub version: String,
    pub license: String,
}

impl Default for DocOptions {
    fn default() -> Self {
        DocOptions {
            app_name: None,
            endpoint: "api".into(),
            version: "v1".into(),
            license: "BSD License".into(),
        }
    }
}

impl DocOptions {
    /// Documentation scoped to one app, served under `api/{app}`.
    pub fn for_app(app: &str) -> Self {
        DocOptions {
            app_name: Some(app.to_string()),
            endpoint: build_app_endpoint(app),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub enum DocKind {
    /// Serves the pre-built OpenAPI document as JSON.
    Schema(Arc<Value>),
    /// ReDoc page pointing at the schema route named `schema_route`.
    Documentation { title: String, schema_route: String },
}

#[derive(Clone, Debug)]
pub struct DocRoute {
    pub name: String,
    pub path: String,
    pub kind: DocKind,
}

pub fn build_app_endpoint(name: &str) -> String {
    format!("api/{}", name)
}

/// `"API Documentation"`, or `"{App} API"` with the first letter upper-cased and the rest lower.
pub fn doc_title(app_name: Option<&str>) -> String {
    match app_name {
        None => "API Documentation".to_string(),
        Some(name) => {
            let mut chars = name.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
                None => String::new(),
            };
            format!("{} API", capitalized)
        }
    }
}

/// Path of the route called `name` among `routes`.
pub fn reverse<'a>(routes: &'a [DocRoute], name: &str) -> Option<&'a str> {
    routes.iter().find(|r| r.name == name).map(|r| r.path.as_str())
}

/// Schema and documentation routes. With an app name the schema covers that app's routes only
/// (unknown apps fail); without one it covers the global table.
pub fn doc_routes(options: &DocOptions, routes: &RouteRegistry) -> Result<[DocRoute; 2], ConfigError> {
    let app = options.app_name.as_deref();
    let table = match app {
        Some(label) => routes.app(label)?,
        None => routes.global(),
    };
    let title = doc_title(app);
    let info = SchemaInfo {
        description: format!(
            "Schema for the {} at the Gothenburg Research Infrastructure in Digital Humanities",
            title
        ),
        title: title.clone(),
        version: options.version.clone(),
        license: options.license.clone(),
    };
    let document = serde_json::to_value(openapi_for(table, &info))
        .map_err(|e| ConfigError::InvalidSetting {
            name: "openapi",
            message: e.to_string(),
        })?;
    let (schema_name, docs_name) = match app {
        Some(label) => (format!("{}-openapi-schema", label), format!("{}-documentation", label)),
        None => ("openapi-schema".to_string(), "api-documentation".to_string()),
    };
    let endpoint = options.endpoint.trim_matches('/');
    tracing::debug!(endpoint, paths = table.len(), "built API documentation");
    Ok([
        DocRoute {
            name: schema_name.clone(),
            path: format!("/{}/schema/", endpoint),
            kind: DocKind::Schema(Arc::new(document)),
        },
        DocRoute {
            name: docs_name,
            path: format!("/{}/documentation/", endpoint),
            kind: DocKind::Documentation {
                title,
                schema_route: schema_name,
            },
        },
    ])
}

/// Mounts documentation routes; works under any router state.
pub fn docs_router<S>(routes: &[DocRoute]) -> Result<Router<S>, ConfigError>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = Router::new();
    for route in routes {
        router = match &route.kind {
            DocKind::Schema(document) => {
                let document = document.clone();
                router.route(&route.path, get(move || schema_document(document)))
            }
            DocKind::Documentation { title, schema_route } => {
                let schema_url = reverse(routes, schema_route)
                    .ok_or_else(|| ConfigError::MissingReference {
                        kind: "route",
                        id: schema_route.clone(),
                    })?
                    .to_string();
                let page = Arc::new(render_redoc(title, &schema_url)?);
                router.route(&route.path, get(move || redoc_page(page)))
            }
        };
    }
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{registry, APP_LABEL};
    use crate::routes::routes_for;

    fn route_registry() -> RouteRegistry {
        let models = registry().unwrap();
        let mut routes = RouteRegistry::new();
        routes
            .register_app(APP_LABEL, routes_for(&models, APP_LABEL, "api/inscriptions", &[]).unwrap())
            .unwrap();
        routes
    }

    #[test]
    fn titles() {
        assert_eq!(doc_title(None), "API Documentation");
        assert_eq!(doc_title(Some("inscriptions")), "Inscriptions API");
        assert_eq!(doc_title(Some("sAINT")), "Saint API");
    }

    #[test]
    fn default_routes_use_global_names() {
        let [schema, docs] = doc_routes(&DocOptions::default(), &route_registry()).unwrap();
        assert_eq!(schema.name, "openapi-schema");
        assert_eq!(schema.path, "/api/schema/");
        assert_eq!(docs.name, "api-documentation");
        assert_eq!(docs.path, "/api/documentation/");
        let DocKind::Schema(doc) = &schema.kind else { panic!("schema route") };
        assert_eq!(doc["info"]["title"], "API Documentation");
        assert_eq!(
            doc["info"]["description"],
            "Schema for the API Documentation at the Gothenburg Research Infrastructure in Digital Humanities"
        );
        assert_eq!(doc["info"]["version"], "v1");
    }

    #[test]
    fn app_routes_are_scoped_and_named() {
        let routes = doc_routes(&DocOptions::for_app(APP_LABEL), &route_registry()).unwrap();
        assert_eq!(routes[0].name, "inscriptions-openapi-schema");
        assert_eq!(routes[0].path, "/api/inscriptions/schema/");
        assert_eq!(routes[1].name, "inscriptions-documentation");
        let DocKind::Documentation { schema_route, title } = &routes[1].kind else { panic!("docs route") };
        assert_eq!(title, "Inscriptions API");
        assert_eq!(reverse(&routes, schema_route), Some("/api/inscriptions/schema/"));
    }

    #[test]
    fn unknown_app_fails_fast() {
        assert!(matches!(
            doc_routes(&DocOptions::for_app("nope"), &route_registry()),
            Err(ConfigError::AppNotFound(_))
        ));
    }

    #[test]
    fn app_endpoint() {
        assert_eq!(build_app_endpoint("inscriptions"), "api/inscriptions");
    }
}
