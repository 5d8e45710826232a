//! Generated model routes: list, retrieve, and count for every model of an app.

use crate::error::ConfigError;
use crate::handlers::model as handlers;
use crate::model::{ModelRegistry, QuerySet};
use crate::routes::{Action, RouteEntry, RouteTable};
use crate::schema::{default_filter_backends, AutoSchema};
use crate::serializer::default_serializer;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::get,
    Router,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

fn pattern(base_url: &str, model: &str, action: Action) -> String {
    let base = base_url.trim_matches('/');
    let prefix = if base.is_empty() {
        format!("/{}", model)
    } else {
        format!("/{}/{}", base, model)
    };
    match action {
        Action::List => format!("{}/", prefix),
        Action::Retrieve => format!("{}/{{id}}/", prefix),
        Action::Count => format!("{}/count/", prefix),
    }
}

/// List, retrieve, and count entries (in that order) for every model of `app_label` not in `exclude`.
pub fn routes_for(
    registry: &ModelRegistry,
    app_label: &str,
    base_url: &str,
    exclude: &[&str],
) -> Result<Vec<RouteEntry>, ConfigError> {
    let app = registry.get_app_config(app_label)?;
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for model in app.models() {
        if exclude.contains(&model.name.as_str()) {
            continue;
        }
        for action in [Action::List, Action::Retrieve, Action::Count] {
            let pattern = pattern(base_url, &model.name, action);
            if !seen.insert(pattern.clone()) {
                return Err(ConfigError::DuplicateRoute {
                    method: Method::GET.to_string(),
                    pattern,
                });
            }
            entries.push(RouteEntry {
                name: format!("{}-{}-{}", app.label, model.name, action.as_str()),
                pattern,
                method: Method::GET,
                action,
                queryset: QuerySet::all(app.clone(), model.clone()),
                serializer: default_serializer(model),
                schema: AutoSchema::new(),
                filter_backends: default_filter_backends(),
                extra: BTreeMap::from([("model".to_string(), model.name.clone())]),
            });
        }
    }
    tracing::debug!(app = app_label, routes = entries.len(), "generated model routes");
    Ok(entries)
}

/// `{id}` placeholders in axum's `:id` form.
fn axum_path(pattern: &str) -> String {
    pattern.replace("{id}", ":id")
}

/// The pattern and, for slash-terminated patterns, its bare twin.
fn with_bare(pattern: &str) -> Vec<String> {
    let path = axum_path(pattern);
    match path.strip_suffix('/') {
        Some(bare) if !bare.is_empty() => vec![path.clone(), bare.to_string()],
        _ => vec![path],
    }
}

/// Mounts every entry of `table` on its pattern.
pub fn model_router(table: &RouteTable) -> Router<AppState> {
    let mut router = Router::new();
    for entry in table.entries() {
        for path in with_bare(&entry.pattern) {
            let entry: Arc<RouteEntry> = entry.clone();
            let action = entry.action;
            router = match action {
                Action::List => router.route(
                    &path,
                    get(
                        move |State(state): State<AppState>, Query(params): Query<HashMap<String, String>>| async move {
                            handlers::list(state, &entry, params).await
                        },
                    ),
                ),
                Action::Retrieve => router.route(
                    &path,
                    get(move |State(state): State<AppState>, Path(id): Path<String>| async move {
                        handlers::retrieve(state, &entry, id).await
                    }),
                ),
                Action::Count => router.route(
                    &path,
                    get(
                        move |State(state): State<AppState>, Query(params): Query<HashMap<String, String>>| async move {
                            handlers::count(state, &entry, params).await
                        },
                    ),
                ),
            };
        }
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{registry, APP_LABEL};

    #[test]
    fn three_routes_per_model_in_order() {
        let registry = registry().unwrap();
        let entries = routes_for(&registry, APP_LABEL, "api/inscriptions", &[]).unwrap();
        let app = registry.get_app_config(APP_LABEL).unwrap();
        assert_eq!(entries.len(), app.models().count() * 3);
        let panel: Vec<_> = entries
            .iter()
            .filter(|e| e.extra["model"] == "panel")
            .map(|e| (e.action, e.pattern.as_str()))
            .collect();
        assert_eq!(
            panel,
            [
                (Action::List, "/api/inscriptions/panel/"),
                (Action::Retrieve, "/api/inscriptions/panel/{id}/"),
                (Action::Count, "/api/inscriptions/panel/count/"),
            ]
        );
    }

    #[test]
    fn excluded_models_get_no_routes() {
        let registry = registry().unwrap();
        let entries = routes_for(&registry, APP_LABEL, "api", &["tag", "genre"]).unwrap();
        assert!(entries.iter().all(|e| e.extra["model"] != "tag" && e.extra["model"] != "genre"));
        assert!(entries.iter().any(|e| e.extra["model"] == "inscription"));
    }

    #[test]
    fn unknown_app_fails_fast() {
        let registry = registry().unwrap();
        assert!(matches!(
            routes_for(&registry, "nope", "api", &[]),
            Err(ConfigError::AppNotFound(_))
        ));
    }

    #[test]
    fn each_entry_owns_its_serializer() {
        let registry = registry().unwrap();
        let mut entries = routes_for(&registry, APP_LABEL, "api", &[]).unwrap();
        entries[0].serializer.fields.clear();
        assert!(!entries[1].serializer.fields.is_empty());
        assert_eq!(entries[1].serializer.ref_name, entries[1].extra["model"]);
    }

    #[test]
    fn bare_twins_for_slash_patterns() {
        assert_eq!(
            with_bare("/api/tag/{id}/"),
            ["/api/tag/:id/".to_string(), "/api/tag/:id".to_string()]
        );
        assert_eq!(with_bare("/"), ["/".to_string()]);
    }
}
