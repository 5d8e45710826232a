//! Per-route schema inspection: operation tags and filter parameters.

use crate::error::SchemaError;
use crate::routes::{Action, RouteEntry};
use crate::schema::filters::FilterParameter;
use axum::http::Method;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutoSchema {
    /// Explicit operation tags; when empty, tags are inferred from the path.
    pub tags: Vec<String>,
}

impl AutoSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AutoSchema {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Explicit tags, else the third path segment with `_` replaced by `-`:
    /// `/api/inscriptions/mentioned_person/{id}/` is tagged `mentioned-person`.
    pub fn tags_for(&self, path: &str, _method: &Method) -> Result<Vec<String>, SchemaError> {
        if !self.tags.is_empty() {
            return Ok(self.tags.clone());
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        let segment = path
            .split('/')
            .nth(2)
            .ok_or_else(|| SchemaError::ShallowPath(path.to_string()))?;
        Ok(vec![segment.replace('_', "-")])
    }

    pub fn allows_filters(&self, view: &RouteEntry, method: &Method) -> bool {
        *method == Method::GET && matches!(view.action, Action::List | Action::Count)
    }

    /// Query parameters contributed by the view's filter backends, in backend order.
    /// A backend that fails either strategy is logged and contributes nothing.
    pub fn filter_parameters_for(&self, view: &RouteEntry, path: &str, method: &Method) -> Vec<FilterParameter> {
        if !self.allows_filters(view, method) {
            return Vec::new();
        }
        let mut parameters = Vec::new();
        for backend in &view.filter_backends {
            let described = match backend.schema_operation_parameters(view) {
                Some(result) => result,
                None => match backend.filterset(view) {
                    Some(result) => result.map(|set| set.map(|s| s.parameters()).unwrap_or_default()),
                    None => Ok(Vec::new()),
                },
            };
            match described {
                Ok(mut params) => parameters.append(&mut params),
                Err(e) => {
                    tracing::warn!(backend = backend.name(), path = %path, error = %e, "could not get filter parameters");
                }
            }
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::registry;
    use crate::error::AppError;
    use crate::routes::routes_for;
    use crate::schema::filters::{FilterBackend, FilterSet, PaginationBackend};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn entry(action: Action) -> RouteEntry {
        let registry = registry().unwrap();
        routes_for(&registry, "inscriptions", "api/inscriptions", &[])
            .unwrap()
            .into_iter()
            .find(|e| e.action == action && e.extra["model"] == "tag")
            .unwrap()
    }

    #[derive(Debug)]
    struct Broken;

    impl FilterBackend for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn filterset(&self, _view: &RouteEntry) -> Option<Result<Option<FilterSet>, SchemaError>> {
            Some(Err(SchemaError::Backend {
                backend: "Broken".into(),
                message: "incompatible version".into(),
            }))
        }

        fn filter_queryset(
            &self,
            _view: &RouteEntry,
            _params: &HashMap<String, String>,
        ) -> Result<Vec<(String, Value)>, AppError> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct Silent;

    impl FilterBackend for Silent {
        fn name(&self) -> &str {
            "Silent"
        }
    }

    #[test]
    fn tag_is_third_segment_with_dashes() {
        let s = AutoSchema::new();
        assert_eq!(
            s.tags_for("/api/inscriptions/mentioned_person/", &Method::GET).unwrap(),
            ["mentioned-person"]
        );
        assert_eq!(
            s.tags_for("api/inscriptions/extra_alphabetical_sign/{id}/", &Method::GET).unwrap(),
            ["extra-alphabetical-sign"]
        );
    }

    #[test]
    fn explicit_tags_win() {
        let s = AutoSchema::with_tags(["catalog"]);
        assert_eq!(s.tags_for("/x", &Method::GET).unwrap(), ["catalog"]);
    }

    #[test]
    fn shallow_path_is_an_error() {
        let s = AutoSchema::new();
        assert!(matches!(
            s.tags_for("/api/schema", &Method::GET),
            Err(SchemaError::ShallowPath(_))
        ));
    }

    #[test]
    fn retrieve_routes_have_no_filter_parameters() {
        let view = entry(Action::Retrieve);
        assert!(view
            .schema
            .filter_parameters_for(&view, &view.pattern, &Method::GET)
            .is_empty());
    }

    #[test]
    fn non_get_methods_are_not_filtered() {
        let view = entry(Action::List);
        assert!(view
            .schema
            .filter_parameters_for(&view, &view.pattern, &Method::POST)
            .is_empty());
    }

    #[test]
    fn list_routes_collect_parameters_in_backend_order() {
        let view = entry(Action::List);
        let names: Vec<_> = view
            .schema
            .filter_parameters_for(&view, &view.pattern, &Method::GET)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["id", "created_at", "updated_at", "text", "limit", "offset"]);
    }

    #[test]
    fn failing_backend_degrades_to_nothing() {
        let mut view = entry(Action::Count);
        view.filter_backends = vec![Arc::new(Broken), Arc::new(Silent), Arc::new(PaginationBackend)];
        let params = view.schema.filter_parameters_for(&view, &view.pattern, &Method::GET);
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["limit", "offset"]);
        assert_eq!(params[0].schema.ty, "integer");
    }
}
