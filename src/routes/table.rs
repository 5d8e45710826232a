//! Route entries and the tables that hold them. Built once at startup, shared read-only afterwards.

use crate::error::ConfigError;
use crate::model::QuerySet;
use crate::schema::{AutoSchema, FilterBackend};
use crate::serializer::SerializerDefinition;
use axum::http::Method;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Count,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Count => "count",
        }
    }
}

/// One generated endpoint: path pattern, action, and the data it serves.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    /// `{app}-{model}-{action}`, unique within a table.
    pub name: String,
    /// Path with a leading slash; retrieve patterns contain `{id}`.
    pub pattern: String,
    pub method: Method,
    pub action: Action,
    pub queryset: QuerySet,
    pub serializer: SerializerDefinition,
    pub schema: AutoSchema,
    pub filter_backends: Vec<Arc<dyn FilterBackend>>,
    pub extra: BTreeMap<String, String>,
}

/// Ordered, immutable list of route entries.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Arc<Vec<Arc<RouteEntry>>>,
}

fn check_unique<'a>(entries: impl Iterator<Item = &'a RouteEntry>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for e in entries {
        if !seen.insert((e.pattern.as_str(), e.method.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method: e.method.to_string(),
                pattern: e.pattern.clone(),
            });
        }
    }
    Ok(())
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self, ConfigError> {
        check_unique(entries.iter())?;
        Ok(RouteTable {
            entries: Arc::new(entries.into_iter().map(Arc::new).collect()),
        })
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<RouteEntry>> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// The global route table plus one table per registered app.
#[derive(Clone, Debug, Default)]
pub struct RouteRegistry {
    global: RouteTable,
    apps: BTreeMap<String, RouteTable>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an app's routes to its own table and to the global one.
    pub fn register_app(&mut self, label: &str, entries: Vec<RouteEntry>) -> Result<(), ConfigError> {
        if self.apps.contains_key(label) {
            return Err(ConfigError::DuplicateApp(label.to_string()));
        }
        let app = RouteTable::new(entries)?;
        check_unique(self.global.entries().iter().chain(app.entries()).map(|e| &**e))?;
        let global = self
            .global
            .entries()
            .iter()
            .chain(app.entries())
            .cloned()
            .collect::<Vec<_>>();
        self.global = RouteTable {
            entries: Arc::new(global),
        };
        self.apps.insert(label.to_string(), app);
        Ok(())
    }

    pub fn global(&self) -> &RouteTable {
        &self.global
    }

    pub fn app_labels(&self) -> impl Iterator<Item = &str> {
        self.apps.keys().map(String::as_str)
    }

    pub fn app(&self, label: &str) -> Result<&RouteTable, ConfigError> {
        self.apps
            .get(label)
            .ok_or_else(|| ConfigError::AppNotFound(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::registry;
    use crate::routes::routes_for;

    fn entries(base: &str) -> Vec<RouteEntry> {
        routes_for(&registry().unwrap(), "inscriptions", base, &[]).unwrap()
    }

    #[test]
    fn registering_an_app_extends_the_global_table() {
        let mut routes = RouteRegistry::new();
        routes.register_app("inscriptions", entries("api/inscriptions")).unwrap();
        let app = routes.app("inscriptions").unwrap();
        assert_eq!(app.len(), routes.global().len());
        assert!(routes.global().by_name("inscriptions-panel-list").is_some());
    }

    #[test]
    fn unknown_app_table_fails() {
        let routes = RouteRegistry::new();
        assert!(matches!(routes.app("nope"), Err(ConfigError::AppNotFound(_))));
    }

    #[test]
    fn colliding_patterns_are_rejected() {
        let mut routes = RouteRegistry::new();
        routes.register_app("inscriptions", entries("api/inscriptions")).unwrap();
        assert!(matches!(
            routes.register_app("mirror", entries("api/inscriptions")),
            Err(ConfigError::DuplicateRoute { .. })
        ));
        assert!(routes.app("mirror").is_err());
    }
}
