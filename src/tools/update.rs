//! Bulk inscription update from an edited CSV.
//!
//! Columns are matched to model fields by name. Only changed values are written; every row
//! is independent, so a bad row is counted and the run goes on.

use crate::error::{AppError, ConfigError};
use crate::model::{scalar_fields_of, ModelDescriptor, DEFAULT_EXCLUDE, DEFAULT_FIELDS};
use crate::service::InscriptionStore;
use crate::tools::csv_input::CsvTable;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Plain fields a CSV may overwrite: everything but the primary key and bookkeeping columns.
pub fn updatable_fields(model: &ModelDescriptor) -> Vec<String> {
    let exclude: Vec<&str> = DEFAULT_FIELDS.iter().chain(DEFAULT_EXCLUDE).copied().collect();
    scalar_fields_of(model, &exclude)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Records with at least one changed field.
    pub updated: usize,
    pub errors: usize,
    pub matching_fields: Vec<String>,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Finished!")?;
        writeln!(f, "Updated: {}", self.updated)?;
        write!(f, "Errors: {}", self.errors)
    }
}

/// Changed `(field, new value)` pairs; values compare trimmed, NULL as "".
fn changes_for(
    row: &[String],
    columns: &[(usize, String)],
    current: &HashMap<String, Option<String>>,
) -> Vec<(String, String)> {
    columns
        .iter()
        .filter_map(|(col, field)| {
            let new_value = row.get(*col).map(|v| v.trim())?;
            let old_value = current
                .get(field)
                .and_then(|v| v.as_deref())
                .unwrap_or("")
                .trim();
            (new_value != old_value).then(|| (field.clone(), new_value.to_string()))
        })
        .collect()
}

/// Applies `csv_path` to the records behind `store`. Fails only when the CSV itself is unusable.
pub async fn update_inscriptions(
    store: &dyn InscriptionStore,
    model: &ModelDescriptor,
    csv_path: &Path,
) -> Result<UpdateReport, AppError> {
    let table = CsvTable::read(csv_path)?;
    tracing::info!(csv = %csv_path.display(), columns = ?table.headers, "reading CSV");
    let id_col = table.require("id")?;
    let updatable = updatable_fields(model);
    let columns: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| updatable.contains(h))
        .map(|(i, h)| (i, h.clone()))
        .collect();
    let matching_fields: Vec<String> = columns.iter().map(|(_, f)| f.clone()).collect();
    tracing::info!(fields = ?matching_fields, "matching model fields");
    if columns.is_empty() {
        return Err(ConfigError::NoMatchingColumns.into());
    }

    let mut report = UpdateReport {
        errors: table.malformed,
        matching_fields,
        ..UpdateReport::default()
    };
    for (i, row) in table.rows.iter().enumerate() {
        let row_num = i + 2;
        let raw_id = table.cell(row, id_col).trim();
        if raw_id.is_empty() {
            tracing::warn!(row = row_num, "missing id, skipping");
            report.errors += 1;
            continue;
        }
        let Ok(id) = raw_id.parse::<i64>() else {
            tracing::warn!(row = row_num, id = raw_id, "id is not an integer, skipping");
            report.errors += 1;
            continue;
        };
        let current = match store.current_values(id, &report.matching_fields).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                tracing::warn!(row = row_num, id, "inscription not found");
                report.errors += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(row = row_num, id, error = %e, "could not load inscription");
                report.errors += 1;
                continue;
            }
        };
        let changes = changes_for(row, &columns, &current);
        if changes.is_empty() {
            continue;
        }
        match store.update_fields(id, &changes).await {
            Ok(()) => {
                for (field, _) in &changes {
                    tracing::info!(row = row_num, id, field = %field, "updated");
                }
                report.updated += 1;
            }
            Err(e) => {
                tracing::warn!(row = row_num, id, error = %e, "update failed");
                report.errors += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::inscriptions_app;

    #[test]
    fn bookkeeping_and_relations_are_not_updatable() {
        let app = inscriptions_app();
        let fields = updatable_fields(app.get_model("inscription").unwrap());
        assert!(fields.contains(&"comments_eng".to_string()));
        assert!(fields.contains(&"transcription".to_string()));
        for absent in ["id", "created_at", "updated_at", "panel", "tags"] {
            assert!(!fields.contains(&absent.to_string()), "{absent}");
        }
    }
}
