//! Combined datasets: inscription CSV rows joined with their downloaded annotation files.
//!
//! `create_dataset` flattens every annotation item into its own row; `create_simple_dataset`
//! keeps one row per inscription and only records whether annotations exist.

use crate::error::AppError;
use crate::tools::annotations::{annotation_count, annotation_file};
use crate::tools::csv_input::CsvTable;
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// `combined_dataset_<ts>.csv`.
pub fn dataset_filename(now: DateTime<Local>) -> String {
    format!("combined_dataset_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// One output row: ordered `(column, value)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetRow {
    cells: Vec<(String, String)>,
}

impl DatasetRow {
    fn from_csv(headers: &[String], row: &[String]) -> Self {
        let mut out = DatasetRow::default();
        for (i, h) in headers.iter().enumerate() {
            out.set(h, row.get(i).cloned().unwrap_or_default());
        }
        out
    }

    /// Overwrites in place when the column exists, else appends.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| k == key) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    fn annotation_index(&self) -> i64 {
        self.get("annotation_index")
            .and_then(|v| v.parse().ok())
            .unwrap_or(-1)
    }
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Cell text of a JSON value: strings unquoted, null empty, booleans capitalised.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => bool_text(*b).to_string(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn apply_annotation(entry: &mut DatasetRow, annotation: &Map<String, Value>) {
    entry.set(
        "annotation_geometry_type",
        annotation.get("type").map(value_text).unwrap_or_default(),
    );
    if let Some(Value::Object(props)) = annotation.get("properties") {
        for (key, value) in props {
            entry.set(&format!("annotation_{}", key), value_text(value));
        }
    }
    let empty = Map::new();
    let geometry = match annotation.get("geometry") {
        Some(Value::Object(g)) => g,
        _ => &empty,
    };
    entry.set(
        "annotation_geometry",
        geometry.get("type").map(value_text).unwrap_or_default(),
    );
    match geometry.get("coordinates") {
        Some(coords) if truthy(coords) => {
            entry.set("annotation_has_coordinates", "True");
            if let Value::Array(items) = coords {
                let count = if matches!(items.first(), Some(Value::Array(_))) {
                    items.len()
                } else {
                    1
                };
                entry.set("annotation_coord_count", count.to_string());
            }
        }
        _ => {
            entry.set("annotation_has_coordinates", "False");
            entry.set("annotation_coord_count", "0");
        }
    }
}

fn unannotated(base: &DatasetRow, flag: &str, value: &str) -> DatasetRow {
    let mut entry = base.clone();
    entry.set("annotation_index", "-1");
    entry.set("total_annotations_for_inscription", "0");
    entry.set(flag, value);
    entry
}

/// Output rows for one inscription row.
pub fn merge_row(headers: &[String], row: &[String], annotations_dir: &Path, id: &str) -> Vec<DatasetRow> {
    let base = DatasetRow::from_csv(headers, row);
    let path = match annotation_file(annotations_dir, id) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(error = %e, "skipping annotation lookup");
            return vec![unannotated(&base, "annotation_error", &e.to_string())];
        }
    };
    if !path.exists() {
        return vec![unannotated(&base, "annotation_missing", "True")];
    }
    let parsed = std::fs::read(&path)
        .map_err(AppError::from)
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(AppError::from));
    let root = match parsed {
        Ok(root) => root,
        Err(e) => {
            tracing::warn!(inscription = id, error = %e, "could not read annotation file");
            return vec![unannotated(&base, "annotation_error", &e.to_string())];
        }
    };
    let items = match root {
        Value::Array(items) => items,
        other => vec![other],
    };
    if items.is_empty() {
        let mut entry = base;
        entry.set("annotation_index", "-1");
        entry.set("total_annotations_for_inscription", "0");
        return vec![entry];
    }
    let total = items.len();
    items
        .iter()
        .enumerate()
        .map(|(i, annotation)| {
            let mut entry = base.clone();
            entry.set("annotation_index", i.to_string());
            entry.set("total_annotations_for_inscription", total.to_string());
            if let Value::Object(fields) = annotation {
                apply_annotation(&mut entry, fields);
            }
            entry
        })
        .collect()
}

/// Merged rows for every record of `table`, in input order.
pub fn merge_table(table: &CsvTable, annotations_dir: &Path) -> Result<Vec<DatasetRow>, AppError> {
    let id_col = table.require("id")?;
    let mut out = Vec::new();
    for row in &table.rows {
        let id = table.cell(row, id_col).trim();
        out.extend(merge_row(&table.headers, row, annotations_dir, id));
    }
    Ok(out)
}

/// Column union of `rows` in first-seen order.
pub fn header_union(rows: &[DatasetRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key) {
                header.push(key.to_string());
            }
        }
    }
    header
}

pub fn write_rows(path: &Path, header: &[String], rows: &[DatasetRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(header.iter().map(|h| row.get(h).unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeSummary {
    /// `None` when there was nothing to write.
    pub path: Option<PathBuf>,
    pub total_rows: usize,
    pub unique_inscriptions: usize,
    pub inscriptions_with_annotations: usize,
    pub annotation_rows: usize,
    pub annotation_types: BTreeSet<String>,
}

impl MergeSummary {
    pub fn from_rows(rows: &[DatasetRow]) -> Self {
        let mut all = HashSet::new();
        let mut annotated = HashSet::new();
        let mut annotation_rows = 0;
        let mut annotation_types = BTreeSet::new();
        for row in rows {
            let id = row.get("id").unwrap_or("");
            all.insert(id);
            if row.annotation_index() >= 0 {
                annotated.insert(id);
                annotation_rows += 1;
            }
            for (key, value) in &row.cells {
                if key.starts_with("annotation_type") && !value.is_empty() {
                    annotation_types.insert(value.clone());
                }
            }
        }
        MergeSummary {
            path: None,
            total_rows: rows.len(),
            unique_inscriptions: all.len(),
            inscriptions_with_annotations: annotated.len(),
            annotation_rows,
            annotation_types,
        }
    }

    pub fn coverage(&self) -> Option<f64> {
        (self.unique_inscriptions > 0)
            .then(|| self.inscriptions_with_annotations as f64 / self.unique_inscriptions as f64 * 100.0)
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset summary:")?;
        writeln!(f, "  Total rows (one per annotation): {}", self.total_rows)?;
        writeln!(f, "  Total unique inscriptions: {}", self.unique_inscriptions)?;
        writeln!(f, "  Inscriptions with annotations: {}", self.inscriptions_with_annotations)?;
        write!(f, "  Rows with annotation data: {}", self.annotation_rows)?;
        if let Some(pct) = self.coverage() {
            write!(f, "\n  Coverage: {:.1}% inscriptions have annotations", pct)?;
        }
        if !self.annotation_types.is_empty() {
            let types: Vec<&str> = self.annotation_types.iter().map(String::as_str).collect();
            write!(f, "\n  Annotation types found: {}", types.join(", "))?;
        }
        Ok(())
    }
}

/// Flattened dataset of `csv_path` and the annotation files in `annotations_dir`, written to
/// `output`. Nothing is written when the input has no rows.
pub fn create_dataset(csv_path: &Path, annotations_dir: &Path, output: &Path) -> Result<MergeSummary, AppError> {
    tracing::info!(csv = %csv_path.display(), "creating combined dataset");
    let table = CsvTable::read(csv_path)?;
    let rows = merge_table(&table, annotations_dir)?;
    let mut summary = MergeSummary::from_rows(&rows);
    if rows.is_empty() {
        tracing::warn!("no data to process");
        return Ok(summary);
    }
    write_rows(output, &header_union(&rows), &rows)?;
    tracing::info!(path = %output.display(), rows = rows.len(), "combined dataset saved");
    summary.path = Some(output.to_path_buf());
    Ok(summary)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleSummary {
    pub path: PathBuf,
    pub total: usize,
    pub with_annotations: usize,
}

impl fmt::Display for SimpleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        write!(f, "  Total inscriptions: {}", self.total)?;
        if self.total > 0 {
            write!(
                f,
                "\n  With annotations: {} ({:.1}%)",
                self.with_annotations,
                self.with_annotations as f64 / self.total as f64 * 100.0
            )?;
        }
        write!(f, "\n  Without annotations: {}", self.total - self.with_annotations)
    }
}

/// One row per inscription plus `has_annotation`, `num_annotations` and `transcription_length`.
pub fn create_simple_dataset(
    csv_path: &Path,
    annotations_dir: &Path,
    output: &Path,
) -> Result<SimpleSummary, AppError> {
    let table = CsvTable::read(csv_path)?;
    let id_col = table.require("id")?;
    let transcription_col = table.require("transcription")?;
    let mut header = table.headers.clone();
    header.extend(["has_annotation", "num_annotations", "transcription_length"].map(String::from));

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut with_annotations = 0;
    for row in &table.rows {
        let path = annotation_file(annotations_dir, table.cell(row, id_col).trim()).ok();
        let has_annotation = path.as_deref().is_some_and(Path::exists);
        let num_annotations = match path.filter(|_| has_annotation) {
            Some(path) => {
                with_annotations += 1;
                std::fs::read(&path)
                    .ok()
                    .and_then(|body| annotation_count(&body))
                    .unwrap_or(0)
            }
            None => 0,
        };
        let mut entry = DatasetRow::from_csv(&table.headers, row);
        entry.set("has_annotation", bool_text(has_annotation));
        entry.set("num_annotations", num_annotations.to_string());
        entry.set(
            "transcription_length",
            table.cell(row, transcription_col).chars().count().to_string(),
        );
        rows.push(entry);
    }
    write_rows(output, &header, &rows)?;
    tracing::info!(path = %output.display(), rows = rows.len(), "combined dataset saved");
    Ok(SimpleSummary {
        path: output.to_path_buf(),
        total: rows.len(),
        with_annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers() -> Vec<String> {
        vec!["id".into(), "panel_title".into()]
    }

    fn write_annotation(dir: &Path, id: &str, body: &str) {
        std::fs::write(annotation_file(dir, id).unwrap(), body).unwrap();
    }

    #[test]
    fn list_root_yields_one_row_per_item() {
        let dir = tempfile::tempdir().unwrap();
        write_annotation(
            dir.path(),
            "12",
            &json!([
                {"type": "Feature", "properties": {"type": "graffiti", "note": null},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3, 4]}}
            ])
            .to_string(),
        );
        let rows = merge_row(&headers(), &["12".into(), "208-02".into()], dir.path(), "12");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("annotation_index"), Some("0"));
        assert_eq!(rows[0].get("total_annotations_for_inscription"), Some("2"));
        assert_eq!(rows[0].get("annotation_type"), Some("graffiti"));
        assert_eq!(rows[0].get("annotation_note"), Some(""));
        assert_eq!(rows[0].get("annotation_geometry"), Some("Polygon"));
        assert_eq!(rows[0].get("annotation_coord_count"), Some("1"));
        assert_eq!(rows[1].get("annotation_geometry"), Some("Point"));
        assert_eq!(rows[1].get("annotation_has_coordinates"), Some("True"));
        assert_eq!(rows[1].get("annotation_coord_count"), Some("1"));
    }

    #[test]
    fn object_root_and_empty_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        write_annotation(dir.path(), "3", r#"{"type": "Feature", "geometry": {"coordinates": []}}"#);
        let rows = merge_row(&headers(), &["3".into(), "x".into()], dir.path(), "3");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("annotation_has_coordinates"), Some("False"));
        assert_eq!(rows[0].get("annotation_coord_count"), Some("0"));
        assert_eq!(rows[0].get("annotation_geometry"), Some(""));
    }

    #[test]
    fn missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = merge_row(&headers(), &["1".into(), "a".into()], dir.path(), "1");
        assert_eq!(missing[0].get("annotation_index"), Some("-1"));
        assert_eq!(missing[0].get("annotation_missing"), Some("True"));

        write_annotation(dir.path(), "2", "{not json");
        let broken = merge_row(&headers(), &["2".into(), "b".into()], dir.path(), "2");
        assert_eq!(broken[0].get("total_annotations_for_inscription"), Some("0"));
        assert!(broken[0].get("annotation_error").is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn empty_list_root_keeps_the_inscription() {
        let dir = tempfile::tempdir().unwrap();
        write_annotation(dir.path(), "5", "[]");
        let rows = merge_row(&headers(), &["5".into(), "p".into()], dir.path(), "5");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some("5"));
        assert_eq!(rows[0].get("panel_title"), Some("p"));
        assert_eq!(rows[0].get("annotation_index"), Some("-1"));
        assert_eq!(rows[0].get("total_annotations_for_inscription"), Some("0"));
        assert_eq!(rows[0].get("annotation_missing"), None);
        assert_eq!(rows[0].get("annotation_error"), None);
        assert_eq!(MergeSummary::from_rows(&rows).inscriptions_with_annotations, 0);
    }

    #[test]
    fn id_outside_the_annotation_directory_is_an_error_row() {
        let dir = tempfile::tempdir().unwrap();
        let rows = merge_row(&headers(), &["../x".into(), "p".into()], dir.path(), "../x");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("annotation_index"), Some("-1"));
        assert!(rows[0].get("annotation_error").is_some_and(|e| e.contains("../x")));
    }

    #[test]
    fn header_union_keeps_first_seen_order() {
        let mut a = DatasetRow::default();
        a.set("id", "1");
        a.set("annotation_missing", "True");
        let mut b = DatasetRow::default();
        b.set("id", "2");
        b.set("annotation_error", "boom");
        b.set("annotation_missing", "");
        assert_eq!(header_union(&[a, b]), ["id", "annotation_missing", "annotation_error"]);
    }

    #[test]
    fn summary_counts_annotated_inscriptions() {
        let mut rows = Vec::new();
        for (id, index, ty) in [("1", "0", "graffiti"), ("1", "1", "drawing"), ("2", "-1", "")] {
            let mut r = DatasetRow::default();
            r.set("id", id);
            r.set("annotation_index", index);
            r.set("annotation_type", ty);
            rows.push(r);
        }
        let s = MergeSummary::from_rows(&rows);
        assert_eq!(s.total_rows, 3);
        assert_eq!(s.unique_inscriptions, 2);
        assert_eq!(s.inscriptions_with_annotations, 1);
        assert_eq!(s.annotation_rows, 2);
        assert_eq!(s.coverage(), Some(50.0));
        assert_eq!(s.annotation_types.into_iter().collect::<Vec<_>>(), ["drawing", "graffiti"]);
    }

    #[test]
    fn simple_dataset_columns() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("in.csv");
        std::fs::write(&csv_path, "id,panel_title,transcription\n1,208-02,ΚΕ ΒΟΗΘΙ\n2,,\n").unwrap();
        let ann = dir.path().join("annotations");
        std::fs::create_dir(&ann).unwrap();
        write_annotation(&ann, "1", "[{}, {}, {}]");
        let out = dir.path().join("combined.csv");
        let summary = create_simple_dataset(&csv_path, &ann, &out).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.with_annotations, 1);
        let text = std::fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,panel_title,transcription,has_annotation,num_annotations,transcription_length")
        );
        assert_eq!(lines.next(), Some("1,208-02,ΚΕ ΒΟΗΘΙ,True,3,8"));
        assert_eq!(lines.next(), Some("2,,,False,0,0"));
    }
}
