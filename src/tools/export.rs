//! Inscription export to CSV in two layouts: the 21-column basic sheet and the 32-column full sheet.

use crate::error::AppError;
use crate::model::AppConfig;
use crate::service::fetch_export_rows;
use crate::sql::export::{ExportColumn, Selection};
use chrono::{DateTime, Local};
use sqlx::PgPool;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportVariant {
    /// Scalar and lookup columns of inscriptions with a transcription.
    Basic,
    /// Adds joined many-to-many lists and timestamps. With `include_empty_text_fields`, also
    /// exports inscriptions whose transcription is empty but which have another text field,
    /// an author, or a mentioned person.
    Full { include_empty_text_fields: bool },
}

const BASIC_COLUMNS: [ExportColumn; 21] = [
    ExportColumn::field("id"),
    ExportColumn::field("title"),
    ExportColumn::field("position_on_surface"),
    ExportColumn::related("panel_title", "panel", Some("title")),
    ExportColumn::related("panel_room", "panel", Some("room")),
    ExportColumn::related("type_of_inscription", "type_of_inscription", None),
    ExportColumn::field("elevation"),
    ExportColumn::field("height"),
    ExportColumn::field("width"),
    ExportColumn::related("language", "language", None),
    ExportColumn::related("writing_system", "writing_system", None),
    ExportColumn::field("min_year"),
    ExportColumn::field("max_year"),
    ExportColumn::field("transcription"),
    ExportColumn::field("interpretative_edition"),
    ExportColumn::field("romanisation"),
    ExportColumn::related("inscriber", "inscriber", None),
    ExportColumn::field("translation_eng"),
    ExportColumn::field("translation_ukr"),
    ExportColumn::field("comments_eng"),
    ExportColumn::field("comments_ukr"),
];

const FULL_COLUMNS: [ExportColumn; 32] = [
    ExportColumn::field("id"),
    ExportColumn::field("title"),
    ExportColumn::field("position_on_surface"),
    ExportColumn::related("panel_title", "panel", Some("title")),
    ExportColumn::related("panel_room", "panel", Some("room")),
    ExportColumn::related("type_of_inscription", "type_of_inscription", None),
    ExportColumn::joined("genres", "genre"),
    ExportColumn::joined("tags", "tags"),
    ExportColumn::field("elevation"),
    ExportColumn::field("height"),
    ExportColumn::field("width"),
    ExportColumn::related("language", "language", None),
    ExportColumn::related("writing_system", "writing_system", None),
    ExportColumn::field("min_year"),
    ExportColumn::field("max_year"),
    ExportColumn::joined("dating_criteria", "dating_criteria"),
    ExportColumn::field("transcription"),
    ExportColumn::field("interpretative_edition"),
    ExportColumn::field("romanisation"),
    ExportColumn::joined("mentioned_persons", "mentioned_person"),
    ExportColumn::related("inscriber", "inscriber", None),
    ExportColumn::field("translation_eng"),
    ExportColumn::field("translation_ukr"),
    ExportColumn::field("comments_eng"),
    ExportColumn::field("comments_ukr"),
    ExportColumn::joined("conditions", "condition"),
    ExportColumn::joined("alignments", "alignment"),
    ExportColumn::joined("extra_alphabetical_signs", "extra_alphabetical_sign"),
    ExportColumn::joined("bibliography_items", "bibliography"),
    ExportColumn::joined("authors", "author"),
    ExportColumn::field("created_at"),
    ExportColumn::field("updated_at"),
];

/// Text fields that qualify an inscription for the widened full export.
const TEXT_FIELDS: &[&str] = &[
    "transcription",
    "interpretative_edition",
    "romanisation",
    "translation_eng",
    "translation_ukr",
];

impl ExportVariant {
    pub fn columns(&self) -> &'static [ExportColumn] {
        match self {
            ExportVariant::Basic => &BASIC_COLUMNS,
            ExportVariant::Full { .. } => &FULL_COLUMNS,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.header).collect()
    }

    pub fn selection(&self) -> Selection {
        match self {
            ExportVariant::Full {
                include_empty_text_fields: true,
            } => Selection {
                text_fields: TEXT_FIELDS.to_vec(),
                related_any: vec!["author", "mentioned_person"],
            },
            _ => Selection {
                text_fields: vec!["transcription"],
                related_any: Vec::new(),
            },
        }
    }

    /// `inscriptions_<ts>.csv` or `inscriptions_with_transcription_<ts>.csv`.
    pub fn default_filename(&self, now: DateTime<Local>) -> String {
        let ts = now.format("%Y%m%d_%H%M%S");
        match self {
            ExportVariant::Basic => format!("inscriptions_{}.csv", ts),
            ExportVariant::Full { .. } => format!("inscriptions_with_transcription_{}.csv", ts),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Queries the selected inscriptions and writes them to `output` (or the variant's timestamped
/// default name in the working directory).
pub async fn export_inscriptions(
    pool: &PgPool,
    schema: &str,
    app: &AppConfig,
    variant: ExportVariant,
    output: Option<PathBuf>,
) -> Result<ExportReport, AppError> {
    let model = app.get_model("inscription").ok_or_else(|| {
        AppError::Config(crate::error::ConfigError::MissingReference {
            kind: "model",
            id: "inscription".into(),
        })
    })?;
    let path = output.unwrap_or_else(|| PathBuf::from(variant.default_filename(Local::now())));
    tracing::info!(path = %path.display(), ?variant, "exporting inscriptions");
    let rows = fetch_export_rows(pool, schema, app, model, variant.columns(), &variant.selection()).await?;
    if rows.is_empty() {
        tracing::warn!("no inscriptions matched; writing header only");
    } else {
        tracing::info!(rows = rows.len(), "found inscriptions");
    }
    write_csv(&path, &variant.headers(), &rows)?;
    let bytes = std::fs::metadata(&path)?.len();
    Ok(ExportReport {
        path,
        rows: rows.len(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::inscriptions_app;
    use crate::sql::export::select_export_rows;
    use chrono::TimeZone;

    #[test]
    fn column_counts() {
        assert_eq!(ExportVariant::Basic.headers().len(), 21);
        let full = ExportVariant::Full {
            include_empty_text_fields: false,
        };
        assert_eq!(full.headers().len(), 32);
        assert_eq!(full.headers()[6], "genres");
        assert_eq!(full.headers()[31], "updated_at");
    }

    #[test]
    fn every_column_resolves_against_the_catalog() {
        let app = inscriptions_app();
        let model = app.get_model("inscription").unwrap();
        for variant in [
            ExportVariant::Basic,
            ExportVariant::Full {
                include_empty_text_fields: true,
            },
        ] {
            assert!(select_export_rows(&app, model, variant.columns(), &variant.selection(), "public").is_ok());
        }
    }

    #[test]
    fn widened_selection_only_with_flag() {
        assert_eq!(ExportVariant::Basic.selection().text_fields, ["transcription"]);
        let narrow = ExportVariant::Full {
            include_empty_text_fields: false,
        };
        assert!(narrow.selection().related_any.is_empty());
        let wide = ExportVariant::Full {
            include_empty_text_fields: true,
        };
        assert_eq!(wide.selection().related_any, ["author", "mentioned_person"]);
        assert_eq!(wide.selection().text_fields.len(), 5);
    }

    #[test]
    fn default_filenames_are_timestamped() {
        let now = Local.with_ymd_and_hms(2024, 8, 12, 12, 34, 56).unwrap();
        assert_eq!(ExportVariant::Basic.default_filename(now), "inscriptions_20240812_123456.csv");
        assert_eq!(
            ExportVariant::Full {
                include_empty_text_fields: false
            }
            .default_filename(now),
            "inscriptions_with_transcription_20240812_123456.csv"
        );
    }

    #[test]
    fn csv_is_written_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &["id", "title"], &[vec!["1".into(), "Graffito, with comma".into()]]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,title\n1,\"Graffito, with comma\"\n");
    }
}
