//! Annotation download from the remote Saint Sophia annotation API.
//!
//! One GET per inscription row with a panel title, a fixed pause after every request, no retries.
//! A 200 body is stored byte for byte as `annotation_<id>.json`.

use crate::error::AppError;
use crate::tools::csv_input::CsvTable;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ANNOTATION_PATH: &str = "/api/inscriptions/annotation/";
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200: the raw response body.
    Found(Vec<u8>),
    /// 404: the surface has no annotation.
    NotFound,
}

#[async_trait]
pub trait AnnotationSource: Send + Sync {
    /// Annotation for one surface. Statuses other than 200 and 404 are errors.
    async fn fetch(&self, surface: &str) -> Result<FetchOutcome, AppError>;
}

pub struct HttpAnnotationSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnnotationSource {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpAnnotationSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ANNOTATION_PATH)
    }
}

#[async_trait]
impl AnnotationSource for HttpAnnotationSource {
    async fn fetch(&self, surface: &str) -> Result<FetchOutcome, AppError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("surface", surface)])
            .send()
            .await?;
        match response.status().as_u16() {
            200 => Ok(FetchOutcome::Found(response.bytes().await?.to_vec())),
            404 => Ok(FetchOutcome::NotFound),
            status => Err(AppError::UpstreamStatus {
                status,
                surface: surface.to_string(),
            }),
        }
    }
}

/// `<dir>/annotation_<id>.json`. The id must be all ASCII digits so the path stays inside `dir`.
pub fn annotation_file(dir: &Path, inscription_id: &str) -> Result<PathBuf, AppError> {
    if inscription_id.is_empty() || !inscription_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!("invalid inscription id '{}'", inscription_id)));
    }
    Ok(dir.join(format!("annotation_{}.json", inscription_id)))
}

/// Items in an annotation body: list length, 1 for any other JSON value, `None` if not JSON.
pub fn annotation_count(body: &[u8]) -> Option<usize> {
    match serde_json::from_slice::<serde_json::Value>(body).ok()? {
        serde_json::Value::Array(items) => Some(items.len()),
        _ => Some(1),
    }
}

#[derive(Clone, Debug)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    /// Sleep after every request, whatever its outcome.
    pub pause: Duration,
}

impl DownloadOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        DownloadOptions {
            output_dir: output_dir.into(),
            pause: DEFAULT_PAUSE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub successful: usize,
    pub no_annotation: usize,
    pub failed: usize,
    pub no_panel: usize,
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Download summary:")?;
        writeln!(f, "  Successful: {}", self.successful)?;
        writeln!(f, "  No annotation: {}", self.no_annotation)?;
        writeln!(f, "  Failed: {}", self.failed)?;
        write!(f, "  No panel title: {}", self.no_panel)
    }
}

/// Downloads annotations for every row of `csv_path`. The CSV must have `id` and `panel_title`.
pub async fn download_annotations(
    source: &dyn AnnotationSource,
    csv_path: &Path,
    options: &DownloadOptions,
) -> Result<DownloadReport, AppError> {
    let table = CsvTable::read(csv_path)?;
    let id_col = table.require("id")?;
    let panel_col = table.require("panel_title")?;
    if !options.output_dir.is_dir() {
        tokio::fs::create_dir_all(&options.output_dir).await?;
        tracing::info!(dir = %options.output_dir.display(), "created annotation directory");
    }
    tracing::info!(csv = %csv_path.display(), rows = table.rows.len(), "downloading annotations");

    let mut report = DownloadReport {
        failed: table.malformed,
        ..DownloadReport::default()
    };
    for row in &table.rows {
        let id = row.get(id_col).map(|s| s.trim()).unwrap_or("");
        let surface = row.get(panel_col).map(|s| s.trim()).unwrap_or("");
        if surface.is_empty() {
            tracing::info!(inscription = id, "no panel title");
            report.no_panel += 1;
            continue;
        }
        let path = match annotation_file(&options.output_dir, id) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "skipping row");
                report.failed += 1;
                continue;
            }
        };
        match source.fetch(surface).await {
            Ok(FetchOutcome::Found(body)) => {
                match tokio::fs::write(&path, &body).await {
                    Ok(()) => {
                        tracing::info!(
                            inscription = id,
                            surface,
                            items = ?annotation_count(&body),
                            "saved annotation"
                        );
                        report.successful += 1;
                    }
                    Err(e) => {
                        tracing::warn!(inscription = id, path = %path.display(), error = %e, "could not write annotation");
                        report.failed += 1;
                    }
                }
            }
            Ok(FetchOutcome::NotFound) => {
                tracing::info!(inscription = id, surface, "no annotation");
                report.no_annotation += 1;
            }
            Err(e) => {
                tracing::warn!(inscription = id, surface, error = %e, "annotation request failed");
                report.failed += 1;
            }
        }
        if !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
    }
    Ok(report)
}
