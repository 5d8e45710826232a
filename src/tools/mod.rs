//! Data tools behind the command-line binaries: export, annotation download, dataset merge
//! and bulk update.

pub mod annotations;
pub mod csv_input;
pub mod dataset;
pub mod export;
pub mod update;

pub use annotations::{
    annotation_count, annotation_file, download_annotations, AnnotationSource, DownloadOptions, DownloadReport,
    FetchOutcome, HttpAnnotationSource,
};
pub use csv_input::CsvTable;
pub use dataset::{create_dataset, create_simple_dataset, dataset_filename, MergeSummary, SimpleSummary};
pub use export::{export_inscriptions, ExportReport, ExportVariant};
pub use update::{update_inscriptions, updatable_fields, UpdateReport};
