// Export Service
// Runs one BAQ and writes its rows to a staging file in the vendor's layout

use std::path::PathBuf;

use crate::models::export::{ExportKind, ExportProfile};
use crate::services::erp::EpicorClient;
use crate::services::export::file_writer::{write_delimited_file, write_document_xml, DelimitedLayout};
use crate::services::export::record_mapper::map_rows;
use crate::utils::error_handling::Result;
use crate::utils::file_storage::StagingArea;

/// BAQ parameter carrying the last successful export time
pub const LAST_CHANGE_PARAMETER: &str = "LastChange";

#[derive(Debug, Clone)]
pub enum ExportFormat {
    Delimited(DelimitedLayout),
    DocumentXml,
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub kind: ExportKind,
    pub baq_id: String,
    pub file_name: String,
    pub remote_dir: String,
    pub profile: ExportProfile,
    pub format: ExportFormat,
    /// Send `LastChange` so the query only returns rows changed since the last run
    pub incremental: bool,
    /// Write no file at all when the query returns nothing
    pub skip_when_empty: bool,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub kind: ExportKind,
    pub rows: usize,
    pub file: Option<PathBuf>,
    pub remote_dir: String,
}

pub struct ExportService<'a> {
    client: &'a EpicorClient,
    staging: &'a StagingArea,
}

impl<'a> ExportService<'a> {
    pub fn new(client: &'a EpicorClient, staging: &'a StagingArea) -> Self {
        Self { client, staging }
    }

    pub async fn run_job(&self, job: &ExportJob, last_change: &str) -> Result<ExportOutcome> {
        tracing::info!("Exporting {} from BAQ {}", job.kind, job.baq_id);

        let parameters = if job.incremental {
            vec![(LAST_CHANGE_PARAMETER, last_change.to_string())]
        } else {
            Vec::new()
        };

        let rows = self.client.get_baq_results(&job.baq_id, &parameters).await?;
        tracing::debug!("BAQ {} returned {} row(s)", job.baq_id, rows.len());

        if rows.is_empty() && job.skip_when_empty {
            tracing::info!("No {} found, skipping file generation", job.kind);
            return Ok(ExportOutcome {
                kind: job.kind,
                rows: 0,
                file: None,
                remote_dir: job.remote_dir.clone(),
            });
        }

        let records = map_rows(job.kind, &job.profile, &rows)?;
        let path = self.staging.path(&job.file_name);

        match &job.format {
            ExportFormat::Delimited(layout) => write_delimited_file(&path, &job.profile, layout, &records)?,
            ExportFormat::DocumentXml => write_document_xml(&path, &job.profile, &records)?,
        }

        tracing::info!("Finished exporting {} ({} record(s))", job.kind, records.len());

        Ok(ExportOutcome {
            kind: job.kind,
            rows: records.len(),
            file: Some(path),
            remote_dir: job.remote_dir.clone(),
        })
    }
}
