// Import run: download, ensure the day's invoice group, import each file,
// archive or delete it, then unlock the group.
// A failing file or invoice is recorded and the run moves on.

use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::config::{AppConfig, ImportSettings};
use crate::services::erp::{ApInvoiceService, EpicorClient};
use crate::services::import::{group_invoices, parse_invoice_file, InvoiceImportService};
use crate::services::transfer::{is_wanted, SftpTransfer};
use crate::utils::error_handling::Result;
use crate::utils::file_storage::StagingArea;
use crate::utils::log_sanitizer::sanitize_for_log;

pub const INVOICE_EXTENSION: &str = ".csv";

/// Staging subdirectory for failed files when no archive directory is set.
/// Only regular files in the staging root are imported, so nothing here is
/// picked up again.
pub const FAILED_DIR: &str = "failed";

/// Staging subdirectory for imported files that are kept instead of deleted
pub const PROCESSED_DIR: &str = "processed";

#[derive(Debug, Default, Serialize, Clone)]
pub struct ImportSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub invoices_imported: usize,
    pub invoices_failed: usize,
    pub errors: Vec<ImportItemError>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ImportItemError {
    pub file: String,
    /// `None` when the whole file could not be read
    pub invoice_num: Option<String>,
    pub error_message: String,
}

/// Group id for the day, e.g. `Y_031524`
pub fn invoice_group_id(prefix: &str, day: NaiveDate) -> String {
    format!("{}{}", prefix, day.format("%m%d%y"))
}

pub async fn run_import(config: &AppConfig, client: &EpicorClient) -> Result<ImportSummary> {
    let staging = StagingArea::new(&config.staging_dir)?;
    let settings = &config.import;

    if settings.skip_download {
        tracing::info!("Skipping download of vendor files (SKIP_SFTP_DOWNLOAD)");
    } else {
        let transfer = SftpTransfer::new(config.require_sftp()?.clone())?;
        transfer
            .download_all(
                &config.remote_paths.invoices,
                INVOICE_EXTENSION,
                staging.base_path(),
                settings.delete_remote_after_download,
            )
            .await?;
    }

    let files: Vec<_> = staging
        .list_files()?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|n| is_wanted(&n.to_string_lossy(), INVOICE_EXTENSION))
                .unwrap_or(false)
        })
        .collect();
    tracing::info!("Processing {} file(s)", files.len());

    let group_id = invoice_group_id(&settings.group_prefix, Local::now().date_naive());
    let groups = ApInvoiceService::new(client);
    groups.ensure_group(&group_id).await?;

    let importer = InvoiceImportService::new(client, group_id.as_str());
    let mut summary = ImportSummary::default();
    for file in &files {
        process_file(&importer, &staging, settings, file, &mut summary).await;
    }

    groups.unlock_group(&group_id).await?;

    tracing::info!(
        "Import finished: {} file(s), {} failed; {} invoice(s) imported, {} failed",
        summary.files_processed,
        summary.files_failed,
        summary.invoices_imported,
        summary.invoices_failed
    );

    Ok(summary)
}

async fn process_file(
    importer: &InvoiceImportService<'_>,
    staging: &StagingArea,
    settings: &ImportSettings,
    file: &Path,
    summary: &mut ImportSummary,
) {
    let file_label = sanitize_for_log(
        &file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    summary.files_processed += 1;
    tracing::info!("Parsing file {}", file_label);

    let invoices = match parse_invoice_file(file) {
        Ok(lines) => group_invoices(lines),
        Err(e) => {
            tracing::error!("Failed to parse {}: {}", file_label, e);
            summary.files_failed += 1;
            summary.errors.push(ImportItemError {
                file: file_label,
                invoice_num: None,
                error_message: e.to_string(),
            });
            dispose(staging, settings, file, false);
            return;
        }
    };

    tracing::info!("File {} contains {} invoice(s)", file_label, invoices.len());

    let mut clean = true;
    for invoice in &invoices {
        match importer.import_invoice(invoice).await {
            Ok(_) => summary.invoices_imported += 1,
            Err(e) => {
                tracing::error!(
                    "Failed to import invoice '{}' from {}: {}",
                    sanitize_for_log(&invoice.invoice_num),
                    file_label,
                    e
                );
                clean = false;
                summary.invoices_failed += 1;
                summary.errors.push(ImportItemError {
                    file: file_label.clone(),
                    invoice_num: Some(invoice.invoice_num.clone()),
                    error_message: e.to_string(),
                });
            }
        }
    }

    if !clean {
        summary.files_failed += 1;
    }
    dispose(staging, settings, file, clean);
}

/// Delete a fully imported file; move a failed one out of the import path so a
/// later run cannot import its successful invoices a second time
fn dispose(staging: &StagingArea, settings: &ImportSettings, file: &Path, succeeded: bool) {
    let outcome = match (succeeded, &settings.archive_dir) {
        (true, _) if settings.delete_local_after_processing => staging.delete(file).map(|_| {
            tracing::info!("Deleted processed file {}", file.display());
        }),
        (true, _) => staging
            .archive(file, &staging.base_path().join(PROCESSED_DIR))
            .map(|to| {
                tracing::info!("Kept processed file as {}", to.display());
            }),
        (false, Some(archive_dir)) => staging.archive(file, archive_dir).map(|to| {
            tracing::info!("Archived failed file to {}", to.display());
        }),
        (false, None) => staging
            .archive(file, &staging.base_path().join(FAILED_DIR))
            .map(|to| {
                tracing::warn!("Moved failed file to {} for review", to.display());
            }),
    };

    if let Err(e) = outcome {
        tracing::error!("Could not clean up {}: {}", file.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_group_id_format() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(invoice_group_id("Y_", day), "Y_030524");
        assert_eq!(invoice_group_id("AP", day), "AP030524");
    }
}
