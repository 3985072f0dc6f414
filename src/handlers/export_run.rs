// Export run: clear staging, export every type in order, upload, record the run
// A failing export type aborts the remaining ones.

use std::path::PathBuf;

use chrono::Local;

use crate::config::AppConfig;
use crate::models::export::ExportKind;
use crate::services::erp::EpicorClient;
use crate::services::export::profiles::{PAYMENTS, PURCHASE_ORDERS, VENDORS};
use crate::services::export::{DelimitedLayout, ExportFormat, ExportJob, ExportOutcome, ExportService};
use crate::services::transfer::{SftpTransfer, Upload};
use crate::services::RunState;
use crate::utils::error_handling::Result;
use crate::utils::file_storage::StagingArea;

#[derive(Debug, Clone)]
pub struct ExportRunSummary {
    pub outcomes: Vec<ExportOutcome>,
    pub uploaded: Vec<PathBuf>,
    pub last_change: String,
}

impl ExportRunSummary {
    pub fn outcome(&self, kind: ExportKind) -> Option<&ExportOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }
}

/// The four exports in the order they run
pub fn export_jobs(config: &AppConfig) -> Vec<ExportJob> {
    let export = &config.export;
    let paths = &config.remote_paths;

    vec![
        ExportJob {
            kind: ExportKind::ChartOfAccounts,
            baq_id: export.baq_chart_of_accounts.clone(),
            file_name: export.file_chart_of_accounts.clone(),
            remote_dir: paths.chart_of_accounts.clone(),
            profile: export.coa_profile,
            format: ExportFormat::Delimited(DelimitedLayout {
                preamble: export.coa_preamble.clone(),
                header_row: false,
            }),
            incremental: true,
            skip_when_empty: false,
        },
        ExportJob {
            kind: ExportKind::Vendors,
            baq_id: export.baq_vendors.clone(),
            file_name: export.file_vendors.clone(),
            remote_dir: paths.vendors.clone(),
            profile: VENDORS,
            format: ExportFormat::Delimited(DelimitedLayout {
                preamble: export.vendors_preamble.clone(),
                header_row: false,
            }),
            // The vendor query always returns the full list
            incremental: false,
            skip_when_empty: false,
        },
        ExportJob {
            kind: ExportKind::PurchaseOrders,
            baq_id: export.baq_purchase_orders.clone(),
            file_name: export.file_purchase_orders.clone(),
            remote_dir: paths.purchase_orders.clone(),
            profile: PURCHASE_ORDERS,
            format: ExportFormat::Delimited(DelimitedLayout::default()),
            incremental: true,
            skip_when_empty: false,
        },
        ExportJob {
            kind: ExportKind::Payments,
            baq_id: export.baq_payments.clone(),
            file_name: export.file_payments.clone(),
            remote_dir: paths.payments.clone(),
            profile: PAYMENTS,
            format: ExportFormat::DocumentXml,
            incremental: true,
            skip_when_empty: true,
        },
    ]
}

pub async fn run_export(config: &AppConfig, client: &EpicorClient) -> Result<ExportRunSummary> {
    let started_at = Local::now().naive_local();

    let staging = StagingArea::new(&config.staging_dir)?;
    let cleared = staging.clear()?;
    tracing::info!(
        "Staging directory {} ready ({} old file(s) removed)",
        staging.base_path().display(),
        cleared
    );

    let state = RunState::load(&config.export.run_state_file)?;
    let last_change = state.last_change_parameter();
    tracing::info!("Exporting changes since {}", last_change);

    let service = ExportService::new(client, &staging);
    let mut outcomes = Vec::new();
    for job in export_jobs(config) {
        let outcome = service.run_job(&job, &last_change).await.map_err(|e| {
            tracing::error!("Failed to export {}: {}", job.kind, e);
            e
        })?;
        outcomes.push(outcome);
    }

    let uploads: Vec<Upload> = outcomes
        .iter()
        .filter_map(|o| {
            o.file.as_ref().map(|file| Upload {
                local_path: file.clone(),
                remote_dir: o.remote_dir.clone(),
            })
        })
        .collect();

    let uploaded = if config.export.skip_upload {
        tracing::info!("Skipping upload of {} file(s) (SKIP_SFTP_UPLOAD)", uploads.len());
        Vec::new()
    } else {
        let transfer = SftpTransfer::new(config.require_sftp()?.clone())?;
        let uploaded = transfer.upload_files(&uploads).await?;

        RunState {
            last_export: Some(started_at),
        }
        .save(&config.export.run_state_file)?;
        tracing::info!("Uploaded {} file(s); next run exports changes since {}", uploaded.len(), started_at);
        uploaded
    };

    Ok(ExportRunSummary {
        outcomes,
        uploaded,
        last_change,
    })
}
