use std::env;
use std::path::PathBuf;

use crate::models::export::{ExportProfile, Preamble};
use crate::services::erp::EpicorConfig;
use crate::services::export::profiles::chart_of_accounts_profile;
use crate::services::transfer::SftpConfig;
use crate::utils::error_handling::{AppError, Result};

// ============================================================================
// Sections
// ============================================================================

/// Remote SFTP directory per export type, plus the invoice pickup directory
#[derive(Debug, Clone)]
pub struct RemotePaths {
    pub chart_of_accounts: String,
    pub vendors: String,
    pub purchase_orders: String,
    pub payments: String,
    pub invoices: String,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub baq_chart_of_accounts: String,
    pub baq_vendors: String,
    pub baq_purchase_orders: String,
    pub baq_payments: String,
    pub file_chart_of_accounts: String,
    pub file_vendors: String,
    pub file_purchase_orders: String,
    pub file_payments: String,
    pub coa_profile: ExportProfile,
    pub coa_preamble: Option<Preamble>,
    pub vendors_preamble: Option<Preamble>,
    pub skip_upload: bool,
    pub run_state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub skip_download: bool,
    pub delete_remote_after_download: bool,
    pub delete_local_after_processing: bool,
    pub archive_dir: Option<PathBuf>,
    pub group_prefix: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub epicor: EpicorConfig,
    /// Absent when `SFTP_HOST` is not set; only needed when transfers run
    pub sftp: Option<SftpConfig>,
    pub remote_paths: RemotePaths,
    pub staging_dir: PathBuf,
    pub export: ExportSettings,
    pub import: ImportSettings,
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let timeout_secs = source.parsed("EPICOR_TIMEOUT_SECS", 60u64)?;

        let epicor = EpicorConfig {
            server: source.required("EPICOR_SERVER")?,
            instance: source.required("EPICOR_INSTANCE")?,
            username: source.required("EPICOR_USER")?,
            password: source.required("EPICOR_PASSWORD")?,
            company: source.required("EPICOR_COMPANY")?,
            api_key: source.get("EPICOR_API_KEY"),
            accept_invalid_certs: source.flag("EPICOR_ACCEPT_INVALID_CERTS", false)?,
            timeout_secs,
        };
        epicor
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let sftp = match source.get("SFTP_HOST") {
            Some(host) => {
                let config = SftpConfig {
                    host,
                    port: source.parsed("SFTP_PORT", 22u16)?,
                    username: source.required("SFTP_USER")?,
                    password: source.or("SFTP_PASSWORD", ""),
                    timeout_secs,
                };
                config
                    .validate()
                    .map_err(|e| AppError::Config(e.to_string()))?;
                Some(config)
            }
            None => None,
        };

        let remote_paths = RemotePaths {
            chart_of_accounts: source.or("SFTP_PATH_CHART_OF_ACCOUNTS", "/"),
            vendors: source.or("SFTP_PATH_VENDORS", "/"),
            purchase_orders: source.or("SFTP_PATH_POS", "/"),
            payments: source.or("SFTP_PATH_PAYMENTS", "/"),
            invoices: source.or("SFTP_PATH_INVOICES", "/"),
        };

        let profile_name = source.or("COA_PROFILE", "calculated");
        let coa_profile = chart_of_accounts_profile(&profile_name).ok_or_else(|| {
            AppError::Config(format!(
                "COA_PROFILE must be 'calculated' or 'raw', got '{}'",
                profile_name
            ))
        })?;

        let export = ExportSettings {
            baq_chart_of_accounts: source.or("BAQ_CHART_OF_ACCOUNTS", "Yooz_ChartOfAccounts"),
            baq_vendors: source.or("BAQ_VENDORS", "Yooz_Vendors"),
            baq_purchase_orders: source.or("BAQ_POS", "Yooz_POs"),
            baq_payments: source.or("BAQ_PAYMENTS", "Yooz_Payments"),
            file_chart_of_accounts: source.or("FILE_NAME_CHART_OF_ACCOUNTS", "ChartOfAccounts.txt"),
            file_vendors: source.or("FILE_NAME_VENDORS", "Vendors.txt"),
            file_purchase_orders: source.or("FILE_NAME_POS", "POs.txt"),
            file_payments: source.or("FILE_NAME_PAYMENTS", "Payments.xml"),
            coa_profile,
            coa_preamble: source.preamble("COA_PREAMBLE_VERSION", "COA_PREAMBLE_HEADER"),
            vendors_preamble: source.preamble("VENDORS_PREAMBLE_VERSION", "VENDORS_PREAMBLE_HEADER"),
            skip_upload: source.flag("SKIP_SFTP_UPLOAD", false)?,
            run_state_file: PathBuf::from(source.or("RUN_STATE_FILE", "./yooz-bridge-state.json")),
        };

        let import = ImportSettings {
            skip_download: source.flag("SKIP_SFTP_DOWNLOAD", false)?,
            delete_remote_after_download: source.flag("DELETE_REMOTE_AFTER_DOWNLOAD", true)?,
            delete_local_after_processing: source.flag("DELETE_LOCAL_AFTER_PROCESSING", true)?,
            archive_dir: source.get("ARCHIVE_DIR").map(PathBuf::from),
            group_prefix: source.or("INVOICE_GROUP_PREFIX", "Y_"),
        };

        Ok(Self {
            epicor,
            sftp,
            remote_paths,
            staging_dir: PathBuf::from(source.or("STAGING_DIR", "./staging")),
            export,
            import,
        })
    }

    /// SFTP settings for runs that actually transfer files
    pub fn require_sftp(&self) -> Result<&SftpConfig> {
        self.sftp
            .as_ref()
            .ok_or_else(|| AppError::Config("SFTP_HOST is required unless transfers are skipped".to_string()))
    }
}

// ============================================================================
// Environment Helpers
// ============================================================================

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("{} has invalid value '{}'", key, raw))),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => Ok(false),
            Some(v) => Err(AppError::Config(format!("{} must be true or false, got '{}'", key, v))),
        }
    }

    fn preamble(&self, version_key: &str, header_key: &str) -> Option<Preamble> {
        self.get(version_key).map(|version| Preamble {
            version,
            header: self.get(header_key),
        })
    }
}
