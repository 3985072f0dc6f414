use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::error_handling::Result;

/// Sent as `LastChange` when no export has completed yet
pub const NEVER_RUN: &str = "1900-01-01T00:00:00";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Persisted between export runs so BAQs only return changed rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub last_export: Option<NaiveDateTime>,
}

impl RunState {
    /// Missing state file means no export has run
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn last_change_parameter(&self) -> String {
        self.last_export
            .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| NEVER_RUN.to_string())
    }
}
