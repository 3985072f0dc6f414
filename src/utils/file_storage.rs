/// Local staging directory shared by the export and import runs
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::error_handling::{AppError, Result};

pub struct StagingArea {
    base_path: PathBuf,
}

impl StagingArea {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create staging directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;
        }

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path for a file inside the staging directory. The name is sanitized so a
    /// remote or configured name can never escape the directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.base_path.join(sanitize_filename(file_name))
    }

    /// Delete every regular file in the staging directory
    pub fn clear(&self) -> Result<usize> {
        let mut deleted = 0;
        for path in self.regular_files()? {
            fs::remove_file(&path)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Regular, non-hidden files sorted by name
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .regular_files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| !name.starts_with('.'))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Move a file into the archive directory, keeping its name
    pub fn archive(&self, file: &Path, archive_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(archive_dir)?;

        let file_name = file
            .file_name()
            .ok_or_else(|| AppError::InvalidData(format!("{} has no file name", file.display())))?;
        let destination = archive_dir.join(file_name);

        if fs::rename(file, &destination).is_err() {
            // Archive may live on another filesystem
            fs::copy(file, &destination)?;
            fs::remove_file(file)?;
        }

        Ok(destination)
    }

    pub fn delete(&self, file: &Path) -> Result<()> {
        if file.exists() {
            fs::remove_file(file)?;
        }
        Ok(())
    }

    fn regular_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

/// Sanitize filename to prevent directory traversal
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .replace("..", "")
        .replace('/', "_")
        .replace('\\', "_")
        .chars()
        .take(255)
        .collect()
}
