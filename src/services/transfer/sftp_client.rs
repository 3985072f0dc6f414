// SFTP Transfer Client
// Password-authenticated ssh2 sessions; every blocking call runs on the
// blocking thread pool so the runtime is never stalled by network I/O.

use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use ssh2::{Session, Sftp};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transfer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, TransferError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl SftpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(TransferError::Config("SFTP host is required".to_string()));
        }
        if self.username.is_empty() {
            return Err(TransferError::Config("SFTP user is required".to_string()));
        }
        if self.port == 0 {
            return Err(TransferError::Config("SFTP port must be non-zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Remote Naming
// ============================================================================

/// Produces upload names with a 100ns-tick suffix that never repeats within
/// the process, even when two names are requested within one clock tick
#[derive(Debug, Default)]
pub struct RemoteFileNamer {
    last_ticks: AtomicI64,
}

impl RemoteFileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_ticks(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default() / 100;
        let mut last = self.last_ticks.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last_ticks
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }

    /// `ChartOfAccounts.txt` becomes `ChartOfAccounts-<ticks>.txt`
    pub fn remote_name(&self, file_name: &str) -> String {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let ticks = self.next_ticks();

        match path.extension() {
            Some(ext) => format!("{}-{}.{}", stem, ticks, ext.to_string_lossy()),
            None => format!("{}-{}", stem, ticks),
        }
    }
}

/// Download filter: visible files with the wanted extension (case-sensitive)
pub fn is_wanted(file_name: &str, extension: &str) -> bool {
    !file_name.starts_with('.') && file_name.ends_with(extension)
}

fn remote_path(remote_dir: &str, name: &str) -> PathBuf {
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() {
        PathBuf::from(format!("/{}", name))
    } else {
        PathBuf::from(format!("{}/{}", dir, name))
    }
}

// ============================================================================
// Transfer Client
// ============================================================================

/// A staged file and the remote directory it belongs in
#[derive(Debug, Clone)]
pub struct Upload {
    pub local_path: PathBuf,
    pub remote_dir: String,
}

pub struct SftpTransfer {
    config: SftpConfig,
    namer: RemoteFileNamer,
}

impl SftpTransfer {
    pub fn new(config: SftpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            namer: RemoteFileNamer::new(),
        })
    }

    /// Upload every file over one session; returns the remote paths written
    pub async fn upload_files(&self, uploads: &[Upload]) -> Result<Vec<PathBuf>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }

        let mut plan = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let file_name = upload
                .local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    TransferError::Config(format!("'{}' has no file name", upload.local_path.display()))
                })?;
            let target = remote_path(&upload.remote_dir, &self.namer.remote_name(&file_name));
            plan.push((upload.local_path.clone(), target));
        }

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let sftp = connect(&config)?;
            let mut written = Vec::with_capacity(plan.len());
            for (local, remote) in plan {
                tracing::info!("Uploading {} to {}", local.display(), remote.display());
                let mut source = File::open(&local)?;
                let mut target = sftp.create(&remote)?;
                io::copy(&mut source, &mut target)?;
                written.push(remote);
            }
            Ok(written)
        })
        .await?
    }

    /// Download every visible file ending in `extension` into `local_dir`
    pub async fn download_all(
        &self,
        remote_dir: &str,
        extension: &str,
        local_dir: &Path,
        delete_after: bool,
    ) -> Result<Vec<PathBuf>> {
        let config = self.config.clone();
        let remote_dir = remote_dir.to_string();
        let extension = extension.to_string();
        let local_dir = local_dir.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let sftp = connect(&config)?;
            let listing = sftp.readdir(Path::new(&remote_dir))?;

            let mut downloaded = Vec::new();
            for (path, stat) in listing {
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                    continue;
                };
                if !stat.is_file() || !is_wanted(&name, &extension) {
                    continue;
                }

                let remote = remote_path(&remote_dir, &name);
                let local = local_dir.join(&name);
                tracing::debug!("Downloading {}", remote.display());

                let mut source = sftp.open(&remote)?;
                let mut target = File::create(&local)?;
                io::copy(&mut source, &mut target)?;

                if delete_after {
                    tracing::debug!("Deleting remote {}", remote.display());
                    sftp.unlink(&remote)?;
                }
                downloaded.push(local);
            }

            tracing::info!("Downloaded {} file(s) from {}", downloaded.len(), remote_dir);
            Ok(downloaded)
        })
        .await?
    }
}

fn connect(config: &SftpConfig) -> Result<Sftp> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port))?;
    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(config.timeout_secs.saturating_mul(1000).min(u32::MAX as u64) as u32);
    session.handshake()?;
    session.userauth_password(&config.username, &config.password)?;

    if !session.authenticated() {
        return Err(TransferError::Config(format!(
            "SFTP authentication failed for user '{}'",
            config.username
        )));
    }

    Ok(session.sftp()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_wanted_filters_hidden_and_extension() {
        assert!(is_wanted("invoices_0315.csv", ".csv"));
        assert!(!is_wanted(".invoices.csv", ".csv"));
        assert!(!is_wanted("invoices.CSV", ".csv"));
        assert!(!is_wanted("invoices.csv.tmp", ".csv"));
    }

    #[test]
    fn test_remote_name_keeps_extension() {
        let namer = RemoteFileNamer::new();
        let name = namer.remote_name("Payments.xml");
        assert!(name.starts_with("Payments-"));
        assert!(name.ends_with(".xml"));

        let bare = namer.remote_name("README");
        assert!(bare.starts_with("README-"));
        assert!(!bare.contains('.'));
    }

    #[test]
    fn test_ticks_strictly_increase() {
        let namer = RemoteFileNamer::new();
        let mut previous = namer.next_ticks();
        for _ in 0..1000 {
            let next = namer.next_ticks();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_remote_path_join() {
        assert_eq!(remote_path("/", "a.txt"), PathBuf::from("/a.txt"));
        assert_eq!(remote_path("/in/coa/", "a.txt"), PathBuf::from("/in/coa/a.txt"));
        assert_eq!(remote_path("out", "a.txt"), PathBuf::from("out/a.txt"));
    }

    #[test]
    fn test_config_validation() {
        let config = SftpConfig {
            host: "sftp.example.com".to_string(),
            port: 22,
            username: "yooz".to_string(),
            password: "pw".to_string(),
            timeout_secs: 60,
        };
        assert!(config.validate().is_ok());
        assert!(SftpConfig { host: String::new(), ..config.clone() }.validate().is_err());
        assert!(SftpConfig { port: 0, ..config }.validate().is_err());
    }
}
