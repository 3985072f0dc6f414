pub mod sftp_client;

pub use sftp_client::{is_wanted, RemoteFileNamer, SftpConfig, SftpTransfer, TransferError, Upload};
