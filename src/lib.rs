pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use utils::error_handling::{AppError, Result};
