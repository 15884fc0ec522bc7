//! Docask Core Library
//!
//! Shared foundations for the docask crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging setup
//! - Configuration snapshot (model catalog, ask tuning, index location)
//! - Token estimation

pub mod config;
pub mod error;
pub mod logging;
pub mod tokens;

// Re-export commonly used types
pub use config::{AppConfig, AskSettings, ModelsConfig};
pub use error::{AppError, AppResult};
