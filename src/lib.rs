pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::LocalStorage;
pub use config::{DeployConfig, ServerConfig};
pub use self::core::{deploy::DeployPipeline, ocr::OcrService};
pub use utils::error::{OcrError, Result};
