// Adapters layer: concrete implementations for external systems (processes, storage, http).

pub mod docker;
pub mod git;
pub mod health;
pub mod ocrmypdf;
pub mod pdftotext;
pub mod process;
pub mod storage;

pub use docker::DockerCli;
pub use git::GitCli;
pub use health::HttpHealthProbe;
pub use ocrmypdf::OcrmypdfCli;
pub use pdftotext::PdftotextCli;
pub use storage::LocalStorage;
