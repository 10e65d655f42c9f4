pub mod deploy;
pub mod ocr;

pub use crate::domain::model::{OcrOptions, SearchablePdf, TextExtraction, Upload};
pub use crate::domain::ports::{
    ContainerRuntime, DocumentProcessor, HealthProbe, OcrEngine, SourceCheckout, Storage,
    TextExtractor,
};
pub use crate::utils::error::Result;
