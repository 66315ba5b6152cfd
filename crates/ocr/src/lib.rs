pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod words;

pub use extract::Extractor;
pub use pipeline::{PipelineError, ReceiptPipeline, ScanResult, MIN_TRANSCRIPT_CHARS};
pub use preprocess::{normalize, normalize_bytes, PreprocessError, MIN_LONG_EDGE};
pub use recognizer::{EngineConfig, MockRecognizer, OcrBackend, OcrError, TextBlock};
