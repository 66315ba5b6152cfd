use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::extract::Extractor;
use crate::preprocess::{normalize_bytes, PreprocessError};
use crate::recognizer::{recognize_transcript, OcrBackend};
use rasid_core::{ExtractedFields, ReceiptCategory};

/// Transcripts shorter than this (after trimming) carry too little signal
/// to extract anything meaningful from.
pub const MIN_TRANSCRIPT_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read receipt image: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcript too short to extract from ({transcript_chars} chars)")]
    LowSignal { transcript_chars: usize },
}

/// Outcome of one receipt scan, ready to serialize for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub category: ReceiptCategory,
    pub image_sha256: String,
    pub transcript: String,
    pub fields: ExtractedFields,
    pub processed_at: DateTime<Utc>,
}

/// Full scan pipeline: normalize the image, recognize text, extract fields.
/// The recognizer is injected so hosts can run a real engine while tests
/// run a scripted one.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Process an encoded receipt image held in memory.
    ///
    /// A normalization failure (undecodable bytes) is not fatal on its own;
    /// it degrades to an empty transcript, which the low-signal gate then
    /// reports as [`PipelineError::LowSignal`].
    pub fn process_bytes(
        &self,
        data: &[u8],
        category: ReceiptCategory,
    ) -> Result<ScanResult, PipelineError> {
        let image_sha256 = fingerprint(data);
        let transcript = match normalize_bytes(data) {
            Ok(image) => recognize_transcript(&self.recognizer, &image),
            Err(PreprocessError::Load(err)) => {
                tracing::warn!(%err, "receipt image failed to decode");
                String::new()
            }
        };

        let transcript_chars = transcript.trim().chars().count();
        if transcript_chars < MIN_TRANSCRIPT_CHARS {
            return Err(PipelineError::LowSignal { transcript_chars });
        }

        let fields = Extractor::extract(&transcript);
        tracing::info!(
            %category,
            sha256 = %image_sha256,
            fields_found = fields.iter().filter(|(f, _)| fields.is_found(*f)).count(),
            "receipt processed"
        );

        Ok(ScanResult {
            category,
            image_sha256,
            transcript,
            fields,
            processed_at: Utc::now(),
        })
    }

    /// Process a receipt image from disk.
    pub fn process_file(
        &self,
        path: impl AsRef<Path>,
        category: ReceiptCategory,
    ) -> Result<ScanResult, PipelineError> {
        let data = std::fs::read(path)?;
        self.process_bytes(&data, category)
    }
}

impl<R: OcrBackend + 'static> ReceiptPipeline<R> {
    /// Run [`process_bytes`](Self::process_bytes) on the blocking thread
    /// pool, for hosts inside an async runtime. Decode plus denoise on a
    /// large photo takes long enough to stall an executor thread.
    pub async fn process_bytes_blocking(
        self: Arc<Self>,
        data: Vec<u8>,
        category: ReceiptCategory,
    ) -> Result<ScanResult, PipelineError> {
        tokio::task::spawn_blocking(move || self.process_bytes(&data, category))
            .await
            .map_err(|join_err| PipelineError::Io(std::io::Error::other(join_err)))?
    }
}

fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
