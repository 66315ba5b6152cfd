use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Blocks at or below this confidence are dropped during transcript
/// assembly. Redundant with the engine's own drop score on purpose: engine
/// versions differ in whether they filter before or after returning.
pub const MIN_BLOCK_CONFIDENCE: f32 = 0.3;

/// Engine tuning for low-contrast receipt text. These values are the
/// integration contract with whatever engine backs [`OcrBackend`]; backends
/// apply what their engine supports and ignore the rest.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run the angle classifier so rotated text is still recognized.
    pub angle_classification: bool,
    pub language: String,
    /// Text detection confidence threshold.
    pub det_threshold: f32,
    /// Detected-box confidence threshold.
    pub det_box_threshold: f32,
    /// Recognition batch size.
    pub batch_size: usize,
    /// Engine-side floor for recognized text confidence.
    pub drop_score: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            angle_classification: true,
            language: "en".to_string(),
            det_threshold: 0.2,
            det_box_threshold: 0.3,
            batch_size: 8,
            drop_score: 0.3,
        }
    }
}

/// One recognized text region: the y-coordinate of its top edge, the text,
/// and the engine's confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub top: f32,
    pub text: String,
    pub confidence: f32,
}

/// Abstraction over an OCR engine. Implementations take a normalized RGB
/// image and return the detected regions in whatever order the engine
/// produced them; ordering and filtering happen in [`transcript_from_blocks`].
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextBlock>, OcrError>;
}

/// Assemble the transcript: drop low-confidence blocks, sort the rest
/// top-to-bottom, and join with newlines. Single-column reading order only —
/// no attempt is made at multi-column layouts.
pub fn transcript_from_blocks(mut blocks: Vec<TextBlock>) -> String {
    blocks.retain(|b| b.confidence > MIN_BLOCK_CONFIDENCE);
    blocks.sort_by(|a, b| a.top.total_cmp(&b.top));
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the backend and assemble the transcript. Engine failures are logged
/// and collapse to an empty transcript; the orchestrator's content gate
/// turns that into a retryable signal rather than a crash.
pub fn recognize_transcript<R: OcrBackend + ?Sized>(backend: &R, image: &RgbImage) -> String {
    match backend.recognize(image) {
        Ok(blocks) => {
            let kept = blocks
                .iter()
                .filter(|b| b.confidence > MIN_BLOCK_CONFIDENCE)
                .count();
            tracing::debug!(detected = blocks.len(), kept, "OCR regions recognized");
            transcript_from_blocks(blocks)
        }
        Err(e) => {
            tracing::warn!("OCR engine failed, treating as zero detections: {e}");
            String::new()
        }
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set blocks regardless of image content — lets the extraction
/// pipeline be tested without an OCR engine installed.
pub struct MockRecognizer {
    blocks: Vec<TextBlock>,
}

impl MockRecognizer {
    /// One block per line of `text`, top-to-bottom, confidence 0.9.
    pub fn new(text: impl Into<String>) -> Self {
        let blocks = text
            .into()
            .lines()
            .enumerate()
            .map(|(i, line)| TextBlock {
                top: i as f32 * 40.0,
                text: line.to_string(),
                confidence: 0.9,
            })
            .collect();
        Self { blocks }
    }

    /// Exact blocks, for tests that care about geometry or confidence.
    pub fn with_blocks(blocks: Vec<TextBlock>) -> Self {
        Self { blocks }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextBlock>, OcrError> {
        Ok(self.blocks.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{EngineConfig, OcrBackend, OcrError, TextBlock};
    use image::RgbImage;
    use leptess::LepTess;
    use std::io::Cursor;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        config: EngineConfig,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, config: EngineConfig) -> Self {
            Self { data_path, config }
        }
    }

    // Tesseract has no equivalents for the detector thresholds or batch
    // size; only the language carries over. Confidence filtering still
    // happens via the shared drop in transcript assembly.
    fn tesseract_lang(code: &str) -> &str {
        match code {
            "en" => "eng",
            other => other,
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &RgbImage) -> Result<Vec<TextBlock>, OcrError> {
            let mut png = Vec::new();
            image::DynamicImage::ImageRgb8(image.clone())
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;

            let mut lt = LepTess::new(
                self.data_path.as_deref(),
                tesseract_lang(&self.config.language),
            )
            .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            let tsv = lt
                .get_tsv_text(0)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(parse_tsv(&tsv))
        }
    }

    /// Fold Tesseract's word-level TSV rows (level 5) into line blocks:
    /// words grouped by (block, paragraph, line), top edge is the minimum
    /// word top, confidence is the mean word confidence scaled to [0, 1].
    fn parse_tsv(tsv: &str) -> Vec<TextBlock> {
        use std::collections::BTreeMap;

        let mut lines: BTreeMap<(u32, u32, u32), (f32, Vec<String>, f32, u32)> = BTreeMap::new();
        for row in tsv.lines() {
            let cols: Vec<&str> = row.split('\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                continue;
            }
            let (Ok(block), Ok(par), Ok(line)) = (
                cols[2].parse::<u32>(),
                cols[3].parse::<u32>(),
                cols[4].parse::<u32>(),
            ) else {
                continue;
            };
            let top: f32 = cols[7].parse().unwrap_or(0.0);
            let conf: f32 = cols[10].parse().unwrap_or(0.0);
            let word = cols[11].trim();
            if word.is_empty() || conf < 0.0 {
                continue;
            }
            let entry = lines
                .entry((block, par, line))
                .or_insert((f32::MAX, Vec::new(), 0.0, 0));
            entry.0 = entry.0.min(top);
            entry.1.push(word.to_string());
            entry.2 += conf;
            entry.3 += 1;
        }

        lines
            .into_values()
            .map(|(top, words, conf_sum, n)| TextBlock {
                top,
                text: words.join(" "),
                confidence: conf_sum / (n.max(1) as f32) / 100.0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(top: f32, text: &str, confidence: f32) -> TextBlock {
        TextBlock {
            top,
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn transcript_sorted_by_vertical_position() {
        // Engine detection order is irrelevant; output follows the y axis.
        let blocks = vec![
            block(300.0, "₹1,250.00", 0.95),
            block(10.0, "Paid to RAJESH KUMAR", 0.9),
            block(120.0, "Payment Successful", 0.8),
        ];
        let transcript = transcript_from_blocks(blocks);
        assert_eq!(
            transcript,
            "Paid to RAJESH KUMAR\nPayment Successful\n₹1,250.00"
        );
    }

    #[test]
    fn transcript_drops_low_confidence_blocks() {
        let blocks = vec![
            block(0.0, "KEEP", 0.31),
            block(10.0, "DROP", 0.3),
            block(20.0, "DROP TOO", 0.05),
        ];
        assert_eq!(transcript_from_blocks(blocks), "KEEP");
    }

    #[test]
    fn transcript_empty_for_no_blocks() {
        assert_eq!(transcript_from_blocks(vec![]), "");
    }

    #[test]
    fn default_engine_config_matches_tuning() {
        let cfg = EngineConfig::default();
        assert!(cfg.angle_classification);
        assert_eq!(cfg.language, "en");
        assert_eq!(cfg.det_threshold, 0.2);
        assert_eq!(cfg.det_box_threshold, 0.3);
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.drop_score, 0.3);
    }

    #[test]
    fn mock_splits_lines_into_ordered_blocks() {
        let mock = MockRecognizer::new("first\nsecond\nthird");
        let img = RgbImage::new(1, 1);
        let blocks = mock.recognize(&img).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].top < blocks[1].top && blocks[1].top < blocks[2].top);
        assert_eq!(recognize_transcript(&mock, &img), "first\nsecond\nthird");
    }

    #[test]
    fn engine_failure_becomes_empty_transcript() {
        struct BrokenEngine;
        impl OcrBackend for BrokenEngine {
            fn recognize(&self, _image: &RgbImage) -> Result<Vec<TextBlock>, OcrError> {
                Err(OcrError::Engine("model blew up".into()))
            }
        }
        let img = RgbImage::new(1, 1);
        assert_eq!(recognize_transcript(&BrokenEngine, &img), "");
    }
}
