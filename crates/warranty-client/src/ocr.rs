//! Optical character recognition for captcha images.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use warranty_core::OcrConfig;

/// One recognised line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrCandidate {
    /// Recognised text, words separated by single spaces
    pub text: String,
    /// Engine confidence in `[0, 1]`
    pub confidence: f32,
}

/// OCR engine seam.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Recognise text in an encoded image (PNG, JPEG, ...).
    ///
    /// Candidates are ranked best first; an empty list means nothing legible
    /// was found.
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrCandidate>>;
}

/// `OcrBackend` that pipes images through the tesseract CLI.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
    page_segmentation_mode: u8,
}

impl TesseractOcr {
    /// Create a backend from OCR settings.
    #[must_use]
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    /// Arguments for reading the image from stdin and writing TSV to stdout.
    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
            "tsv".to_string(),
        ]
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

#[async_trait]
impl OcrBackend for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrCandidate>> {
        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::OcrUnavailable {
                command: self.command.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Internal("OCR stdin was not captured".to_string()))?;
        stdin.write_all(image).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ClientError::OcrFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let candidates = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!("OCR produced {} candidate(s)", candidates.len());
        Ok(candidates)
    }
}

/// Parse tesseract TSV output into line candidates, best first.
///
/// Word rows (level 5) with a non-negative confidence are grouped by
/// page/block/paragraph/line. A line's confidence is the mean of its words'.
#[must_use]
pub fn parse_tsv(tsv: &str) -> Vec<OcrCandidate> {
    struct Line<'a> {
        key: [&'a str; 4],
        words: Vec<&'a str>,
        confidence_sum: f32,
    }

    let mut lines: Vec<Line<'_>> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let Ok(confidence) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        let word = cols[11].trim();
        if confidence < 0.0 || word.is_empty() {
            continue;
        }

        let key = [cols[1], cols[2], cols[3], cols[4]];
        match lines.iter_mut().find(|line| line.key == key) {
            Some(line) => {
                line.words.push(word);
                line.confidence_sum += confidence;
            }
            None => lines.push(Line {
                key,
                words: vec![word],
                confidence_sum: confidence,
            }),
        }
    }

    let mut candidates: Vec<OcrCandidate> = lines
        .into_iter()
        .map(|line| {
            #[allow(clippy::cast_precision_loss)]
            let mean = line.confidence_sum / line.words.len() as f32;
            OcrCandidate {
                text: line.words.join(" "),
                confidence: (mean / 100.0).clamp(0.0, 1.0),
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}
