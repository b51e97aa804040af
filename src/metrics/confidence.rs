use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::stats::{mean, stddev};
use crate::thresholds::CaptionThresholds;
use crate::types::OcrFrame;

/// OCR confidence statistics. Doubles as the defect indicator for contrast
/// and compression degradations, which show up as the OCR engine losing
/// certainty before it loses the text entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceReport {
    pub score: f64,
    pub mean: f64,
    pub min: f64,
    pub stddev: f64,
    pub frame_count: usize,
}

pub fn analyze_confidence(frames: &[OcrFrame], thresholds: &CaptionThresholds) -> ConfidenceReport {
    let confidences: Vec<f64> = frames
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .map(|f| f.confidence)
        .collect();
    if confidences.is_empty() {
        return ConfidenceReport {
            score: 1.0,
            mean: 0.0,
            min: 0.0,
            stddev: 0.0,
            frame_count: 0,
        };
    }
    let m = mean(&confidences);
    let floor = thresholds.ocr_confidence.floor;
    ConfidenceReport {
        score: clamp_score((m - floor) / (1.0 - floor)),
        mean: m,
        min: confidences.iter().cloned().fold(f64::INFINITY, f64::min),
        stddev: stddev(&confidences),
        frame_count: confidences.len(),
    }
}
