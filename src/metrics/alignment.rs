use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::stats::mean;
use crate::thresholds::CaptionThresholds;
use crate::types::{FrameSize, OcrFrame};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub score: f64,
    /// Mean |bbox center - frame midline| / frame width.
    pub mean_abs_center_dx_ratio: f64,
    pub frame_count: usize,
}

pub fn analyze_alignment(
    frames: &[OcrFrame],
    frame_size: FrameSize,
    thresholds: &CaptionThresholds,
) -> AlignmentReport {
    let width = frame_size.width as f64;
    let midline = width / 2.0;
    let ratios: Vec<f64> = frames
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .filter_map(|f| f.bbox.as_ref())
        .map(|b| ((b.center().0 - midline) / width).abs())
        .collect();

    if ratios.is_empty() {
        return AlignmentReport {
            score: 1.0,
            mean_abs_center_dx_ratio: 0.0,
            frame_count: 0,
        };
    }
    let mean_abs = mean(&ratios);
    AlignmentReport {
        score: clamp_score(1.0 - mean_abs / thresholds.alignment.max_mean_abs_center_dx_ratio),
        mean_abs_center_dx_ratio: mean_abs,
        frame_count: ratios.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    const SIZE: FrameSize = FrameSize {
        width: 1000,
        height: 1000,
    };

    fn frame_at(ts: f64, x0: f64, x1: f64) -> OcrFrame {
        OcrFrame {
            frame_number: (ts * 2.0) as u64,
            timestamp: ts,
            text: "caption".to_string(),
            confidence: 0.9,
            bbox: Some(BoundingBox {
                x0,
                y0: 800.0,
                x1,
                y1: 900.0,
            }),
        }
    }

    #[test]
    fn test_centered_captions_score_one() {
        let frames = vec![frame_at(0.0, 300.0, 700.0), frame_at(0.5, 300.0, 700.0)];
        let report = analyze_alignment(&frames, SIZE, &CaptionThresholds::default());
        assert!((report.mean_abs_center_dx_ratio).abs() < 1e-9);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_offset_lowers_score_monotonically() {
        let thresholds = CaptionThresholds::default();
        let mut last_score = f64::INFINITY;
        for offset in [0.0, 50.0, 100.0, 200.0] {
            let frames = vec![frame_at(0.0, 300.0 + offset, 700.0 + offset)];
            let report = analyze_alignment(&frames, SIZE, &thresholds);
            assert!(report.score <= last_score + 1e-9);
            last_score = report.score;
        }
        assert!(last_score < 1.0);
    }

    #[test]
    fn test_no_bboxes_scores_one() {
        let report = analyze_alignment(&[], SIZE, &CaptionThresholds::default());
        assert_eq!(report.score, 1.0);
        assert_eq!(report.frame_count, 0);
    }
}
