use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::thresholds::CaptionThresholds;
use crate::types::{FrameSize, OcrFrame};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafeAreaReport {
    pub score: f64,
    pub violation_count: usize,
    pub frame_count: usize,
    /// Smallest edge margin seen, as a ratio of the relevant dimension.
    pub min_margin_ratio: Option<f64>,
}

pub fn analyze_safe_area(
    frames: &[OcrFrame],
    frame_size: FrameSize,
    thresholds: &CaptionThresholds,
) -> SafeAreaReport {
    let width = frame_size.width as f64;
    let height = frame_size.height as f64;
    let mut violations = 0usize;
    let mut frame_count = 0usize;
    let mut min_margin: Option<f64> = None;

    for frame in frames {
        let Some(bbox) = &frame.bbox else { continue };
        if frame.text.trim().is_empty() {
            continue;
        }
        frame_count += 1;
        let margins = [
            bbox.x0 / width,
            (width - bbox.x1) / width,
            bbox.y0 / height,
            (height - bbox.y1) / height,
        ];
        let frame_min = margins.iter().cloned().fold(f64::INFINITY, f64::min);
        min_margin = Some(min_margin.map_or(frame_min, |m: f64| m.min(frame_min)));
        if frame_min < thresholds.safe_margin_ratio {
            violations += 1;
        }
    }

    let score = if frame_count == 0 {
        1.0
    } else {
        clamp_score(1.0 - violations as f64 / frame_count as f64)
    };
    SafeAreaReport {
        score,
        violation_count: violations,
        frame_count,
        min_margin_ratio: min_margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    const SIZE: FrameSize = FrameSize {
        width: 1080,
        height: 1920,
    };

    fn frame(ts: f64, bbox: BoundingBox) -> OcrFrame {
        OcrFrame {
            frame_number: (ts * 2.0) as u64,
            timestamp: ts,
            text: "caption".to_string(),
            confidence: 0.9,
            bbox: Some(bbox),
        }
    }

    fn centered_box(bottom_margin_px: f64) -> BoundingBox {
        BoundingBox {
            x0: 200.0,
            y0: 1920.0 - bottom_margin_px - 80.0,
            x1: 880.0,
            y1: 1920.0 - bottom_margin_px,
        }
    }

    #[test]
    fn test_comfortable_margins_score_one() {
        let frames = vec![frame(0.0, centered_box(200.0)), frame(0.5, centered_box(200.0))];
        let report = analyze_safe_area(&frames, SIZE, &CaptionThresholds::default());
        assert_eq!(report.violation_count, 0);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_bottom_edge_violation_detected() {
        // 40px of 1920 is ~0.021, under the 0.05 default margin.
        let frames = vec![frame(0.0, centered_box(40.0))];
        let report = analyze_safe_area(&frames, SIZE, &CaptionThresholds::default());
        assert_eq!(report.violation_count, 1);
        assert_eq!(report.score, 0.0);
        assert!(report.min_margin_ratio.unwrap() < 0.05);
    }

    #[test]
    fn test_score_monotone_in_violation_ratio() {
        let mut scores = Vec::new();
        for bad in 0..=4usize {
            let frames: Vec<OcrFrame> = (0..4)
                .map(|i| {
                    let margin = if i < bad { 20.0 } else { 300.0 };
                    frame(i as f64 * 0.5, centered_box(margin))
                })
                .collect();
            scores.push(
                analyze_safe_area(&frames, SIZE, &CaptionThresholds::default()).score,
            );
        }
        for pair in scores.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9, "scores: {:?}", scores);
        }
    }

    #[test]
    fn test_frames_without_bbox_are_ignored() {
        let frames = vec![OcrFrame {
            frame_number: 0,
            timestamp: 0.0,
            text: "caption".to_string(),
            confidence: 0.9,
            bbox: None,
        }];
        let report = analyze_safe_area(&frames, SIZE, &CaptionThresholds::default());
        assert_eq!(report.frame_count, 0);
        assert_eq!(report.score, 1.0);
    }
}
