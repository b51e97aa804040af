use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;
use crate::stats::{mean, percentile};
use crate::thresholds::CaptionThresholds;
use crate::types::OcrFrame;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JitterReport {
    pub score: f64,
    pub mean_center_delta_px: f64,
    pub p95_center_delta_px: f64,
    pub sample_count: usize,
}

/// Measures bbox-center movement between consecutive frames that carry the
/// same caption. A steady caption should not move at all; the score stays at
/// 1.0 inside both pixel limits and drops sharply past either.
pub fn analyze_jitter(
    runs: &[TimelineRun],
    frames: &[OcrFrame],
    thresholds: &CaptionThresholds,
) -> JitterReport {
    let mut deltas: Vec<f64> = Vec::new();
    for run in runs.iter().filter(|r| !r.is_gap()) {
        for pair in run.frame_indices.windows(2) {
            let (Some(a), Some(b)) = (&frames[pair[0]].bbox, &frames[pair[1]].bbox) else {
                continue;
            };
            let (ax, ay) = a.center();
            let (bx, by) = b.center();
            deltas.push(((bx - ax).powi(2) + (by - ay).powi(2)).sqrt());
        }
    }

    if deltas.is_empty() {
        return JitterReport {
            score: 1.0,
            mean_center_delta_px: 0.0,
            p95_center_delta_px: 0.0,
            sample_count: 0,
        };
    }

    let mean_delta = mean(&deltas);
    let p95_delta = percentile(&deltas, 95.0);
    let worst = (mean_delta / thresholds.jitter.max_mean_center_delta_px)
        .max(p95_delta / thresholds.jitter.max_p95_center_delta_px);
    let score = if worst <= 1.0 {
        1.0
    } else {
        clamp_score(1.0 - (worst - 1.0))
    };
    JitterReport {
        score,
        mean_center_delta_px: mean_delta,
        p95_center_delta_px: p95_delta,
        sample_count: deltas.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::build_runs;
    use crate::types::BoundingBox;

    fn shaky_frames(amplitude: f64, count: usize) -> Vec<OcrFrame> {
        (0..count)
            .map(|i| {
                let dx = if i % 2 == 0 { 0.0 } else { amplitude };
                OcrFrame {
                    frame_number: i as u64,
                    timestamp: i as f64 * 0.5,
                    text: "steady caption".to_string(),
                    confidence: 0.9,
                    bbox: Some(BoundingBox {
                        x0: 200.0 + dx,
                        y0: 800.0,
                        x1: 800.0 + dx,
                        y1: 900.0,
                    }),
                }
            })
            .collect()
    }

    fn jitter_score(amplitude: f64) -> JitterReport {
        let thresholds = CaptionThresholds::default();
        let frames = shaky_frames(amplitude, 10);
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        analyze_jitter(&runs, &frames, &thresholds)
    }

    #[test]
    fn test_still_caption_scores_one() {
        let report = jitter_score(0.0);
        assert_eq!(report.score, 1.0);
        assert_eq!(report.mean_center_delta_px, 0.0);
    }

    #[test]
    fn test_sub_threshold_wobble_is_tolerated() {
        // 2px swings keep both mean and p95 under the default limits.
        let report = jitter_score(2.0);
        assert_eq!(report.score, 1.0);
        assert!(report.mean_center_delta_px > 0.0);
    }

    #[test]
    fn test_heavy_shake_drops_sharply() {
        let report = jitter_score(16.0);
        assert!(report.p95_center_delta_px > 10.0);
        assert!(report.score < 0.5);
    }

    #[test]
    fn test_score_non_increasing_in_amplitude() {
        let mut last = f64::INFINITY;
        for amplitude in [0.0, 1.0, 2.0, 4.0, 8.0, 16.0] {
            let score = jitter_score(amplitude).score;
            assert!(score <= last + 1e-9);
            last = score;
        }
    }

    #[test]
    fn test_movement_across_different_captions_is_not_jitter() {
        let thresholds = CaptionThresholds::default();
        let frames = vec![
            OcrFrame {
                frame_number: 0,
                timestamp: 0.0,
                text: "first caption".to_string(),
                confidence: 0.9,
                bbox: Some(BoundingBox {
                    x0: 100.0,
                    y0: 800.0,
                    x1: 500.0,
                    y1: 900.0,
                }),
            },
            OcrFrame {
                frame_number: 1,
                timestamp: 0.5,
                text: "totally different words".to_string(),
                confidence: 0.9,
                bbox: Some(BoundingBox {
                    x0: 400.0,
                    y0: 800.0,
                    x1: 900.0,
                    y1: 900.0,
                }),
            },
        ];
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_jitter(&runs, &frames, &thresholds);
        assert_eq!(report.sample_count, 0);
        assert_eq!(report.score, 1.0);
    }
}
