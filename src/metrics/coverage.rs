use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;
use crate::thresholds::CaptionThresholds;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub score: f64,
    /// Fraction of the timeline span that carries a visible caption.
    pub covered_ratio: f64,
    pub covered_seconds: f64,
    pub span_seconds: f64,
}

pub fn analyze_coverage(runs: &[TimelineRun], thresholds: &CaptionThresholds) -> CoverageReport {
    let span = match (runs.first(), runs.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 0.0,
    };
    let covered: f64 = runs
        .iter()
        .filter(|r| !r.is_gap())
        .map(|r| r.end - r.start)
        .sum();

    if span <= 0.0 {
        return CoverageReport {
            score: 0.0,
            covered_ratio: 0.0,
            covered_seconds: 0.0,
            span_seconds: 0.0,
        };
    }
    let ratio = covered / span;
    CoverageReport {
        score: clamp_score(ratio / thresholds.min_coverage_ratio),
        covered_ratio: ratio,
        covered_seconds: covered,
        span_seconds: span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::build_runs;
    use crate::types::OcrFrame;

    fn frame(n: u64, ts: f64, text: &str) -> OcrFrame {
        OcrFrame {
            frame_number: n,
            timestamp: ts,
            text: text.to_string(),
            confidence: 0.9,
            bbox: None,
        }
    }

    #[test]
    fn test_fully_covered_timeline_scores_one() {
        let frames = vec![frame(0, 0.0, "Hello"), frame(1, 0.5, "Hello")];
        let thresholds = CaptionThresholds::default();
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_coverage(&runs, &thresholds);
        assert!((report.covered_ratio - 1.0).abs() < 1e-9);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_sparse_captions_score_lower() {
        let frames = vec![
            frame(0, 0.0, "Hello"),
            frame(1, 0.5, ""),
            frame(2, 1.0, ""),
            frame(3, 1.5, ""),
            frame(4, 2.0, ""),
            frame(5, 2.5, ""),
            frame(6, 3.0, ""),
            frame(7, 3.5, ""),
        ];
        let thresholds = CaptionThresholds::default();
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_coverage(&runs, &thresholds);
        assert!(report.covered_ratio < 0.2);
        assert!(report.score < 0.5);
    }

    #[test]
    fn test_empty_timeline_scores_zero() {
        let report = analyze_coverage(&[], &CaptionThresholds::default());
        assert_eq!(report.score, 0.0);
        assert_eq!(report.span_seconds, 0.0);
    }
}
