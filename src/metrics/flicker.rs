use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;
use crate::thresholds::CaptionThresholds;

/// A flicker event is a caption that disappears for a short gap and then
/// comes back with the same text. Legitimate re-displays after a long gap
/// are not flicker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlickerReport {
    pub score: f64,
    pub flicker_events: usize,
    pub visible_runs: usize,
}

pub fn analyze_flicker(runs: &[TimelineRun], thresholds: &CaptionThresholds) -> FlickerReport {
    let visible_runs = runs.iter().filter(|r| !r.is_gap()).count();
    let mut events = 0usize;

    // Only the immediately previous visible run matters: a reappearance
    // displaced by different text is redundancy, not flicker.
    let mut prev_visible: Option<&TimelineRun> = None;
    for run in runs {
        if run.is_gap() {
            continue;
        }
        if let Some(prev) = prev_visible {
            let gap = run.start - prev.end;
            if prev.normalized == run.normalized && gap <= thresholds.flicker.max_gap_seconds {
                events += 1;
            }
        }
        prev_visible = Some(run);
    }

    let score = if visible_runs == 0 {
        1.0
    } else {
        clamp_score(1.0 - events as f64 / visible_runs as f64)
    };
    FlickerReport {
        score,
        flicker_events: events,
        visible_runs,
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
    fn test_gap_then_same_text_is_flicker() {
        let frames = vec![
            frame(0, 0.0, "HELLO"),
            frame(1, 0.5, "HELLO"),
            frame(2, 1.0, ""),
            frame(3, 1.5, "HELLO"),
        ];
        let thresholds = CaptionThresholds::default();
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_flicker(&runs, &thresholds);
        assert!(report.flicker_events > 0);
        assert!(report.score < 1.0);
    }

    #[test]
    fn test_different_text_after_gap_is_not_flicker() {
        let frames = vec![
            frame(0, 0.0, "HELLO"),
            frame(1, 0.5, ""),
            frame(2, 1.0, "GOODBYE"),
        ];
        let thresholds = CaptionThresholds::default();
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_flicker(&runs, &thresholds);
        assert_eq!(report.flicker_events, 0);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_long_gap_is_legitimate_redisplay() {
        let frames = vec![
            frame(0, 0.0, "HELLO"),
            frame(1, 0.5, ""),
            frame(2, 1.0, ""),
            frame(3, 1.5, ""),
            frame(4, 2.0, ""),
            frame(5, 2.5, ""),
            frame(6, 3.0, "HELLO"),
        ];
        let thresholds = CaptionThresholds::default();
        let runs = build_runs(&frames, 2.0, &thresholds).unwrap();
        let report = analyze_flicker(&runs, &thresholds);
        assert_eq!(report.flicker_events, 0, "2.5s gap exceeds the 1s limit");
    }

    #[test]
    fn test_more_flicker_scores_lower() {
        let thresholds = CaptionThresholds::default();
        let one_flicker = vec![
            frame(0, 0.0, "A B C"),
            frame(1, 0.5, ""),
            frame(2, 1.0, "A B C"),
            frame(3, 1.5, "X Y Z"),
            frame(4, 2.0, "Q R S"),
        ];
        let two_flickers = vec![
            frame(0, 0.0, "A B C"),
            frame(1, 0.5, ""),
            frame(2, 1.0, "A B C"),
            frame(3, 1.5, ""),
            frame(4, 2.0, "A B C"),
        ];
        let runs1 = build_runs(&one_flicker, 2.0, &thresholds).unwrap();
        let runs2 = build_runs(&two_flickers, 2.0, &thresholds).unwrap();
        let r1 = analyze_flicker(&runs1, &thresholds);
        let r2 = analyze_flicker(&runs2, &thresholds);
        assert!(r2.flicker_events > r1.flicker_events);
        assert!(r2.score < r1.score);
    }

    #[test]
    fn test_empty_timeline_is_defect_free() {
        let report = analyze_flicker(&[], &CaptionThresholds::default());
        assert_eq!(report.score, 1.0);
        assert_eq!(report.flicker_events, 0);
    }
}
