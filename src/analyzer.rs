//! Aggregates the per-metric analyzers into one caption quality report.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::metrics::{
    analyze_alignment, analyze_capitalization, analyze_confidence, analyze_coverage,
    analyze_flicker, analyze_jitter, analyze_punctuation, analyze_redundancy, analyze_safe_area,
    analyze_segmentation, AlignmentReport, CapitalizationReport, ConfidenceReport, CoverageReport,
    FlickerReport, JitterReport, PunctuationReport, RedundancyReport, SafeAreaReport,
    SegmentationReport,
};
use crate::segmenter::build_runs;
use crate::thresholds::CaptionThresholds;
use crate::types::{FrameSize, OcrFrame};

pub const ISSUE_SAFE_MARGIN: &str = "caption_safe_margin";
pub const ISSUE_FLICKER: &str = "caption_flicker";
pub const ISSUE_LOW_CONFIDENCE: &str = "caption_low_confidence";
pub const ISSUE_GLOBAL_OFFSET: &str = "global_offset";

// Internal aggregation policy. The invariants that matter: overall is
// non-increasing in every sub-score and reaches 1.0 only when every
// sub-score is 1.0. A weighted mean satisfies both.
const WEIGHT_COVERAGE: f64 = 0.05;
const WEIGHT_FLICKER: f64 = 0.13;
const WEIGHT_PUNCTUATION: f64 = 0.07;
const WEIGHT_CAPITALIZATION: f64 = 0.05;
const WEIGHT_SAFE_AREA: f64 = 0.15;
const WEIGHT_ALIGNMENT: f64 = 0.10;
const WEIGHT_JITTER: f64 = 0.15;
const WEIGHT_REDUNDANCY: f64 = 0.08;
const WEIGHT_SEGMENTATION: f64 = 0.07;
const WEIGHT_CONFIDENCE: f64 = 0.15;

/// Structured hard-fail entry, emitted only past a severity floor, not on
/// every soft scoring miss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionIssue {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl CaptionIssue {
    fn new(kind: &str, message: String, value: f64) -> Self {
        Self {
            kind: kind.to_string(),
            message,
            value: Some(value),
        }
    }
}

/// Audio/caption alignment result, populated by collaborators that run
/// audio alignment; this engine never computes it itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionQualityReport {
    pub overall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
    pub flicker: FlickerReport,
    pub punctuation: PunctuationReport,
    pub capitalization: CapitalizationReport,
    pub safe_area: SafeAreaReport,
    pub alignment: AlignmentReport,
    pub jitter: JitterReport,
    pub redundancy: RedundancyReport,
    pub segmentation: SegmentationReport,
    pub ocr_confidence: ConfidenceReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncReport>,
    pub errors: Vec<CaptionIssue>,
}

impl CaptionQualityReport {
    /// Resolve a dotted metric path ("safeArea.score", "sync.rating") the
    /// way the bench's expected-metric field names them.
    pub fn metric_value(&self, path: &str) -> Option<f64> {
        match path {
            "overall" => Some(self.overall),
            "coverage.score" => self.coverage.as_ref().map(|c| c.score),
            "flicker.score" => Some(self.flicker.score),
            "punctuation.score" => Some(self.punctuation.score),
            "capitalization.score" => Some(self.capitalization.score),
            "safeArea.score" => Some(self.safe_area.score),
            "alignment.score" => Some(self.alignment.score),
            "jitter.score" => Some(self.jitter.score),
            "redundancy.score" => Some(self.redundancy.score),
            "segmentation.score" => Some(self.segmentation.score),
            "ocrConfidence.score" => Some(self.ocr_confidence.score),
            "sync.rating" => self.sync.as_ref().map(|s| s.rating),
            _ => None,
        }
    }

    pub fn has_issue(&self, kind: &str) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

/// Run the full caption quality analysis over an OCR timeline.
///
/// Pure apart from logging: the same frames, fps, frame size and thresholds
/// always produce the same report.
pub fn analyze_caption_timeline(
    frames: &[OcrFrame],
    fps: f64,
    frame_size: FrameSize,
    thresholds: &CaptionThresholds,
) -> Result<CaptionQualityReport> {
    let runs = build_runs(frames, fps, thresholds)?;

    let coverage = if frames.is_empty() {
        None
    } else {
        Some(analyze_coverage(&runs, thresholds))
    };
    let flicker = analyze_flicker(&runs, thresholds);
    let punctuation = analyze_punctuation(&runs, thresholds);
    let capitalization = analyze_capitalization(&runs);
    let safe_area = analyze_safe_area(frames, frame_size, thresholds);
    let alignment = analyze_alignment(frames, frame_size, thresholds);
    let jitter = analyze_jitter(&runs, frames, thresholds);
    let redundancy = analyze_redundancy(&runs);
    let segmentation = analyze_segmentation(&runs);
    let ocr_confidence = analyze_confidence(frames, thresholds);

    let mut weighted = vec![
        (WEIGHT_FLICKER, flicker.score),
        (WEIGHT_PUNCTUATION, punctuation.score),
        (WEIGHT_CAPITALIZATION, capitalization.score),
        (WEIGHT_SAFE_AREA, safe_area.score),
        (WEIGHT_ALIGNMENT, alignment.score),
        (WEIGHT_JITTER, jitter.score),
        (WEIGHT_REDUNDANCY, redundancy.score),
        (WEIGHT_SEGMENTATION, segmentation.score),
        (WEIGHT_CONFIDENCE, ocr_confidence.score),
    ];
    if let Some(cov) = &coverage {
        weighted.push((WEIGHT_COVERAGE, cov.score));
    }
    let weight_sum: f64 = weighted.iter().map(|(w, _)| w).sum();
    let overall = weighted.iter().map(|(w, s)| w * s).sum::<f64>() / weight_sum;

    let mut errors = Vec::new();
    if safe_area.frame_count > 0 {
        let ratio = safe_area.violation_count as f64 / safe_area.frame_count as f64;
        if ratio >= thresholds.hard_fail.safe_area_violation_ratio {
            errors.push(CaptionIssue::new(
                ISSUE_SAFE_MARGIN,
                format!(
                    "{} of {} caption frames inside the safe margin",
                    safe_area.violation_count, safe_area.frame_count
                ),
                ratio,
            ));
        }
    }
    if flicker.flicker_events >= thresholds.hard_fail.flicker_events {
        errors.push(CaptionIssue::new(
            ISSUE_FLICKER,
            format!("{} flicker events", flicker.flicker_events),
            flicker.flicker_events as f64,
        ));
    }
    if ocr_confidence.frame_count > 0
        && ocr_confidence.mean < thresholds.hard_fail.min_mean_confidence
    {
        errors.push(CaptionIssue::new(
            ISSUE_LOW_CONFIDENCE,
            format!("mean OCR confidence {:.3}", ocr_confidence.mean),
            ocr_confidence.mean,
        ));
    }

    debug!(
        "caption analysis: overall {:.3}, {} issues",
        overall,
        errors.len()
    );

    Ok(CaptionQualityReport {
        overall,
        coverage,
        flicker,
        punctuation,
        capitalization,
        safe_area,
        alignment,
        jitter,
        redundancy,
        segmentation,
        ocr_confidence,
        sync: None,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    const SIZE: FrameSize = FrameSize {
        width: 1080,
        height: 1920,
    };

    fn clean_frame(n: u64, ts: f64, text: &str) -> OcrFrame {
        OcrFrame {
            frame_number: n,
            timestamp: ts,
            text: text.to_string(),
            confidence: 1.0,
            bbox: Some(BoundingBox {
                x0: 240.0,
                y0: 1500.0,
                x1: 840.0,
                y1: 1600.0,
            }),
        }
    }

    fn clean_timeline() -> Vec<OcrFrame> {
        vec![
            clean_frame(0, 0.0, "First caption line here."),
            clean_frame(1, 0.5, "First caption line here."),
            clean_frame(2, 1.0, "Second caption follows now."),
            clean_frame(3, 1.5, "Second caption follows now."),
        ]
    }

    #[test]
    fn test_clean_timeline_scores_perfect() {
        let report = analyze_caption_timeline(
            &clean_timeline(),
            2.0,
            SIZE,
            &CaptionThresholds::default(),
        )
        .unwrap();
        assert_eq!(report.overall, 1.0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_overall_below_one_when_any_metric_degrades() {
        let mut frames = clean_timeline();
        frames[1].text = String::new(); // force a flicker gap
        frames.push(clean_frame(4, 2.0, "First caption line here."));
        let report =
            analyze_caption_timeline(&frames, 2.0, SIZE, &CaptionThresholds::default()).unwrap();
        assert!(report.overall < 1.0);
    }

    #[test]
    fn test_overall_non_increasing_in_confidence() {
        let thresholds = CaptionThresholds::default();
        let mut last = f64::INFINITY;
        for level in [1.0, 0.85, 0.7, 0.55, 0.4] {
            let frames: Vec<OcrFrame> = clean_timeline()
                .into_iter()
                .map(|mut f| {
                    f.confidence = level;
                    f
                })
                .collect();
            let report = analyze_caption_timeline(&frames, 2.0, SIZE, &thresholds).unwrap();
            assert!(report.overall <= last + 1e-12);
            last = report.overall;
        }
    }

    #[test]
    fn test_low_confidence_issue_past_floor() {
        let frames: Vec<OcrFrame> = clean_timeline()
            .into_iter()
            .map(|mut f| {
                f.confidence = 0.4;
                f
            })
            .collect();
        let report =
            analyze_caption_timeline(&frames, 2.0, SIZE, &CaptionThresholds::default()).unwrap();
        assert!(report.has_issue(ISSUE_LOW_CONFIDENCE));
    }

    #[test]
    fn test_no_issue_on_single_soft_miss() {
        // One flicker event stays under the 2-event hard-fail floor.
        let frames = vec![
            clean_frame(0, 0.0, "HELLO"),
            {
                let mut f = clean_frame(1, 0.5, "");
                f.bbox = None;
                f
            },
            clean_frame(2, 1.0, "HELLO"),
        ];
        let report =
            analyze_caption_timeline(&frames, 2.0, SIZE, &CaptionThresholds::default()).unwrap();
        assert!(report.flicker.flicker_events == 1);
        assert!(!report.has_issue(ISSUE_FLICKER));
    }

    #[test]
    fn test_safe_margin_issue_past_floor() {
        let frames: Vec<OcrFrame> = clean_timeline()
            .into_iter()
            .map(|mut f| {
                f.bbox = Some(BoundingBox {
                    x0: 240.0,
                    y0: 1820.0,
                    x1: 840.0,
                    y1: 1910.0,
                });
                f
            })
            .collect();
        let report =
            analyze_caption_timeline(&frames, 2.0, SIZE, &CaptionThresholds::default()).unwrap();
        assert!(report.has_issue(ISSUE_SAFE_MARGIN));
        assert!(report.safe_area.score < 1.0);
    }

    #[test]
    fn test_report_serializes_stable_keys() {
        let report = analyze_caption_timeline(
            &clean_timeline(),
            2.0,
            SIZE,
            &CaptionThresholds::default(),
        )
        .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        for key in [
            "overall",
            "coverage",
            "flicker",
            "punctuation",
            "capitalization",
            "safeArea",
            "alignment",
            "jitter",
            "redundancy",
            "segmentation",
            "ocrConfidence",
            "errors",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert!(value.get("sync").is_none(), "sync omitted when absent");
    }

    #[test]
    fn test_metric_value_lookup() {
        let mut report = analyze_caption_timeline(
            &clean_timeline(),
            2.0,
            SIZE,
            &CaptionThresholds::default(),
        )
        .unwrap();
        assert_eq!(report.metric_value("safeArea.score"), Some(1.0));
        assert_eq!(report.metric_value("sync.rating"), None);
        report.sync = Some(SyncReport {
            rating: 0.8,
            offset_seconds: Some(0.12),
        });
        assert_eq!(report.metric_value("sync.rating"), Some(0.8));
        assert_eq!(report.metric_value("bogus"), None);
    }
}
