//! Every numeric cutoff the engine uses lives here as data, so sensitivity
//! can be tuned and tested independently of the analyzer logic.

use serde::{Deserialize, Serialize};

/// Threshold bag for one analysis call. Immutable once passed in; callers
/// override individual fields before the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionThresholds {
    /// Token similarity at or above which two OCR readings are treated as
    /// the same caption (case/whitespace-insensitive).
    pub fuzzy_match_similarity: f64,
    /// Minimum margin to each frame edge, as a ratio of frame width/height.
    pub safe_margin_ratio: f64,
    /// Fraction of timeline span that should carry a caption.
    pub min_coverage_ratio: f64,
    /// Sentence heuristics: a capitalized segment with at least this many
    /// words is expected to end in terminal punctuation.
    pub min_sentence_words: usize,
    pub flicker: FlickerThresholds,
    pub alignment: AlignmentThresholds,
    pub jitter: JitterThresholds,
    pub ocr_confidence: ConfidenceThresholds,
    pub hard_fail: HardFailThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlickerThresholds {
    /// A same-text reappearance after a gap at most this long counts as a
    /// flicker event rather than a legitimate re-display.
    pub max_gap_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlignmentThresholds {
    /// Mean |center offset| / frame width at which the score reaches 0.
    pub max_mean_abs_center_dx_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JitterThresholds {
    pub max_mean_center_delta_px: f64,
    pub max_p95_center_delta_px: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfidenceThresholds {
    /// Mean confidence at or below this floor scores 0.
    pub floor: f64,
}

/// Severity floors past which the aggregator emits a structured issue,
/// distinct from the soft scoring cutoffs above.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HardFailThresholds {
    /// `caption_safe_margin` once this fraction of bbox frames violates.
    pub safe_area_violation_ratio: f64,
    /// `caption_flicker` once this many flicker events are seen.
    pub flicker_events: usize,
    /// `caption_low_confidence` once mean OCR confidence drops below this.
    pub min_mean_confidence: f64,
}

impl Default for CaptionThresholds {
    fn default() -> Self {
        Self {
            fuzzy_match_similarity: 0.9,
            safe_margin_ratio: 0.05,
            min_coverage_ratio: 0.5,
            min_sentence_words: 4,
            flicker: FlickerThresholds::default(),
            alignment: AlignmentThresholds::default(),
            jitter: JitterThresholds::default(),
            ocr_confidence: ConfidenceThresholds::default(),
            hard_fail: HardFailThresholds::default(),
        }
    }
}

impl Default for FlickerThresholds {
    fn default() -> Self {
        Self {
            max_gap_seconds: 1.0,
        }
    }
}

impl Default for AlignmentThresholds {
    fn default() -> Self {
        Self {
            max_mean_abs_center_dx_ratio: 0.25,
        }
    }
}

impl Default for JitterThresholds {
    fn default() -> Self {
        Self {
            max_mean_center_delta_px: 4.0,
            max_p95_center_delta_px: 10.0,
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { floor: 0.3 }
    }
}

impl Default for HardFailThresholds {
    fn default() -> Self {
        Self {
            safe_area_violation_ratio: 0.25,
            flicker_events: 2,
            min_mean_confidence: 0.55,
        }
    }
}

/// The stock threshold set for burned-in caption analysis.
pub fn default_burned_in_caption_thresholds() -> CaptionThresholds {
    CaptionThresholds::default()
}
