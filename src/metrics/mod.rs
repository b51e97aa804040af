//! Pure metric analyzers over the segmented caption timeline.
//!
//! Each analyzer is an isolated function `(runs/frames, thresholds, ...) ->
//! { score, diagnostics }` with score 1.0 meaning defect-free and 0.0
//! maximally defective, monotone in its own defect dimension. The aggregator
//! in `analyzer.rs` is the only place that combines them.

mod alignment;
mod capitalization;
mod confidence;
mod coverage;
mod flicker;
mod jitter;
mod punctuation;
mod redundancy;
mod safe_area;
mod segmentation;

pub use alignment::{analyze_alignment, AlignmentReport};
pub use capitalization::{analyze_capitalization, CapitalizationReport, CapitalizationStyle};
pub use confidence::{analyze_confidence, ConfidenceReport};
pub use coverage::{analyze_coverage, CoverageReport};
pub use flicker::{analyze_flicker, FlickerReport};
pub use jitter::{analyze_jitter, JitterReport};
pub use punctuation::{analyze_punctuation, PunctuationReport};
pub use redundancy::{analyze_redundancy, RedundancyReport};
pub use safe_area::{analyze_safe_area, SafeAreaReport};
pub use segmentation::{analyze_segmentation, SegmentationReport};

pub(crate) fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
