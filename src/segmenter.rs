//! Collapses a per-frame OCR timeline into contiguous caption runs.
//!
//! A "run" is a maximal stretch of frames whose normalized text is identical
//! or fuzzy-equal. Empty-text stretches become gap runs: they never reach the
//! public segment output, but the flicker analyzer needs them to tell a
//! dropout apart from a legitimate caption change.

use tracing::debug;

use crate::error::{CapgateError, Result};
use crate::thresholds::CaptionThresholds;
use crate::types::{CaptionSegment, OcrFrame};

/// Internal timeline unit: a visible caption run or an on-screen gap.
#[derive(Debug, Clone)]
pub struct TimelineRun {
    /// Representative display text (first frame of the run, trimmed).
    pub text: String,
    /// Case/whitespace-normalized text; empty for gap runs.
    pub normalized: String,
    pub start: f64,
    /// Last matching frame's timestamp + one frame step.
    pub end: f64,
    /// Indices into the frame slice this run was built from, in time order.
    pub frame_indices: Vec<usize>,
    pub mean_confidence: f64,
}

impl TimelineRun {
    pub fn is_gap(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Lowercase, whitespace-collapsed form used for run matching.
pub fn normalize_caption_text(text: &str) -> String {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-level Dice similarity between two normalized texts, in [0, 1].
pub fn token_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let mut remaining = tokens_b.clone();
    let mut common = 0usize;
    for token in &tokens_a {
        if let Some(pos) = remaining.iter().position(|t| t == token) {
            remaining.remove(pos);
            common += 1;
        }
    }
    (2.0 * common as f64) / (tokens_a.len() + tokens_b.len()) as f64
}

fn validate_frames(frames: &[OcrFrame], fps: f64) -> Result<()> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(CapgateError::Validation(format!("invalid fps: {}", fps)));
    }
    for frame in frames {
        if !frame.timestamp.is_finite() {
            return Err(CapgateError::Validation(format!(
                "non-finite timestamp on frame {}",
                frame.frame_number
            )));
        }
        if !frame.confidence.is_finite() {
            return Err(CapgateError::Validation(format!(
                "non-finite confidence on frame {}",
                frame.frame_number
            )));
        }
        if let Some(bbox) = &frame.bbox {
            if ![bbox.x0, bbox.y0, bbox.x1, bbox.y1]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(CapgateError::Validation(format!(
                    "non-finite bbox on frame {}",
                    frame.frame_number
                )));
            }
        }
    }
    Ok(())
}

/// Build the full run list (visible runs and gaps) from an OCR timeline.
///
/// Frames are sorted by timestamp first, so callers may pass them in any
/// order. Run boundaries are frame-step-aligned: every run ends one frame
/// step (`1/fps`) after its last frame.
pub fn build_runs(
    frames: &[OcrFrame],
    fps: f64,
    thresholds: &CaptionThresholds,
) -> Result<Vec<TimelineRun>> {
    validate_frames(frames, fps)?;
    let frame_step = 1.0 / fps;

    let mut order: Vec<usize> = (0..frames.len()).collect();
    order.sort_by(|&a, &b| {
        frames[a]
            .timestamp
            .partial_cmp(&frames[b].timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut runs: Vec<TimelineRun> = Vec::new();
    let mut current: Option<RunAccumulator> = None;

    for idx in order {
        let frame = &frames[idx];
        let normalized = normalize_caption_text(&frame.text);

        let continues = match &current {
            Some(acc) => {
                if acc.normalized.is_empty() || normalized.is_empty() {
                    acc.normalized == normalized
                } else {
                    acc.normalized == normalized
                        || token_similarity(&acc.normalized, &normalized)
                            >= thresholds.fuzzy_match_similarity
                }
            }
            None => false,
        };

        if continues {
            let acc = current.as_mut().unwrap();
            acc.push(idx, frame);
        } else {
            if let Some(acc) = current.take() {
                runs.push(acc.finish(frame_step));
            }
            current = Some(RunAccumulator::open(idx, frame, normalized));
        }
    }
    if let Some(acc) = current.take() {
        runs.push(acc.finish(frame_step));
    }

    debug!(
        "built {} runs ({} visible) from {} frames",
        runs.len(),
        runs.iter().filter(|r| !r.is_gap()).count(),
        frames.len()
    );
    Ok(runs)
}

/// Collapse an OCR timeline into time-ordered, non-overlapping caption
/// segments. Gap runs are dropped from the output.
pub fn segment_timeline(
    frames: &[OcrFrame],
    fps: f64,
    thresholds: &CaptionThresholds,
) -> Result<Vec<CaptionSegment>> {
    let runs = build_runs(frames, fps, thresholds)?;
    Ok(runs
        .into_iter()
        .filter(|r| !r.is_gap())
        .map(|r| CaptionSegment {
            text: r.text.clone(),
            start: r.start,
            end: r.end,
            duration_seconds: r.end - r.start,
            confidence: Some(r.mean_confidence),
        })
        .collect())
}

struct RunAccumulator {
    text: String,
    normalized: String,
    start: f64,
    last_ts: f64,
    frame_indices: Vec<usize>,
    confidence_sum: f64,
}

impl RunAccumulator {
    fn open(idx: usize, frame: &OcrFrame, normalized: String) -> Self {
        Self {
            text: frame.text.trim().to_string(),
            normalized,
            start: frame.timestamp,
            last_ts: frame.timestamp,
            frame_indices: vec![idx],
            confidence_sum: frame.confidence,
        }
    }

    fn push(&mut self, idx: usize, frame: &OcrFrame) {
        self.last_ts = frame.timestamp;
        self.frame_indices.push(idx);
        self.confidence_sum += frame.confidence;
    }

    fn finish(self, frame_step: f64) -> TimelineRun {
        let n = self.frame_indices.len() as f64;
        TimelineRun {
            text: self.text,
            normalized: self.normalized,
            start: self.start,
            end: self.last_ts + frame_step,
            frame_indices: self.frame_indices,
            mean_confidence: self.confidence_sum / n,
        }
    }
}
