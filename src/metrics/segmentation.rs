use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;

/// Function words that should not end a caption: a boundary right after one
/// of these reads as an unnatural mid-phrase break.
const DANGLING_TOKENS: &[&str] = &[
    "and", "but", "or", "nor", "so", "yet", "because", "although", "while", "if", "than", "that",
    "to", "of", "for", "in", "on", "at", "by", "with", "from", "into", "the", "a", "an",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationReport {
    pub score: f64,
    pub dangling_conjunction_count: usize,
    pub visible_runs: usize,
}

pub fn analyze_segmentation(runs: &[TimelineRun]) -> SegmentationReport {
    let visible: Vec<&TimelineRun> = runs.iter().filter(|r| !r.is_gap()).collect();
    let dangling = visible
        .iter()
        .filter(|run| {
            run.normalized
                .split_whitespace()
                .last()
                .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
                .is_some_and(|t| DANGLING_TOKENS.contains(&t))
        })
        .count();
    let score = if visible.is_empty() {
        1.0
    } else {
        clamp_score(1.0 - dangling as f64 / visible.len() as f64)
    };
    SegmentationReport {
        score,
        dangling_conjunction_count: dangling,
        visible_runs: visible.len(),
    }
}
