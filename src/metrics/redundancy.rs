use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedundancyReport {
    pub score: f64,
    /// Captions shown, displaced by different text, then shown again verbatim.
    pub reappearance_events: usize,
    pub visible_runs: usize,
}

pub fn analyze_redundancy(runs: &[TimelineRun]) -> RedundancyReport {
    let visible: Vec<&TimelineRun> = runs.iter().filter(|r| !r.is_gap()).collect();
    let mut events = 0usize;
    for (j, run) in visible.iter().enumerate() {
        let reappears = visible[..j].iter().enumerate().any(|(i, earlier)| {
            earlier.normalized == run.normalized
                && visible[i + 1..j]
                    .iter()
                    .any(|between| between.normalized != run.normalized)
        });
        if reappears {
            events += 1;
        }
    }
    let score = if visible.is_empty() {
        1.0
    } else {
        clamp_score(1.0 - events as f64 / visible.len() as f64)
    };
    RedundancyReport {
        score,
        reappearance_events: events,
        visible_runs: visible.len(),
    }
}
