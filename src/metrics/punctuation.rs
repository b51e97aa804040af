use serde::{Deserialize, Serialize};

use super::clamp_score;
use crate::segmenter::TimelineRun;
use crate::thresholds::CaptionThresholds;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PunctuationReport {
    pub score: f64,
    /// Segments that read as complete sentences but lack `.`, `!` or `?`.
    pub missing_terminal_punctuation_count: usize,
    pub sentence_like_count: usize,
}

fn ends_with_terminal_punctuation(text: &str) -> bool {
    // Ignore trailing quotes/ellipsis dots around the terminal mark.
    text.trim_end_matches(['"', '\'', '\u{201d}', '\u{2019}', ')'])
        .ends_with(['.', '!', '?', '\u{2026}'])
}

fn looks_like_sentence(text: &str, min_words: usize) -> bool {
    let words = text.split_whitespace().count();
    if words < min_words {
        return false;
    }
    text.chars()
        .find(|c| c.is_alphabetic())
        .is_some_and(|c| c.is_uppercase())
}

pub fn analyze_punctuation(
    runs: &[TimelineRun],
    thresholds: &CaptionThresholds,
) -> PunctuationReport {
    let visible: Vec<&TimelineRun> = runs.iter().filter(|r| !r.is_gap()).collect();
    let mut sentence_like = 0usize;
    let mut missing = 0usize;
    for run in &visible {
        let text = run.text.trim();
        if looks_like_sentence(text, thresholds.min_sentence_words) {
            sentence_like += 1;
            if !ends_with_terminal_punctuation(text) {
                missing += 1;
            }
        }
    }
    let score = if visible.is_empty() {
        1.0
    } else {
        clamp_score(1.0 - missing as f64 / visible.len() as f64)
    };
    PunctuationReport {
        score,
        missing_terminal_punctuation_count: missing,
        sentence_like_count: sentence_like,
    }
}
