use serde::{Deserialize, Serialize};

use crate::segmenter::TimelineRun;

/// Dominant capitalization style across the timeline. The score rewards
/// internal consistency, not any particular style; all-caps captions are a
/// first-class, high-scoring choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapitalizationStyle {
    AllCaps,
    SentenceCase,
    Lowercase,
    Mixed,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapitalizationReport {
    pub score: f64,
    pub style: CapitalizationStyle,
    pub classified_segments: usize,
    pub dominant_count: usize,
}

fn classify(text: &str) -> Option<CapitalizationStyle> {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    let lower = letters.len() - upper;
    if lower == 0 {
        return Some(CapitalizationStyle::AllCaps);
    }
    if upper == 0 {
        return Some(CapitalizationStyle::Lowercase);
    }
    // Sentence case allows capitalized words mid-text (names, "I") as long
    // as uppercase letters stay a small minority and the text leads upper.
    let leads_upper = letters[0].is_uppercase();
    if leads_upper && (upper as f64) / (letters.len() as f64) <= 0.3 {
        return Some(CapitalizationStyle::SentenceCase);
    }
    Some(CapitalizationStyle::Mixed)
}

pub fn analyze_capitalization(runs: &[TimelineRun]) -> CapitalizationReport {
    let mut counts: Vec<(CapitalizationStyle, usize)> = Vec::new();
    let mut classified = 0usize;
    for run in runs.iter().filter(|r| !r.is_gap()) {
        if let Some(style) = classify(&run.text) {
            classified += 1;
            match counts.iter_mut().find(|(s, _)| *s == style) {
                Some((_, n)) => *n += 1,
                None => counts.push((style, 1)),
            }
        }
    }
    if classified == 0 {
        return CapitalizationReport {
            score: 1.0,
            style: CapitalizationStyle::Unknown,
            classified_segments: 0,
            dominant_count: 0,
        };
    }
    let (style, dominant_count) = counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .unwrap_or((CapitalizationStyle::Unknown, 0));
    CapitalizationReport {
        score: dominant_count as f64 / classified as f64,
        style,
        classified_segments: classified,
        dominant_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::build_runs;
    use crate::thresholds::CaptionThresholds;
    use crate::types::OcrFrame;

    fn runs_for(texts: &[&str]) -> Vec<TimelineRun> {
        let frames: Vec<OcrFrame> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| OcrFrame {
                frame_number: i as u64,
                timestamp: i as f64,
                text: t.to_string(),
                confidence: 0.9,
                bbox: None,
            })
            .collect();
        build_runs(&frames, 1.0, &CaptionThresholds::default()).unwrap()
    }

    #[test]
    fn test_all_caps_timeline_is_valid_style() {
        let runs = runs_for(&["THIS IS LOUD", "AND PROUD", "EVERY SINGLE TIME"]);
        let report = analyze_capitalization(&runs);
        assert_eq!(report.style, CapitalizationStyle::AllCaps);
        assert!((report.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_consistent_sentence_case_scores_high() {
        let runs = runs_for(&["This is fine", "Another normal line", "More of the same"]);
        let report = analyze_capitalization(&runs);
        assert_eq!(report.style, CapitalizationStyle::SentenceCase);
        assert!((report.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inconsistent_styles_score_lower() {
        let runs = runs_for(&["SHOUTING NOW", "quiet now", "Normal again", "MORE SHOUTING"]);
        let report = analyze_capitalization(&runs);
        assert!(report.score < 1.0);
        assert_eq!(report.classified_segments, 4);
    }

    #[test]
    fn test_style_serializes_snake_case() {
        let json = serde_json::to_string(&CapitalizationStyle::AllCaps).unwrap();
        assert_eq!(json, "\"all_caps\"");
    }

    #[test]
    fn test_digits_only_is_unknown() {
        let runs = runs_for(&["12345"]);
        let report = analyze_capitalization(&runs);
        assert_eq!(report.style, CapitalizationStyle::Unknown);
        assert_eq!(report.score, 1.0);
    }
}
