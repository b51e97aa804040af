//! Statistical validation of the scoring engine itself.
//!
//! Three independent checks prove the judge is trustworthy: determinism
//! (same video, same score), separation (reference videos beat generated
//! ones), and monotonicity (synthetic defects degrade the right sub-score
//! in severity order). Check failures are report fields, never errors:
//! the bench exists to catch engine regressions, not to crash on them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analyzer::CaptionQualityReport;
use crate::error::{CapgateError, Result};
use crate::stats::{median, spearman};
use crate::stress::{StressManifest, StressVariant};

/// The injected scoring boundary. Scoring runs OCR/ASR subprocesses that
/// are CPU/GPU-heavy, so the bench awaits each call before issuing the
/// next (no internal fan-out).
#[async_trait]
pub trait VideoScorer: Send + Sync {
    async fn score(&self, video: &Path) -> anyhow::Result<CaptionQualityReport>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BenchConfig {
    /// Times each determinism sample is re-scored.
    pub determinism_runs: usize,
    /// How many corpus videos feed the determinism check.
    pub determinism_samples: usize,
    /// Maximum tolerated spread across repeat runs.
    pub epsilon: f64,
    /// Minimum inverted-value spread a defect ladder must produce.
    pub min_effect: f64,
    /// A later point may dip below the previous one by at most this much
    /// before it counts as a reversal.
    pub reversal_tolerance: f64,
    /// With at least this many points, rank correlation may excuse
    /// reversals.
    pub min_points_for_rank_fallback: usize,
    /// Spearman floor for the "mostly monotone" fallback.
    pub min_spearman: f64,
    /// Allowed per-video overall drop against the stored baseline.
    pub regression_tolerance: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            determinism_runs: 3,
            determinism_samples: 2,
            epsilon: 1e-6,
            min_effect: 0.05,
            reversal_tolerance: 0.005,
            min_points_for_rank_fallback: 4,
            min_spearman: 0.9,
            regression_tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeterminismCheck {
    pub passed: bool,
    pub runs: usize,
    pub epsilon: f64,
    /// Max over samples of (max - min) across {overall, ocrConfidence}.
    pub worst_delta: f64,
    pub samples: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredVideo {
    pub path: PathBuf,
    pub overall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeparationCheck {
    pub passed: bool,
    pub pro_median: f64,
    pub our_median: f64,
    /// Fraction of (pro, our) pairs where pro scored strictly higher.
    pub pro_beats_our_ratio: f64,
    pub pro_scores: Vec<ScoredVideo>,
    pub our_scores: Vec<ScoredVideo>,
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StressPoint {
    pub severity: u32,
    /// Raw metric value from the report.
    pub value: f64,
    pub video_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StressCheckResult {
    pub recipe_id: String,
    pub source: PathBuf,
    pub expected_metric: String,
    pub points: Vec<StressPoint>,
    pub spearman: f64,
    pub effect: f64,
    pub reversal_count: usize,
    pub monotonic_passed: bool,
    /// None when the recipe names no expected error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_triggered: Option<bool>,
    /// Set when the group could not be evaluated (baseline failed to
    /// score, metric absent from the reports). Skipped groups do not gate
    /// the bench verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl StressCheckResult {
    pub fn gates_pass(&self) -> bool {
        self.skipped_reason.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineRegression {
    pub path: PathBuf,
    pub baseline_overall: f64,
    pub current_overall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineCheck {
    pub passed: bool,
    pub compared: usize,
    pub regressions: Vec<BaselineRegression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchSummary {
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchReport {
    pub created_at: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub determinism: DeterminismCheck,
    pub separation: SeparationCheck,
    pub stress: Vec<StressCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineCheck>,
    pub summary: BenchSummary,
}

/// Corpus handed to [`run_bench`]: reference videos, generated videos, and
/// (optionally) a rendered stress ladder with its manifest.
#[derive(Debug, Clone)]
pub struct BenchCorpus {
    pub pro_videos: Vec<PathBuf>,
    pub our_videos: Vec<PathBuf>,
    pub manifest: Option<StressManifest>,
    pub baseline: Option<BenchReport>,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

fn list_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CapgateError::FileNotFound(dir.to_path_buf()));
    }
    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect();
    videos.sort();
    Ok(videos)
}

/// Scan a corpus directory: `<dir>/pro`, `<dir>/our`, optional
/// `<dir>/stress/manifest.json`.
pub async fn discover_corpus(dir: &Path, baseline_path: Option<&Path>) -> Result<BenchCorpus> {
    let pro_videos = list_videos(&dir.join("pro"))?;
    let our_videos = list_videos(&dir.join("our"))?;
    let manifest_path = StressManifest::path_in(&dir.join("stress"));
    let manifest = if manifest_path.exists() {
        Some(StressManifest::read(&manifest_path).await?)
    } else {
        None
    };
    let baseline = match baseline_path {
        Some(p) if p.exists() => {
            let bytes = tokio::fs::read(p).await?;
            Some(serde_json::from_slice(&bytes)?)
        }
        Some(p) => return Err(CapgateError::FileNotFound(p.to_path_buf())),
        None => None,
    };
    Ok(BenchCorpus {
        pro_videos,
        our_videos,
        manifest,
        baseline,
    })
}

fn determinism_values(report: &CaptionQualityReport) -> [f64; 2] {
    [report.overall, report.ocr_confidence.score]
}

pub async fn run_determinism(
    scorer: &dyn VideoScorer,
    samples: &[PathBuf],
    config: &BenchConfig,
) -> DeterminismCheck {
    let mut worst_delta: f64 = 0.0;
    for sample in samples {
        let mut runs: Vec<[f64; 2]> = Vec::new();
        for _ in 0..config.determinism_runs {
            match scorer.score(sample).await {
                Ok(report) => runs.push(determinism_values(&report)),
                Err(e) => {
                    warn!("determinism sample {:?} failed to score: {}", sample, e);
                    break;
                }
            }
        }
        for axis in 0..2 {
            let values: Vec<f64> = runs.iter().map(|r| r[axis]).collect();
            if let (Some(max), Some(min)) = (
                values.iter().cloned().reduce(f64::max),
                values.iter().cloned().reduce(f64::min),
            ) {
                worst_delta = worst_delta.max(max - min);
            }
        }
    }
    DeterminismCheck {
        passed: worst_delta <= config.epsilon,
        runs: config.determinism_runs,
        epsilon: config.epsilon,
        worst_delta,
        samples: samples.to_vec(),
    }
}

async fn score_all(
    scorer: &dyn VideoScorer,
    videos: &[PathBuf],
    skipped: &mut Vec<PathBuf>,
) -> Vec<ScoredVideo> {
    let mut scored = Vec::new();
    for video in videos {
        match scorer.score(video).await {
            Ok(report) => scored.push(ScoredVideo {
                path: video.clone(),
                overall: report.overall,
            }),
            Err(e) => {
                warn!("skipping {:?}: {}", video, e);
                skipped.push(video.clone());
            }
        }
    }
    scored
}

pub async fn run_separation(
    scorer: &dyn VideoScorer,
    pro_videos: &[PathBuf],
    our_videos: &[PathBuf],
) -> SeparationCheck {
    let mut skipped = Vec::new();
    let pro_scores = score_all(scorer, pro_videos, &mut skipped).await;
    let our_scores = score_all(scorer, our_videos, &mut skipped).await;

    let pro_values: Vec<f64> = pro_scores.iter().map(|s| s.overall).collect();
    let our_values: Vec<f64> = our_scores.iter().map(|s| s.overall).collect();
    let pro_median = median(&pro_values);
    let our_median = median(&our_values);

    let pairs = pro_values.len() * our_values.len();
    let wins = pro_values
        .iter()
        .flat_map(|p| our_values.iter().map(move |o| (p, o)))
        .filter(|(p, o)| p > o)
        .count();
    let pro_beats_our_ratio = if pairs == 0 {
        0.0
    } else {
        wins as f64 / pairs as f64
    };

    SeparationCheck {
        passed: !pro_values.is_empty() && !our_values.is_empty() && pro_median > our_median,
        pro_median,
        our_median,
        pro_beats_our_ratio,
        pro_scores,
        our_scores,
        skipped,
    }
}

/// Monotonicity statistics for one ordered defect ladder.
///
/// `points` are (severity, raw metric value); values are inverted so that
/// "worse" is larger before computing rank correlation.
pub fn evaluate_monotonicity(
    points: &[(u32, f64)],
    config: &BenchConfig,
) -> (f64, f64, usize, bool) {
    let mut ordered: Vec<(u32, f64)> = points.to_vec();
    ordered.sort_by_key(|(severity, _)| *severity);
    let severities: Vec<f64> = ordered.iter().map(|(s, _)| *s as f64).collect();
    let inverted: Vec<f64> = ordered.iter().map(|(_, v)| 1.0 - v).collect();

    let rho = spearman(&severities, &inverted);
    let effect = match (
        inverted.iter().cloned().reduce(f64::max),
        inverted.iter().cloned().reduce(f64::min),
    ) {
        (Some(max), Some(min)) => max - min,
        _ => 0.0,
    };
    let reversal_count = inverted
        .windows(2)
        .filter(|pair| pair[1] < pair[0] - config.reversal_tolerance)
        .count();

    let rank_ok = ordered.len() >= config.min_points_for_rank_fallback
        && rho >= config.min_spearman - 1e-9;
    let passed = effect >= config.min_effect && (reversal_count == 0 || rank_ok);
    (rho, effect, reversal_count, passed)
}

fn skipped_result(
    recipe_id: &str,
    source: &Path,
    expected_metric: &str,
    reason: String,
) -> StressCheckResult {
    StressCheckResult {
        recipe_id: recipe_id.to_string(),
        source: source.to_path_buf(),
        expected_metric: expected_metric.to_string(),
        points: Vec::new(),
        spearman: 0.0,
        effect: 0.0,
        reversal_count: 0,
        monotonic_passed: false,
        error_triggered: None,
        skipped_reason: Some(reason),
    }
}

pub async fn run_stress(
    scorer: &dyn VideoScorer,
    manifest: &StressManifest,
    config: &BenchConfig,
) -> Vec<StressCheckResult> {
    // Group variants by (source, recipe), keeping catalogue order.
    let mut groups: BTreeMap<(PathBuf, String), Vec<&StressVariant>> = BTreeMap::new();
    for v in &manifest.variants {
        groups
            .entry((v.pro_source_path.clone(), v.recipe_id.clone()))
            .or_default()
            .push(v);
    }

    let mut results = Vec::new();
    for ((source, recipe_id), mut variants) in groups {
        variants.sort_by_key(|v| v.severity);
        let expected_metric = variants[0].expected_metric.clone();
        let expected_error = variants[0].expected_error_type.clone();

        // Severity 0 is the clean source itself.
        let baseline_report = match scorer.score(&source).await {
            Ok(r) => r,
            Err(e) => {
                warn!("stress baseline {:?} failed to score: {}", source, e);
                results.push(skipped_result(
                    &recipe_id,
                    &source,
                    &expected_metric,
                    format!("baseline failed to score: {}", e),
                ));
                continue;
            }
        };
        let Some(baseline_value) = baseline_report.metric_value(&expected_metric) else {
            results.push(skipped_result(
                &recipe_id,
                &source,
                &expected_metric,
                format!("metric {} absent from baseline report", expected_metric),
            ));
            continue;
        };

        let mut points = vec![StressPoint {
            severity: 0,
            value: baseline_value,
            video_path: source.clone(),
        }];
        let top_severity = variants.last().map(|v| v.severity).unwrap_or(0);
        let mut top_report: Option<CaptionQualityReport> = None;
        for variant in &variants {
            let report = match scorer.score(&variant.output_path).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        "stress variant {:?} failed to score, dropping point: {}",
                        variant.output_path, e
                    );
                    continue;
                }
            };
            if let Some(value) = report.metric_value(&expected_metric) {
                points.push(StressPoint {
                    severity: variant.severity,
                    value,
                    video_path: variant.output_path.clone(),
                });
            }
            if variant.severity == top_severity {
                top_report = Some(report);
            }
        }

        // The expected-error contract is pinned to the top-severity
        // variant; without its report the check is unanswerable.
        if expected_error.is_some() && top_report.is_none() {
            results.push(skipped_result(
                &recipe_id,
                &source,
                &expected_metric,
                format!("severity {} variant failed to score", top_severity),
            ));
            continue;
        }

        let pairs: Vec<(u32, f64)> = points.iter().map(|p| (p.severity, p.value)).collect();
        let (rho, effect, reversal_count, monotonic_passed) =
            evaluate_monotonicity(&pairs, config);

        let error_triggered = expected_error
            .as_ref()
            .map(|code| top_report.as_ref().map_or(false, |r| r.has_issue(code)));

        debug!(
            "stress {} on {:?}: rho {:.3}, effect {:.3}, reversals {}, passed {}",
            recipe_id, source, rho, effect, reversal_count, monotonic_passed
        );
        results.push(StressCheckResult {
            recipe_id,
            source,
            expected_metric,
            points,
            spearman: rho,
            effect,
            reversal_count,
            monotonic_passed,
            error_triggered,
            skipped_reason: None,
        });
    }
    results
}

pub fn run_baseline(
    current: &SeparationCheck,
    baseline: &BenchReport,
    config: &BenchConfig,
) -> BaselineCheck {
    let previous: BTreeMap<&PathBuf, f64> = baseline
        .separation
        .our_scores
        .iter()
        .map(|s| (&s.path, s.overall))
        .collect();
    let mut regressions = Vec::new();
    let mut compared = 0usize;
    for scored in &current.our_scores {
        if let Some(&prev) = previous.get(&scored.path) {
            compared += 1;
            if scored.overall < prev - config.regression_tolerance {
                regressions.push(BaselineRegression {
                    path: scored.path.clone(),
                    baseline_overall: prev,
                    current_overall: scored.overall,
                });
            }
        }
    }
    BaselineCheck {
        passed: regressions.is_empty(),
        compared,
        regressions,
    }
}

/// Run the full bench: determinism, separation, monotonicity, and the
/// optional baseline comparison, sequentially through the injected scorer.
pub async fn run_bench(
    scorer: &dyn VideoScorer,
    corpus: &BenchCorpus,
    config: &BenchConfig,
    tag: Option<String>,
) -> BenchReport {
    let samples: Vec<PathBuf> = corpus
        .pro_videos
        .iter()
        .chain(corpus.our_videos.iter())
        .take(config.determinism_samples)
        .cloned()
        .collect();
    let determinism = run_determinism(scorer, &samples, config).await;
    let separation = run_separation(scorer, &corpus.pro_videos, &corpus.our_videos).await;
    let stress = match &corpus.manifest {
        Some(manifest) => run_stress(scorer, manifest, config).await,
        None => Vec::new(),
    };
    let baseline = corpus
        .baseline
        .as_ref()
        .map(|b| run_baseline(&separation, b, config));

    let stress_passed = stress
        .iter()
        .filter(|s| s.gates_pass())
        .all(|s| s.monotonic_passed && s.error_triggered.unwrap_or(true));
    // Separation is reported on its own `passed` field only; the overall
    // verdict is determinism, monotonicity, error triggers and regression.
    let passed = determinism.passed
        && stress_passed
        && baseline.as_ref().map(|b| b.passed).unwrap_or(true);

    info!(
        "bench verdict: {} (determinism {}, separation {}, {} stress groups)",
        if passed { "PASS" } else { "FAIL" },
        determinism.passed,
        separation.passed,
        stress.len()
    );
    BenchReport {
        created_at: Utc::now(),
        tag,
        determinism,
        separation,
        stress,
        baseline,
        summary: BenchSummary { passed },
    }
}

/// Persist the report as `<tag>-sweep-results.json` (timestamp when no tag).
pub async fn write_report(report: &BenchReport, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let stem = report
        .tag
        .clone()
        .unwrap_or_else(|| report.created_at.format("%Y%m%dT%H%M%S").to_string());
    let path = dir.join(format!("{}-sweep-results.json", stem));
    tokio::fs::write(&path, serde_json::to_vec_pretty(report)?).await?;
    Ok(path)
}
