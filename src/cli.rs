//! Command line surface: score one video, synthesize a stress ladder, or
//! run the full validation bench over a corpus directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::bench::{discover_corpus, run_bench, write_report, BenchConfig};
use crate::error::Result;
use crate::probe::probe_video;
use crate::scorer::SidecarScorer;
use crate::stress::generate_stress_corpus;
use crate::thresholds::CaptionThresholds;
use crate::types::VideoInfo;

#[derive(Parser)]
#[command(
    name = "capgate",
    about = "Caption quality scoring and judge validation for short-form video",
    version
)]
pub struct Cli {
    /// Emit debug-level logs.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score one video from its OCR sidecar and print the report as JSON.
    Score {
        video: PathBuf,

        /// Threshold overrides as a JSON file; unset fields keep defaults.
        #[arg(long, env = "CAPGATE_THRESHOLDS")]
        thresholds: Option<PathBuf>,

        /// Also write the report to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render the synthetic defect ladder for one clean source video.
    Stress {
        video: PathBuf,

        /// Output directory for rendered variants and the manifest.
        #[arg(long, default_value = "stress")]
        dir: PathBuf,

        /// Restrict to one recipe id (e.g. "crop-bottom").
        #[arg(long)]
        only: Option<String>,

        /// Per-variant render timeout.
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },

    /// Validate the judge against a corpus: determinism, separation,
    /// monotonicity, and optional baseline regression.
    Bench {
        /// Corpus root containing pro/ and our/ subdirectories.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Label for the results file (`<tag>-sweep-results.json`).
        #[arg(long)]
        tag: Option<String>,

        /// Restrict the stress phase to one recipe id.
        #[arg(long)]
        only: Option<String>,

        /// Render the stress ladders and stop before scoring.
        #[arg(long, conflicts_with = "score_only")]
        render_only: bool,

        /// Skip rendering; score whatever the stress manifest lists.
        #[arg(long)]
        score_only: bool,

        /// Previous bench report to regression-check our videos against.
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Threshold overrides as a JSON file.
        #[arg(long, env = "CAPGATE_THRESHOLDS")]
        thresholds: Option<PathBuf>,

        /// Per-variant render timeout.
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
}

async fn load_thresholds(path: Option<&Path>) -> Result<CaptionThresholds> {
    match path {
        Some(path) => {
            let bytes = tokio::fs::read(path).await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        None => Ok(CaptionThresholds::default()),
    }
}

async fn probe_sources(videos: &[PathBuf]) -> Result<Vec<(PathBuf, VideoInfo)>> {
    let mut sources = Vec::with_capacity(videos.len());
    for video in videos {
        let info = probe_video(video).await?;
        sources.push((video.clone(), info));
    }
    Ok(sources)
}

/// Run one parsed command to completion and return the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Score {
            video,
            thresholds,
            output,
        } => {
            let thresholds = load_thresholds(thresholds.as_deref()).await?;
            let scorer = SidecarScorer::new(thresholds);
            let report = scorer.score_video(&video).await?;
            let json = serde_json::to_string_pretty(&report)?;
            if let Some(output) = output {
                tokio::fs::write(&output, &json).await?;
            }
            println!("{}", json);
            Ok(if report.errors.is_empty() { 0 } else { 1 })
        }

        Command::Stress {
            video,
            dir,
            only,
            timeout_secs,
        } => {
            let sources = probe_sources(std::slice::from_ref(&video)).await?;
            let manifest = generate_stress_corpus(
                &sources,
                &dir,
                only.as_deref(),
                Duration::from_secs(timeout_secs),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            Ok(0)
        }

        Command::Bench {
            dir,
            tag,
            only,
            render_only,
            score_only,
            baseline,
            thresholds,
            timeout_secs,
        } => {
            let thresholds = load_thresholds(thresholds.as_deref()).await?;
            let mut corpus = discover_corpus(&dir, baseline.as_deref()).await?;

            if !score_only {
                let sources = probe_sources(&corpus.pro_videos).await?;
                let manifest = generate_stress_corpus(
                    &sources,
                    &dir.join("stress"),
                    only.as_deref(),
                    Duration::from_secs(timeout_secs),
                )
                .await?;
                corpus.manifest = Some(manifest);
            }
            // With --score-only the manifest comes off disk unfiltered.
            if let (Some(manifest), Some(recipe)) = (corpus.manifest.as_mut(), only.as_deref()) {
                manifest.restrict_to_recipe(recipe);
            }
            if render_only {
                info!("stress ladders rendered, stopping before scoring");
                return Ok(0);
            }

            let scorer = SidecarScorer::new(thresholds);
            let report = run_bench(&scorer, &corpus, &BenchConfig::default(), tag).await;
            let path = write_report(&report, &dir).await?;
            info!("bench report written to {:?}", path);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.summary.passed { 0 } else { 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bench_flags() {
        let cli = Cli::try_parse_from([
            "capgate",
            "bench",
            "--dir",
            "/corpus",
            "--tag",
            "nightly",
            "--only",
            "crop-bottom",
            "--score-only",
        ])
        .unwrap();
        match cli.command {
            Command::Bench {
                dir,
                tag,
                only,
                score_only,
                render_only,
                ..
            } => {
                assert_eq!(dir, PathBuf::from("/corpus"));
                assert_eq!(tag.as_deref(), Some("nightly"));
                assert_eq!(only.as_deref(), Some("crop-bottom"));
                assert!(score_only);
                assert!(!render_only);
            }
            _ => panic!("expected bench"),
        }
    }

    #[test]
    fn test_render_only_conflicts_with_score_only() {
        assert!(Cli::try_parse_from([
            "capgate",
            "bench",
            "--render-only",
            "--score-only"
        ])
        .is_err());
    }
}
