pub mod analyzer;
pub mod bench;
pub mod cli;
pub mod error;
pub mod ffmpeg;
pub mod metrics;
pub mod probe;
pub mod scorer;
pub mod segmenter;
pub mod stats;
pub mod stress;
pub mod thresholds;
pub mod types;

pub use analyzer::{analyze_caption_timeline, CaptionQualityReport, SyncReport};
pub use bench::{run_bench, BenchConfig, BenchCorpus, BenchReport, VideoScorer};
pub use error::{CapgateError, Result};
pub use ffmpeg::{find_ffmpeg_path, find_ffprobe_path};
pub use probe::probe_video;
pub use scorer::SidecarScorer;
pub use segmenter::segment_timeline;
pub use stress::{generate_stress_corpus, StressManifest, StressVariant};
pub use thresholds::CaptionThresholds;
pub use types::{BoundingBox, CaptionSegment, FrameSize, OcrFrame, VideoInfo};
