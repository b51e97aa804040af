//! Default [`VideoScorer`]: per-frame OCR read from a sidecar file.
//!
//! OCR itself runs out of process; this engine only judges timelines. A
//! video `clip.mp4` is scored from `clip.mp4.ocr.json` sitting next to it,
//! with fps and frame geometry taken from the sidecar when present and
//! from ffprobe otherwise.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{analyze_caption_timeline, CaptionQualityReport};
use crate::bench::VideoScorer;
use crate::error::{CapgateError, Result};
use crate::probe::probe_video;
use crate::thresholds::CaptionThresholds;
use crate::types::{FrameSize, OcrFrame};

pub const OCR_SIDECAR_SUFFIX: &str = ".ocr.json";

/// On-disk OCR timeline for one video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OcrSidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<FrameSize>,
    pub frames: Vec<OcrFrame>,
}

pub fn sidecar_path(video: &Path) -> PathBuf {
    let mut name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(OCR_SIDECAR_SUFFIX);
    video.with_file_name(name)
}

pub async fn read_sidecar(video: &Path) -> Result<OcrSidecar> {
    let path = sidecar_path(video);
    if !path.exists() {
        return Err(CapgateError::FileNotFound(path));
    }
    let bytes = tokio::fs::read(&path).await?;
    let sidecar: OcrSidecar = serde_json::from_slice(&bytes)?;
    debug!("read {} OCR frames from {:?}", sidecar.frames.len(), path);
    Ok(sidecar)
}

#[derive(Debug, Clone)]
pub struct SidecarScorer {
    thresholds: CaptionThresholds,
}

impl SidecarScorer {
    pub fn new(thresholds: CaptionThresholds) -> Self {
        Self { thresholds }
    }

    pub async fn score_video(&self, video: &Path) -> Result<CaptionQualityReport> {
        if !video.exists() {
            return Err(CapgateError::FileNotFound(video.to_path_buf()));
        }
        let sidecar = read_sidecar(video).await?;

        let (fps, frame_size) = match (sidecar.fps, sidecar.frame_size) {
            (Some(fps), Some(size)) => (fps, size),
            (fps, size) => {
                let info = probe_video(video).await?;
                let fps = fps.or(info.fps).ok_or_else(|| {
                    CapgateError::Validation(format!("no frame rate for {:?}", video))
                })?;
                let size = match (size, info.width, info.height) {
                    (Some(size), _, _) => size,
                    (None, Some(width), Some(height)) => FrameSize { width, height },
                    _ => {
                        return Err(CapgateError::Validation(format!(
                            "no frame geometry for {:?}",
                            video
                        )))
                    }
                };
                (fps, size)
            }
        };

        analyze_caption_timeline(&sidecar.frames, fps, frame_size, &self.thresholds)
    }
}

impl Default for SidecarScorer {
    fn default() -> Self {
        Self::new(CaptionThresholds::default())
    }
}

#[async_trait]
impl VideoScorer for SidecarScorer {
    async fn score(&self, video: &Path) -> anyhow::Result<CaptionQualityReport> {
        Ok(self.score_video(video).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/corpus/pro/clip.mp4")),
            PathBuf::from("/corpus/pro/clip.mp4.ocr.json")
        );
    }

    #[tokio::test]
    async fn test_scores_video_with_complete_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        tokio::fs::write(&video, b"not a real video").await.unwrap();

        let sidecar = OcrSidecar {
            fps: Some(2.0),
            frame_size: Some(FrameSize {
                width: 1080,
                height: 1920,
            }),
            frames: vec![
                OcrFrame {
                    frame_number: 0,
                    timestamp: 0.0,
                    text: "A full caption sentence here.".to_string(),
                    confidence: 0.95,
                    bbox: None,
                },
                OcrFrame {
                    frame_number: 1,
                    timestamp: 0.5,
                    text: "A full caption sentence here.".to_string(),
                    confidence: 0.95,
                    bbox: None,
                },
            ],
        };
        tokio::fs::write(
            sidecar_path(&video),
            serde_json::to_vec(&sidecar).unwrap(),
        )
        .await
        .unwrap();

        // fps and geometry come from the sidecar, so no ffprobe call.
        let scorer = SidecarScorer::default();
        let report = scorer.score_video(&video).await.unwrap();
        assert!(report.overall > 0.0);
        assert_eq!(report.ocr_confidence.frame_count, 2);
    }

    #[tokio::test]
    async fn test_missing_sidecar_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        tokio::fs::write(&video, b"x").await.unwrap();
        let err = SidecarScorer::default().score_video(&video).await.unwrap_err();
        assert!(matches!(err, CapgateError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let err = SidecarScorer::default()
            .score_video(Path::new("/no/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapgateError::FileNotFound(_)));
    }
}
