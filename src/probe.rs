//! Basic stream facts via ffprobe, used to decide what can be synthesized
//! for a source (audio-desync needs a decodable audio stream).

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CapgateError, Result};
use crate::ffmpeg::find_ffprobe_path;
use crate::types::VideoInfo;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

/// Parse ffprobe's fractional frame rate ("30000/1001", "25/1", "0/0").
fn parse_fraction(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value == "0/0" {
        return None;
    }
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => value.parse().ok(),
    }
}

pub async fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(CapgateError::FileNotFound(path.to_path_buf()));
    }
    let ffprobe = find_ffprobe_path()
        .ok_or_else(|| CapgateError::Ffprobe("ffprobe executable not found".to_string()))?;

    let output = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(CapgateError::Ffprobe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let fps = video.and_then(|v| {
        v.avg_frame_rate
            .as_deref()
            .and_then(parse_fraction)
            .or_else(|| v.r_frame_rate.as_deref().and_then(parse_fraction))
    });

    let info = VideoInfo {
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        duration_seconds: parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse().ok()),
        fps,
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        bitrate: parsed
            .format
            .as_ref()
            .and_then(|f| f.bit_rate.as_deref())
            .and_then(|b| b.parse().ok()),
    };
    debug!("probed {:?}: {:?}", path, info);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraction_forms() {
        assert_eq!(parse_fraction("25/1"), Some(25.0));
        let ntsc = parse_fraction("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_fraction("24"), Some(24.0));
        assert_eq!(parse_fraction("0/0"), None);
        assert_eq!(parse_fraction(""), None);
        assert_eq!(parse_fraction("x/y"), None);
    }

    #[test]
    fn test_ffprobe_json_parsing() {
        let raw = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1080,
                 "height": 1920, "avg_frame_rate": "30/1", "r_frame_rate": "30/1"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "12.5", "bit_rate": "2500000"}
        }"#;
        let parsed: FfprobeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.streams.len(), 2);
        assert_eq!(parsed.format.unwrap().duration.as_deref(), Some("12.5"));
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_not_found() {
        let err = probe_video(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapgateError::FileNotFound(_)));
    }
}
