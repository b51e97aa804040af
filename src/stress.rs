//! Synthesizes severity ladders of degraded variants from a clean source.
//!
//! Every recipe is a declarative filter/encode record; one generic transcode
//! step turns it into an ffmpeg invocation. Severity is ordinal within a
//! recipe only, a severity-3 crop is not comparable to a severity-3 shake.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CapgateError, Result};
use crate::ffmpeg::find_ffmpeg_path;
use crate::types::VideoInfo;

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const RECIPE_CROP_BOTTOM: &str = "crop-bottom";
pub const RECIPE_CAPTION_FLICKER: &str = "caption-flicker";
pub const RECIPE_CONTRAST_SABOTAGE: &str = "contrast-sabotage";
pub const RECIPE_SHAKE: &str = "shake";
pub const RECIPE_COMPRESSION: &str = "compression";
pub const RECIPE_AUDIO_DESYNC: &str = "audio-desync";

/// Encoder settings for one variant render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncodeParams {
    /// None means stream-copy the video.
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u32>,
    pub preset: String,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            video_codec: Some("libx264".to_string()),
            video_bitrate_kbps: None,
            crf: Some(18),
            preset: "veryfast".to_string(),
        }
    }
}

/// Declarative transcode description, consumed by [`render_variant`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_filter: Option<String>,
    /// Audio-only delay; renders with a second, offset input and video
    /// stream copy so the pixels stay byte-identical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_delay_ms: Option<u32>,
    pub encode: EncodeParams,
}

impl FilterSpec {
    /// Assemble the full ffmpeg argument list for this record.
    pub fn to_ffmpeg_args(&self, source: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];

        if let Some(delay_ms) = self.audio_delay_ms {
            let offset = delay_ms as f64 / 1000.0;
            args.extend([
                "-i".into(),
                source.to_string_lossy().into_owned(),
                "-itsoffset".into(),
                format!("{:.3}", offset),
                "-i".into(),
                source.to_string_lossy().into_owned(),
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "aac".into(),
            ]);
            args.push(output.to_string_lossy().into_owned());
            return args;
        }

        args.extend(["-i".into(), source.to_string_lossy().into_owned()]);
        if let Some(vf) = &self.video_filter {
            args.extend(["-vf".into(), vf.clone()]);
        }
        if let Some(af) = &self.audio_filter {
            args.extend(["-af".into(), af.clone()]);
        }
        match &self.encode.video_codec {
            Some(codec) => {
                args.extend(["-c:v".into(), codec.clone()]);
                args.extend(["-preset".into(), self.encode.preset.clone()]);
                if let Some(kbps) = self.encode.video_bitrate_kbps {
                    args.extend([
                        "-b:v".into(),
                        format!("{}k", kbps),
                        "-maxrate".into(),
                        format!("{}k", kbps),
                        "-bufsize".into(),
                        format!("{}k", kbps * 2),
                    ]);
                } else if let Some(crf) = self.encode.crf {
                    args.extend(["-crf".into(), crf.to_string()]);
                }
            }
            None => args.extend(["-c:v".into(), "copy".into()]),
        }
        args.extend(["-c:a".into(), "copy".into()]);
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// One synthetically degraded rendition of a clean source video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StressVariant {
    pub id: String,
    pub recipe_id: String,
    pub recipe_label: String,
    /// Ordinal within the recipe; larger = worse.
    pub severity: u32,
    pub pro_source_path: PathBuf,
    pub output_path: PathBuf,
    pub recipe_params: serde_json::Value,
    /// Dotted report path the bench checks for monotone degradation.
    pub expected_metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error_type: Option<String>,
    pub filter: FilterSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StressManifest {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub root_dir: PathBuf,
    pub variants: Vec<StressVariant>,
}

impl StressManifest {
    pub fn new(root_dir: PathBuf, variants: Vec<StressVariant>) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            created_at: Utc::now(),
            root_dir,
            variants,
        }
    }

    pub fn path_in(root_dir: &Path) -> PathBuf {
        root_dir.join(MANIFEST_FILE_NAME)
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CapgateError::FileNotFound(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Drop every variant not belonging to the given recipe.
    pub fn restrict_to_recipe(&mut self, recipe_id: &str) {
        self.variants.retain(|v| v.recipe_id == recipe_id);
    }
}

fn variant(
    pro_source: &Path,
    root_dir: &Path,
    recipe_id: &str,
    recipe_label: &str,
    severity: u32,
    recipe_params: serde_json::Value,
    expected_metric: &str,
    expected_error_type: Option<&str>,
    filter: FilterSpec,
) -> StressVariant {
    let stem = pro_source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    StressVariant {
        id: Uuid::new_v4().to_string(),
        recipe_id: recipe_id.to_string(),
        recipe_label: recipe_label.to_string(),
        severity,
        pro_source_path: pro_source.to_path_buf(),
        output_path: root_dir.join(format!("{}-{}-s{}.mp4", stem, recipe_id, severity)),
        recipe_params,
        expected_metric: expected_metric.to_string(),
        expected_error_type: expected_error_type.map(str::to_string),
        filter,
    }
}

/// The fixed recipe catalogue: a severity ladder per defect dimension.
/// Audio-desync is dropped when the probe reports no decodable audio.
pub fn build_default_variants(
    pro_source: &Path,
    root_dir: &Path,
    info: &VideoInfo,
) -> Vec<StressVariant> {
    let mut variants = Vec::new();

    // Crop into the bottom safe area, pad back to the original height so
    // the frame geometry the OCR sees stays constant.
    for (i, px) in [10u32, 20, 40, 80].into_iter().enumerate() {
        variants.push(variant(
            pro_source,
            root_dir,
            RECIPE_CROP_BOTTOM,
            "bottom crop into the caption safe area",
            i as u32 + 1,
            json!({ "cropPx": px }),
            "safeArea.score",
            Some(crate::analyzer::ISSUE_SAFE_MARGIN),
            FilterSpec {
                video_filter: Some(format!(
                    "crop=iw:ih-{px}:0:0,pad=iw:ih+{px}:0:0:color=black"
                )),
                audio_filter: None,
                audio_delay_ms: None,
                encode: EncodeParams::default(),
            },
        ));
    }

    // Periodically blank the caption band; higher severity = shorter period
    // = more dropouts per second.
    for (i, period) in [2.0f64, 1.0, 0.5, 0.25].into_iter().enumerate() {
        let on = period * 0.25;
        variants.push(variant(
            pro_source,
            root_dir,
            RECIPE_CAPTION_FLICKER,
            "periodic caption band blanking",
            i as u32 + 1,
            json!({ "periodSeconds": period, "blankSeconds": on }),
            "flicker.score",
            Some(crate::analyzer::ISSUE_FLICKER),
            FilterSpec {
                video_filter: Some(format!(
                    "drawbox=x=0:y=ih*0.72:w=iw:h=ih*0.28:color=black:t=fill:\
                     enable='lt(mod(t\\,{period})\\,{on})'"
                )),
                audio_filter: None,
                audio_delay_ms: None,
                encode: EncodeParams::default(),
            },
        ));
    }

    // Contrast/brightness/saturation wash plus blur and noise: degrades OCR
    // certainty before it destroys the text.
    for (i, contrast) in [0.85f64, 0.7, 0.55, 0.4].into_iter().enumerate() {
        let severity = i as u32 + 1;
        let brightness = 0.04 * severity as f64;
        let blur = severity;
        let noise = 4 * severity;
        variants.push(variant(
            pro_source,
            root_dir,
            RECIPE_CONTRAST_SABOTAGE,
            "contrast wash with blur and noise",
            severity,
            json!({
                "contrast": contrast,
                "brightness": brightness,
                "blurRadius": blur,
                "noiseStrength": noise
            }),
            "ocrConfidence.score",
            Some(crate::analyzer::ISSUE_LOW_CONFIDENCE),
            FilterSpec {
                video_filter: Some(format!(
                    "eq=contrast={contrast}:brightness={brightness}:saturation=0.8,\
                     boxblur={blur}:1,noise=alls={noise}:allf=t"
                )),
                audio_filter: None,
                audio_delay_ms: None,
                encode: EncodeParams::default(),
            },
        ));
    }

    // Time-varying crop offset; cropped border is scaled back out so output
    // dimensions match the source.
    for (i, amplitude) in [1u32, 2, 4, 8].into_iter().enumerate() {
        let a2 = amplitude * 2;
        variants.push(variant(
            pro_source,
            root_dir,
            RECIPE_SHAKE,
            "sinusoidal frame shake",
            i as u32 + 1,
            json!({ "amplitudePx": amplitude }),
            "jitter.score",
            None,
            FilterSpec {
                video_filter: Some(format!(
                    "crop=iw-{a2}:ih-{a2}:\
                     x='{amplitude}+{amplitude}*sin(2*PI*t*3.1)':\
                     y='{amplitude}+{amplitude}*cos(2*PI*t*2.3)',\
                     scale=iw+{a2}:ih+{a2}"
                )),
                audio_filter: None,
                audio_delay_ms: None,
                encode: EncodeParams::default(),
            },
        ));
    }

    // Downscale-then-upscale plus a starved bitrate.
    for (i, kbps) in [3000u32, 1500, 800].into_iter().enumerate() {
        variants.push(variant(
            pro_source,
            root_dir,
            RECIPE_COMPRESSION,
            "two-pass downscale and bitrate starvation",
            i as u32 + 1,
            json!({ "bitrateKbps": kbps, "downscaleFactor": 2 }),
            "ocrConfidence.score",
            None,
            FilterSpec {
                video_filter: Some("scale=iw/2:-2,scale=2*iw:-2".to_string()),
                audio_filter: None,
                audio_delay_ms: None,
                encode: EncodeParams {
                    video_codec: Some("libx264".to_string()),
                    video_bitrate_kbps: Some(kbps),
                    crf: None,
                    preset: "veryfast".to_string(),
                },
            },
        ));
    }

    if info.has_audio() {
        for (i, delay_ms) in [80u32, 160, 250, 400].into_iter().enumerate() {
            variants.push(variant(
                pro_source,
                root_dir,
                RECIPE_AUDIO_DESYNC,
                "audio delayed against untouched video",
                i as u32 + 1,
                json!({ "delayMs": delay_ms }),
                "sync.rating",
                Some(crate::analyzer::ISSUE_GLOBAL_OFFSET),
                FilterSpec {
                    video_filter: None,
                    audio_filter: None,
                    audio_delay_ms: Some(delay_ms),
                    encode: EncodeParams {
                        video_codec: None,
                        video_bitrate_kbps: None,
                        crf: None,
                        preset: "veryfast".to_string(),
                    },
                },
            ));
        }
    } else {
        debug!("source {:?} has no audio stream, skipping audio-desync", pro_source);
    }

    variants
}

/// Render one variant with ffmpeg, bounded by `render_timeout`.
pub async fn render_variant(variant: &StressVariant, render_timeout: Duration) -> Result<()> {
    let ffmpeg = find_ffmpeg_path()
        .ok_or_else(|| CapgateError::Ffmpeg("ffmpeg executable not found".to_string()))?;
    if let Some(parent) = variant.output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let args = variant
        .filter
        .to_ffmpeg_args(&variant.pro_source_path, &variant.output_path);
    debug!("rendering {} severity {}: ffmpeg {:?}", variant.recipe_id, variant.severity, args);

    let run = tokio::process::Command::new(ffmpeg).args(&args).output();
    let output = tokio::time::timeout(render_timeout, run)
        .await
        .map_err(|_| {
            CapgateError::Timeout(format!(
                "rendering {} severity {} exceeded {:?}",
                variant.recipe_id, variant.severity, render_timeout
            ))
        })??;

    if !output.status.success() {
        return Err(CapgateError::Ffmpeg(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// Render the full ladder for every source sequentially and persist one
/// manifest covering them all.
///
/// `only` restricts the catalogue to a single recipe id. One failed render
/// is logged and skipped; the manifest only lists variants that actually
/// exist on disk.
pub async fn generate_stress_corpus(
    sources: &[(PathBuf, VideoInfo)],
    root_dir: &Path,
    only: Option<&str>,
    render_timeout: Duration,
) -> Result<StressManifest> {
    let mut planned = Vec::new();
    for (pro_source, info) in sources {
        if !pro_source.exists() {
            return Err(CapgateError::FileNotFound(pro_source.clone()));
        }
        planned.extend(
            build_default_variants(pro_source, root_dir, info)
                .into_iter()
                .filter(|v| only.map_or(true, |r| v.recipe_id == r)),
        );
    }
    let mut rendered = Vec::new();
    for v in planned {
        match render_variant(&v, render_timeout).await {
            Ok(()) => rendered.push(v),
            Err(e) => warn!(
                "skipping {} severity {}: {}",
                v.recipe_id, v.severity, e
            ),
        }
    }
    info!("rendered {} stress variants into {:?}", rendered.len(), root_dir);
    let manifest = StressManifest::new(root_dir.to_path_buf(), rendered);
    manifest.write(&StressManifest::path_in(root_dir)).await?;
    Ok(manifest)
}
