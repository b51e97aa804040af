//! Locates the external transcoding tools once per process.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::{debug, error};
use which::which;

use ffmpeg_sidecar::{
    command::ffmpeg_is_installed,
    download::{download_ffmpeg_package, ffmpeg_download_url, unpack_ffmpeg},
    paths::sidecar_dir,
};

#[cfg(not(windows))]
const FFMPEG_NAME: &str = "ffmpeg";
#[cfg(windows)]
const FFMPEG_NAME: &str = "ffmpeg.exe";

#[cfg(not(windows))]
const FFPROBE_NAME: &str = "ffprobe";
#[cfg(windows)]
const FFPROBE_NAME: &str = "ffprobe.exe";

static FFMPEG_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| find_tool(FFMPEG_NAME, true));
static FFPROBE_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| find_tool(FFPROBE_NAME, false));

pub fn find_ffmpeg_path() -> Option<PathBuf> {
    FFMPEG_PATH.clone()
}

pub fn find_ffprobe_path() -> Option<PathBuf> {
    FFPROBE_PATH.clone()
}

fn find_tool(name: &str, install_if_missing: bool) -> Option<PathBuf> {
    if let Ok(path) = which(name) {
        debug!("found {} in PATH: {:?}", name, path);
        return Some(path);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join(name);
        if candidate.is_file() {
            debug!("found {} in working directory: {:?}", name, candidate);
            return Some(candidate);
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(folder) = exe_path.parent() {
            let candidate = folder.join(name);
            if candidate.is_file() {
                debug!("found {} next to executable: {:?}", name, candidate);
                return Some(candidate);
            }
        }
    }

    // The sidecar bundle ships both tools, but only attempt the download
    // once, on the ffmpeg lookup.
    if let Ok(dir) = sidecar_dir() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            debug!("found {} in sidecar dir: {:?}", name, candidate);
            return Some(candidate);
        }
    }

    if install_if_missing {
        debug!("{} not found, installing sidecar build", name);
        if let Err(e) = install_sidecar_ffmpeg() {
            error!("failed to install ffmpeg: {}", e);
            return None;
        }
        if let Ok(path) = which(name) {
            return Some(path);
        }
        if let Ok(dir) = sidecar_dir() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    error!("{} not found", name);
    None
}

fn install_sidecar_ffmpeg() -> Result<(), String> {
    if ffmpeg_is_installed() {
        return Ok(());
    }
    let url = ffmpeg_download_url().map_err(|e| e.to_string())?;
    let destination = sidecar_dir().map_err(|e| e.to_string())?;
    debug!("downloading ffmpeg from {:?}", url);
    let archive = download_ffmpeg_package(url, &destination).map_err(|e| e.to_string())?;
    unpack_ffmpeg(&archive, &destination).map_err(|e| e.to_string())?;
    Ok(())
}
