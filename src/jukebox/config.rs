use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::error::{JukeboxError, JukeboxResult};

/// Runtime settings for the jukebox, read once at startup.
#[derive(Debug, Clone)]
pub struct JukeboxConfig {
    pub bind_addr: SocketAddr,
    /// Initial media root; can be replaced at runtime through the setup page
    pub video_dir: PathBuf,
    pub background_dir: PathBuf,
    pub playlist_path: PathBuf,
    pub session_ttl: Duration,
    pub probe_timeout: Duration,
    pub ffprobe_program: String,
}

impl Default for JukeboxConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            video_dir: PathBuf::from("videos"),
            background_dir: PathBuf::from("backgrounds"),
            playlist_path: PathBuf::from("static/playlist.json"),
            session_ttl: Duration::from_secs(3600),
            probe_timeout: Duration::from_secs(3),
            ffprobe_program: "ffprobe".to_string(),
        }
    }
}

impl JukeboxConfig {
    /// Builds the config from `JUKEBOX_*` environment variables, loading a
    /// `.env` file first when one exists.
    pub fn from_env() -> JukeboxResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(JukeboxError::Config(format!("Failed to read .env: {}", e)));
            }
        }

        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_var("JUKEBOX_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            video_dir: path_var("JUKEBOX_VIDEO_DIR").unwrap_or(defaults.video_dir),
            background_dir: path_var("JUKEBOX_BACKGROUND_DIR").unwrap_or(defaults.background_dir),
            playlist_path: path_var("JUKEBOX_PLAYLIST_PATH").unwrap_or(defaults.playlist_path),
            session_ttl: parse_var::<u64>("JUKEBOX_SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            probe_timeout: parse_var::<u64>("JUKEBOX_PROBE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            ffprobe_program: env::var("JUKEBOX_FFPROBE").unwrap_or(defaults.ffprobe_program),
        })
    }
}

fn path_var(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_var<T>(key: &str) -> JukeboxResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| JukeboxError::Config(format!("{} = {:?}: {}", key, raw, e))),
        _ => Ok(None),
    }
}
