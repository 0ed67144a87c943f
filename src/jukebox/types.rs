use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::catalogue::{Catalogue, Probe};
use super::config::JukeboxConfig;
use super::session::SessionStore;

pub struct AppState {
    pub config: JukeboxConfig,
    pub probe: Probe,

    /// Media root; read per request, replaced by the setup endpoint
    video_dir: RwLock<PathBuf>,

    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(config: JukeboxConfig, probe: Probe, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            video_dir: RwLock::new(config.video_dir.clone()),
            config,
            probe,
            sessions,
        }
    }

    pub fn video_dir(&self) -> PathBuf {
        self.video_dir.read().clone()
    }

    pub fn set_video_dir(&self, dir: PathBuf) {
        *self.video_dir.write() = dir;
    }

    /// Snapshot of the catalogue as configured right now
    pub fn catalogue(&self) -> Catalogue {
        Catalogue::new(self.video_dir(), self.probe.clone())
    }
}

/// Helper type for cleaner function signatures
pub type SharedState = Arc<AppState>;

/// Form body carrying a song identifier
#[derive(Debug, Default, Deserialize)]
pub struct SongForm {
    #[serde(default)]
    pub song: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FolderForm {
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoDirForm {
    #[serde(default)]
    pub video_dir: Option<String>,
}

/// Raw `/playlist` query; values are clamped, never rejected
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueAdmitted {
    pub status: &'static str,
    pub message: &'static str,
    pub queue: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueSnapshot {
    pub queue: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BackgroundFolders {
    pub folders: Vec<String>,
    pub current: String,
}

#[derive(Debug, Serialize)]
pub struct BackgroundFolderSet {
    pub status: &'static str,
    pub folder: String,
}

#[derive(Debug, Serialize)]
pub struct VideoDirSet {
    pub status: &'static str,
    pub video_dir: String,
}
