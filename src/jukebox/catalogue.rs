//! Filesystem-backed song catalogue.
//!
//! The catalogue is never cached: every scan and every resolution walks the
//! media root again, so files dropped into the folder are picked up without a
//! restart.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use walkdir::WalkDir;

/// Supported video extensions, in resolution priority order
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".ogg"];

/// How a candidate file is checked before it is listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Existence and a non-zero size are enough
    SizeOnly,
    /// Additionally require `ffprobe` to find a video stream within `timeout`
    Ffprobe { program: PathBuf, timeout: Duration },
}

impl Probe {
    /// Probes with `program`. The binary is looked up on every spawn, so
    /// installing or removing it takes effect without a restart.
    pub fn ffprobe(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Probe::Ffprobe {
            program: program.into(),
            timeout,
        }
    }
}

/// Result of walking the media root.
#[derive(Debug, Clone, Default)]
pub struct CatalogueScan {
    /// Basename (without extension) -> absolute path
    pub entries: BTreeMap<String, PathBuf>,
    /// Duplicate basenames plus files that failed the playability check
    pub error_count: usize,
}

impl CatalogueScan {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A song located in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSong {
    /// Path relative to the catalogue root, as served under `/video/`
    pub relative_path: PathBuf,
    pub size: u64,
}

impl ResolvedSong {
    /// Relative path with forward slashes, suitable for a URL
    pub fn url_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Request-scoped view of the media root.
#[derive(Debug, Clone)]
pub struct Catalogue {
    root: PathBuf,
    probe: Probe,
}

impl Catalogue {
    pub fn new(root: impl Into<PathBuf>, probe: Probe) -> Self {
        Self {
            root: root.into(),
            probe,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds `{identifier}{ext}` anywhere under the root, trying extensions in
    /// priority order. The first match in walk order wins.
    pub fn resolve(&self, identifier: &str) -> Option<ResolvedSong> {
        if identifier.is_empty() {
            return None;
        }

        VIDEO_EXTENSIONS.iter().find_map(|ext| {
            let candidate = format!("{}{}", identifier, ext);
            walk_files(&self.root).find_map(|entry| {
                if entry.file_name().to_str() != Some(candidate.as_str()) {
                    return None;
                }
                let relative_path = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                Some(ResolvedSong {
                    relative_path,
                    size,
                })
            })
        })
    }

    /// Async wrapper around [`Catalogue::resolve`] that runs the walk on the
    /// blocking pool.
    pub async fn resolve_async(&self, identifier: &str) -> Option<ResolvedSong> {
        let catalogue = self.clone();
        let identifier = identifier.to_string();
        tokio::task::spawn_blocking(move || catalogue.resolve(&identifier))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Resolve task failed: {}", e);
                None
            })
    }

    /// Counts distinct video basenames without probing them.
    pub fn count_candidates(&self) -> usize {
        walk_files(&self.root)
            .filter_map(|entry| video_key(entry.path()))
            .collect::<HashSet<_>>()
            .len()
    }

    pub async fn count_candidates_async(&self) -> usize {
        let catalogue = self.clone();
        tokio::task::spawn_blocking(move || catalogue.count_candidates())
            .await
            .unwrap_or(0)
    }

    /// Walks the root and keeps the first playable file for every basename.
    pub async fn scan(&self) -> CatalogueScan {
        let root = self.root.clone();
        let candidates = tokio::task::spawn_blocking(move || collect_candidates(&root))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Catalogue walk failed: {}", e);
                Vec::new()
            });

        let mut scan = CatalogueScan::default();
        for (key, path) in candidates {
            if scan.entries.contains_key(&key) {
                tracing::debug!("Duplicate basename {} at {}", key, path.display());
                scan.error_count += 1;
                continue;
            }
            if is_playable(&path, &self.probe).await {
                scan.entries.insert(key, path);
            } else {
                tracing::debug!("Unplayable video {}", path.display());
                scan.error_count += 1;
            }
        }

        tracing::debug!(
            "Scanned {}: {} videos, {} errors",
            self.root.display(),
            scan.entries.len(),
            scan.error_count
        );
        scan
    }
}

/// Checks that a file exists, is not empty and, when probing with ffprobe,
/// contains a video stream. Timeouts and failed probes count as unplayable;
/// a probe binary that cannot be found leaves the size check in charge.
pub async fn is_playable(path: &Path, probe: &Probe) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => return false,
    }

    let (program, timeout) = match probe {
        Probe::SizeOnly => return true,
        Probe::Ffprobe { program, timeout } => (program, *timeout),
    };

    let mut cmd = Command::new(program);
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=codec_type",
        "-of",
        "default=noprint_wrappers=1",
    ])
    .arg(path)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(
                "{} not found, accepting {} by size",
                program.display(),
                path.display()
            );
            return true;
        }
        Err(e) => {
            tracing::warn!("Failed to spawn {}: {}", program.display(), e);
            return false;
        }
    };

    // On timeout the child is dropped and killed
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            tracing::warn!("Probe of {} failed: {}", path.display(), e);
            false
        }
        Err(_) => {
            tracing::warn!("Probe of {} timed out after {:?}", path.display(), timeout);
            false
        }
    }
}

/// Basename of a file with a supported extension (compared case-insensitively)
fn video_key(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !VIDEO_EXTENSIONS.iter().any(|e| e[1..] == ext) {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

fn collect_candidates(root: &Path) -> Vec<(String, PathBuf)> {
    walk_files(root)
        .filter_map(|entry| video_key(entry.path()).map(|key| (key, entry.into_path())))
        .collect()
}

/// Regular files under `root`, sorted by name at each level. Unreadable
/// entries (including a missing root) are skipped.
fn walk_files(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
}

