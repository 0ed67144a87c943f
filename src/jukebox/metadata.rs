use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalogue::CatalogueScan;

pub const ALLOWED_PAGE_SIZES: [usize; 3] = [100, 200, 500];

/// One row of `playlist.json`. `filename` is the catalogue key, without
/// extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub filename: String,
    pub artist: String,
    pub title: String,
    pub part: String,
}

/// Reads the playlist metadata. A missing or malformed file is logged and
/// treated as an empty playlist.
pub async fn load_playlist(path: &Path) -> Vec<PlaylistItem> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Playlist metadata {} unavailable: {}", path.display(), e);
            return Vec::new();
        }
    };

    serde_json::from_slice(&raw).unwrap_or_else(|e| {
        tracing::warn!("Playlist metadata {} is invalid: {}", path.display(), e);
        Vec::new()
    })
}

/// Playlist rows that have a playable video, plus the error tally shown on
/// the playlist page.
#[derive(Debug, Clone, Default)]
pub struct AvailablePlaylist {
    pub items: Vec<PlaylistItem>,
    /// Scan errors plus rows whose video is missing
    pub error_count: usize,
}

pub fn filter_available(items: Vec<PlaylistItem>, scan: &CatalogueScan) -> AvailablePlaylist {
    let total = items.len();
    let items: Vec<PlaylistItem> = items
        .into_iter()
        .filter(|item| scan.contains(&item.filename))
        .collect();
    let missing = total - items.len();

    AvailablePlaylist {
        error_count: scan.error_count + missing,
        items,
    }
}

/// A clamped page request over `total_items` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl Page {
    /// Clamps raw query values: unknown page sizes fall back to the smallest
    /// allowed size, and the page is kept within `1..=total_pages`.
    pub fn clamp(page: Option<&str>, page_size: Option<&str>, total_items: usize) -> Self {
        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| ALLOWED_PAGE_SIZES.contains(size))
            .unwrap_or(ALLOWED_PAGE_SIZES[0]);

        let total_pages = total_items.div_ceil(page_size).max(1);

        let page = page
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, total_pages);

        Self {
            page,
            page_size,
            total_pages,
        }
    }

    pub fn range(&self, total_items: usize) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(total_items);
        let end = (start + self.page_size).min(total_items);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }
}
