use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;

use super::error::{JukeboxError, JukeboxResult};

/// Theme used for new sessions and as the first fallback
pub const DEFAULT_THEME: &str = "default";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Lists the theme folders under `root`, hidden ones excluded, with
/// `default` first. Never returns an empty list.
pub fn list_themes(root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(root) else {
        return vec![DEFAULT_THEME.to_string()];
    };

    let mut themes: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    themes.sort();

    if let Some(index) = themes.iter().position(|t| t == DEFAULT_THEME) {
        let default = themes.remove(index);
        themes.insert(0, default);
    }

    if themes.is_empty() {
        themes.push(DEFAULT_THEME.to_string());
    }
    themes
}

/// Directory a theme request lands on: the theme itself, then `default`,
/// then the root. The second value is the subfolder name ("" for the root).
pub fn resolve_theme_dir(root: &Path, theme: &str) -> (PathBuf, String) {
    let requested = root.join(theme);
    if !theme.is_empty() && requested.is_dir() {
        return (requested, theme.to_string());
    }

    let default = root.join(DEFAULT_THEME);
    if default.is_dir() {
        return (default, DEFAULT_THEME.to_string());
    }

    (root.to_path_buf(), String::new())
}

/// Picks a random image for `theme`, returned relative to `root` with
/// forward slashes so it can go straight into a `/background/` URL.
pub fn select_background(root: &Path, theme: &str) -> JukeboxResult<String> {
    let (dir, subfolder) = resolve_theme_dir(root, theme);

    let entries = fs::read_dir(&dir).map_err(|_| {
        JukeboxError::NotFound(format!("background directory {}", dir.display()))
    })?;

    let images: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_image(name))
        .collect();

    let image = images
        .choose(&mut rand::rng())
        .ok_or_else(|| JukeboxError::NotFound(format!("background images in {}", dir.display())))?;

    if subfolder.is_empty() {
        Ok(image.clone())
    } else {
        Ok(format!("{}/{}", subfolder, image))
    }
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
