use askama::Template;
use axum::response::{Html, IntoResponse, Response};

use super::error::JukeboxError;
use super::metadata::PlaylistItem;

#[derive(Template)]
#[template(path = "player.html")]
pub struct PlayerTemplate {
    pub bg_img: Option<String>,
    /// URL path of the video under `/video/`
    pub video: Option<String>,
    pub current_song: Option<String>,
    pub queue_position: Option<usize>,
    pub queue_length: Option<usize>,
    pub queue: Vec<String>,
    pub total_videos: usize,
}

pub struct PageLink {
    pub number: usize,
    pub current: bool,
}

pub struct PageSizeOption {
    pub size: usize,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "playlist.html")]
pub struct PlaylistTemplate {
    pub playlist: Vec<PlaylistItem>,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub page_sizes: Vec<PageSizeOption>,
    pub pages: Vec<PageLink>,
    pub ok_count: usize,
    pub error_count: usize,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub bg_img: Option<String>,
    pub background_folders: Vec<String>,
    pub current_background: String,
    pub video_dir: String,
}

#[derive(Template)]
#[template(path = "score.html")]
pub struct ScoreTemplate {
    pub bg_img: Option<String>,
}

#[derive(Template)]
#[template(path = "setup_video_dir.html")]
pub struct SetupVideoDirTemplate {
    pub bg_img: Option<String>,
    pub video_dir: String,
}

fn render_html<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => JukeboxError::Template(e).into_response(),
    }
}

impl IntoResponse for PlayerTemplate {
    fn into_response(self) -> Response {
        render_html(&self)
    }
}

impl IntoResponse for PlaylistTemplate {
    fn into_response(self) -> Response {
        render_html(&self)
    }
}

impl IntoResponse for SettingsTemplate {
    fn into_response(self) -> Response {
        render_html(&self)
    }
}

impl IntoResponse for ScoreTemplate {
    fn into_response(self) -> Response {
        render_html(&self)
    }
}

impl IntoResponse for SetupVideoDirTemplate {
    fn into_response(self) -> Response {
        render_html(&self)
    }
}
