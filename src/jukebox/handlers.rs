use axum::Form;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use super::assets::serve_file;
use super::background::{list_themes, select_background};
use super::catalogue::{Catalogue, ResolvedSong};
use super::error::{JukeboxError, JukeboxResult};
use super::metadata::{ALLOWED_PAGE_SIZES, Page, filter_available, load_playlist};
use super::queue::{Admission, Advance, RejectReason, SessionPlaybackState};
use super::session::{SessionCookie, get_session_id, load_or_create};
use super::templates::{
    PageLink, PageSizeOption, PlayerTemplate, PlaylistTemplate, ScoreTemplate, SettingsTemplate,
    SetupVideoDirTemplate,
};
use super::types::{
    BackgroundFolderSet, BackgroundFolders, FolderForm, PlaylistQuery, QueueAdmitted,
    QueueSnapshot, SharedState, SongForm, VideoDirForm, VideoDirSet,
};
use super::validation::{SessionId, validate_folder_name, validate_song_id};

/// Runs a catalogue-touching state transition on the blocking pool and hands
/// back the updated state together with the transition's result.
async fn run_transition<T, F>(
    catalogue: Catalogue,
    mut playback: SessionPlaybackState,
    transition: F,
) -> JukeboxResult<(SessionPlaybackState, T)>
where
    F: FnOnce(&mut SessionPlaybackState, &Catalogue) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let outcome = transition(&mut playback, &catalogue);
        (playback, outcome)
    })
    .await
    .map_err(|e| JukeboxError::Io(std::io::Error::other(e)))
}

/// Picks a background for the session's theme. A missing image folder only
/// costs the page its background.
fn background_for(state: &SharedState, theme: &str) -> Option<String> {
    match select_background(&state.config.background_dir, theme) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!("No background for theme {}: {}", theme, e);
            None
        }
    }
}

fn session_cookie(state: &SharedState, session_id: SessionId) -> SessionCookie {
    SessionCookie::new(session_id, state.config.session_ttl)
}

async fn render_player(
    state: &SharedState,
    playback: &SessionPlaybackState,
    video: Option<ResolvedSong>,
) -> PlayerTemplate {
    let total_videos = state.catalogue().count_candidates_async().await;
    let position = video.as_ref().and_then(|_| playback.queue_position());

    PlayerTemplate {
        bg_img: background_for(state, &playback.background_folder),
        current_song: video.as_ref().and(playback.current_song.clone()),
        video: video.map(|v| v.url_path()),
        queue_position: position.map(|(position, _)| position),
        queue_length: position.map(|(_, length)| length),
        queue: playback.queue.to_vec(),
        total_videos,
    }
}

/// Renders the player. With songs waiting, the head of the queue is loaded
/// as the current song.
pub async fn player_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> JukeboxResult<(SessionCookie, PlayerTemplate)> {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let (playback, video) = if playback.queue.is_empty() {
        (playback, None)
    } else {
        let (playback, video) =
            run_transition(state.catalogue(), playback, |p, c| p.start(c)).await?;
        if let Some(song) = &playback.current_song {
            tracing::info!("Session {} now playing {}", session_id, song);
        }
        state.sessions.set(&session_id, playback.clone());
        (playback, video)
    };

    let page = render_player(&state, &playback, video).await;
    Ok((session_cookie(&state, session_id), page))
}

/// Plays the submitted song immediately, leaving the queue alone.
pub async fn direct_play(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<SongForm>,
) -> JukeboxResult<(SessionCookie, PlayerTemplate)> {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let song = form.song.as_deref().map(str::trim).unwrap_or_default();
    let (playback, video) = if song.is_empty() {
        (playback, None)
    } else {
        let requested = song.to_string();
        let (playback, video) =
            run_transition(state.catalogue(), playback, move |p, c| p.play_direct(&requested, c))
                .await?;
        match &video {
            Some(_) => {
                tracing::info!("Session {} playing {} directly", session_id, song);
                state.sessions.set(&session_id, playback.clone());
            }
            None => tracing::info!("Direct play of unknown song {}", song),
        }
        (playback, video)
    };

    let page = render_player(&state, &playback, video).await;
    Ok((session_cookie(&state, session_id), page))
}

/// Paginated listing of the catalogue metadata, limited to songs whose
/// video is actually playable.
pub async fn playlist(
    State(state): State<SharedState>,
    Query(query): Query<PlaylistQuery>,
) -> PlaylistTemplate {
    let items = load_playlist(&state.config.playlist_path).await;
    let scan = state.catalogue().scan().await;
    let available = filter_available(items, &scan);

    let ok_count = available.items.len();
    let page = Page::clamp(query.page.as_deref(), query.page_size.as_deref(), ok_count);

    PlaylistTemplate {
        playlist: page.slice(&available.items).to_vec(),
        page: page.page,
        total_pages: page.total_pages,
        page_size: page.page_size,
        page_sizes: ALLOWED_PAGE_SIZES
            .iter()
            .map(|&size| PageSizeOption {
                size,
                selected: size == page.page_size,
            })
            .collect(),
        pages: (1..=page.total_pages)
            .map(|number| PageLink {
                number,
                current: number == page.page,
            })
            .collect(),
        ok_count,
        error_count: available.error_count,
    }
}

/// Validates a song and appends it to the session's queue.
pub async fn add_to_queue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<SongForm>,
) -> JukeboxResult<(SessionCookie, Json<QueueAdmitted>)> {
    let song = validate_song_id(form.song.as_deref().unwrap_or_default())?.to_string();

    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let requested = song.clone();
    let (playback, admission) =
        run_transition(state.catalogue(), playback, move |p, c| p.admit(&requested, c)).await?;

    match admission {
        Admission::Admitted(queue) => {
            tracing::info!("Session {} queued {} ({} waiting)", session_id, song, queue.len());
            // Last write wins if the same session admits concurrently
            state.sessions.set(&session_id, playback);
            Ok((
                session_cookie(&state, session_id),
                Json(QueueAdmitted {
                    status: "ok",
                    message: "OK",
                    queue,
                }),
            ))
        }
        Admission::Rejected(RejectReason::Duplicate) => Err(JukeboxError::Duplicate(song)),
        Admission::Rejected(RejectReason::Invalid) => Err(JukeboxError::InvalidInput(
            "Error in this song, choose another".to_string(),
        )),
    }
}

pub async fn get_queue(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, Json<QueueSnapshot>) {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    (
        session_cookie(&state, session_id),
        Json(QueueSnapshot {
            queue: playback.queue.to_vec(),
        }),
    )
}

/// Finishes the current song and reports the next one, if any.
pub async fn next_song(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, Json<Advance>) {
    let session_id = get_session_id(&headers);
    let mut playback = load_or_create(state.sessions.as_ref(), &session_id);

    let advance = playback.advance();
    tracing::info!("Session {} advanced: {:?}", session_id, advance);
    state.sessions.set(&session_id, playback);

    (session_cookie(&state, session_id), Json(advance))
}

pub async fn get_background_folders(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, Json<BackgroundFolders>) {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    (
        session_cookie(&state, session_id),
        Json(BackgroundFolders {
            folders: list_themes(&state.config.background_dir),
            current: playback.background_folder,
        }),
    )
}

pub async fn set_background_folder(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<FolderForm>,
) -> JukeboxResult<(SessionCookie, Json<BackgroundFolderSet>)> {
    let folder = validate_folder_name(form.folder.as_deref().unwrap_or_default())?.to_string();

    if !list_themes(&state.config.background_dir).contains(&folder) {
        return Err(JukeboxError::InvalidInput("Invalid folder".to_string()));
    }

    let session_id = get_session_id(&headers);
    let mut playback = load_or_create(state.sessions.as_ref(), &session_id);
    playback.background_folder = folder.clone();
    state.sessions.set(&session_id, playback);

    tracing::info!("Session {} switched background to {}", session_id, folder);

    Ok((
        session_cookie(&state, session_id),
        Json(BackgroundFolderSet {
            status: "ok",
            folder,
        }),
    ))
}

pub async fn score(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, ScoreTemplate) {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let page = ScoreTemplate {
        bg_img: background_for(&state, &playback.background_folder),
    };
    (session_cookie(&state, session_id), page)
}

pub async fn settings(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, SettingsTemplate) {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let page = SettingsTemplate {
        bg_img: background_for(&state, &playback.background_folder),
        background_folders: list_themes(&state.config.background_dir),
        current_background: playback.background_folder,
        video_dir: state.video_dir().display().to_string(),
    };
    (session_cookie(&state, session_id), page)
}

pub async fn setup_video_dir_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (SessionCookie, SetupVideoDirTemplate) {
    let session_id = get_session_id(&headers);
    let playback = load_or_create(state.sessions.as_ref(), &session_id);

    let page = SetupVideoDirTemplate {
        bg_img: background_for(&state, &playback.background_folder),
        video_dir: state.video_dir().display().to_string(),
    };
    (session_cookie(&state, session_id), page)
}

/// Points the catalogue at another directory for every session.
pub async fn setup_video_dir(
    State(state): State<SharedState>,
    Form(form): Form<VideoDirForm>,
) -> JukeboxResult<Json<VideoDirSet>> {
    let invalid = || JukeboxError::InvalidInput("Invalid directory".to_string());

    let requested = form.video_dir.as_deref().map(str::trim).unwrap_or_default();
    if requested.is_empty() {
        return Err(invalid());
    }

    let is_dir = tokio::fs::metadata(requested)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(invalid());
    }

    state.set_video_dir(requested.into());
    tracing::info!("Video directory changed to {}", requested);

    Ok(Json(VideoDirSet {
        status: "success",
        video_dir: requested.to_string(),
    }))
}

pub async fn serve_video(
    State(state): State<SharedState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    serve_file(&state.video_dir(), &path, &headers).await
}

pub async fn serve_background(
    State(state): State<SharedState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    serve_file(&state.config.background_dir, &path, &headers).await
}
