use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use karaoke_jukebox::JukeboxError;
use karaoke_jukebox::jukebox::assets::{ByteRange, parse_range_header, safe_join};
use karaoke_jukebox::jukebox::background::{list_themes, resolve_theme_dir, select_background};
use karaoke_jukebox::jukebox::catalogue::{Catalogue, CatalogueScan, Probe, is_playable};
use karaoke_jukebox::jukebox::metadata::{Page, PlaylistItem, filter_available, load_playlist};
use karaoke_jukebox::jukebox::queue::{
    Admission, Advance, PlaybackPhase, RejectReason, SessionPlaybackState, SongQueue,
};
use karaoke_jukebox::jukebox::session::{
    MemorySessionStore, SessionCookie, SessionStore, get_session_id, load_or_create,
};
use karaoke_jukebox::jukebox::validation::{SessionId, validate_folder_name, validate_song_id};

fn write_file(root: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

fn catalogue_at(root: &Path) -> Catalogue {
    Catalogue::new(root, Probe::SizeOnly)
}

fn item(filename: &str) -> PlaylistItem {
    PlaylistItem {
        filename: filename.to_string(),
        artist: "Artist".to_string(),
        title: format!("Song {}", filename),
        part: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Queue state machine
// ---------------------------------------------------------------------------

#[test]
fn test_admission_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "1.mp4", b"0123456789");
    write_file(dir.path(), "2.mp4", b"");
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    assert_eq!(playback.phase(), PlaybackPhase::Empty);

    assert_eq!(
        playback.admit("1", &catalogue),
        Admission::Admitted(vec!["1".to_string()])
    );
    assert_eq!(playback.phase(), PlaybackPhase::Queued);

    assert_eq!(
        playback.admit("2", &catalogue),
        Admission::Rejected(RejectReason::Invalid)
    );
    assert_eq!(
        playback.admit("1", &catalogue),
        Admission::Rejected(RejectReason::Duplicate)
    );
    assert_eq!(
        playback.admit("404", &catalogue),
        Admission::Rejected(RejectReason::Invalid)
    );
    assert_eq!(playback.queue.as_slice(), ["1".to_string()]);
}

#[test]
fn test_duplicate_checked_before_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "7.mp4", b"video");
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    assert!(matches!(playback.admit("7", &catalogue), Admission::Admitted(_)));

    // Even once the file is gone the second submission is a duplicate
    fs::remove_file(path).unwrap();
    assert_eq!(
        playback.admit("7", &catalogue),
        Admission::Rejected(RejectReason::Duplicate)
    );
}

#[test]
fn test_admission_keeps_fifo_order() {
    let dir = tempfile::tempdir().unwrap();
    for song in ["30", "10", "20"] {
        write_file(dir.path(), &format!("{}.mp4", song), b"video");
    }
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    playback.admit("30", &catalogue);
    playback.admit("10", &catalogue);
    let last = playback.admit("20", &catalogue);

    assert_eq!(
        last,
        Admission::Admitted(vec!["30".to_string(), "10".to_string(), "20".to_string()])
    );
}

#[test]
fn test_advance_scenario() {
    let mut playback = SessionPlaybackState {
        queue: ["10", "20"].into_iter().collect(),
        current_song: Some("10".to_string()),
        ..Default::default()
    };
    assert_eq!(playback.phase(), PlaybackPhase::Playing);

    assert_eq!(
        playback.advance(),
        Advance::Next {
            next_song: "20".to_string()
        }
    );
    assert_eq!(playback.queue.as_slice(), ["20".to_string()]);
    assert_eq!(playback.current_song, None);
    assert_eq!(playback.phase(), PlaybackPhase::Queued);
}

#[test]
fn test_advance_on_empty_queue() {
    let mut playback = SessionPlaybackState::default();
    assert_eq!(playback.advance(), Advance::Empty);
    assert_eq!(playback.advance(), Advance::Empty);
    assert_eq!(playback.phase(), PlaybackPhase::Empty);
}

#[test]
fn test_advance_without_current_song_keeps_queue() {
    let mut playback = SessionPlaybackState {
        queue: ["5", "6"].into_iter().collect(),
        ..Default::default()
    };

    assert_eq!(
        playback.advance(),
        Advance::Next {
            next_song: "5".to_string()
        }
    );
    assert_eq!(playback.queue.len(), 2);
}

#[test]
fn test_last_song_advances_to_empty() {
    let mut playback = SessionPlaybackState {
        queue: ["1"].into_iter().collect(),
        current_song: Some("1".to_string()),
        ..Default::default()
    };

    assert_eq!(playback.advance(), Advance::Empty);
    assert!(playback.queue.is_empty());
    assert_eq!(playback.phase(), PlaybackPhase::Empty);
}

#[test]
fn test_start_promotes_head() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "songs/1.mp4", b"video");
    write_file(dir.path(), "2.webm", b"video");
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    assert_eq!(playback.start(&catalogue), None);

    playback.admit("1", &catalogue);
    playback.admit("2", &catalogue);

    let video = playback.start(&catalogue).unwrap();
    assert_eq!(video.url_path(), "songs/1.mp4");
    assert_eq!(playback.current_song.as_deref(), Some("1"));
    assert_eq!(playback.phase(), PlaybackPhase::Playing);
    assert_eq!(playback.queue_position(), Some((1, 2)));
}

#[test]
fn test_start_leaves_vanished_head_unplayed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "1.mp4", b"video");
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    playback.admit("1", &catalogue);
    fs::remove_file(path).unwrap();

    assert_eq!(playback.start(&catalogue), None);
    assert_eq!(playback.current_song, None);
    assert_eq!(playback.queue.as_slice(), ["1".to_string()]);
}

#[test]
fn test_direct_play_bypasses_queue() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "8.ogg", b"video");
    let catalogue = catalogue_at(dir.path());

    let mut playback = SessionPlaybackState::default();
    let video = playback.play_direct("8", &catalogue).unwrap();

    assert_eq!(video.url_path(), "8.ogg");
    assert_eq!(playback.current_song.as_deref(), Some("8"));
    assert!(playback.queue.is_empty());
    assert_eq!(playback.queue_position(), None);

    // Direct play does not count towards the duplicate check
    assert!(matches!(playback.admit("8", &catalogue), Admission::Admitted(_)));
    assert_eq!(playback.queue_position(), Some((1, 1)));

    assert_eq!(playback.play_direct("missing", &catalogue), None);
    assert_eq!(playback.current_song.as_deref(), Some("8"));
}

#[test]
fn test_song_queue_rejects_duplicates() {
    let mut queue = SongQueue::new();
    assert!(queue.push("1"));
    assert!(queue.push("2"));
    assert!(!queue.push("1"));
    assert_eq!(queue.position("2"), Some(2));
    assert!(queue.remove("1"));
    assert!(!queue.remove("1"));
    assert_eq!(queue.head(), Some("2"));

    let collected: SongQueue = ["a", "b", "a"].into_iter().collect();
    assert_eq!(collected.len(), 2);
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[test]
fn test_resolve_nested_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "rock/80s/42.webm", b"video");
    let catalogue = catalogue_at(dir.path());

    let first = catalogue.resolve("42").unwrap();
    assert_eq!(first.relative_path, Path::new("rock/80s/42.webm"));
    assert_eq!(first.size, 5);
    assert_eq!(catalogue.resolve("42"), Some(first));
}

#[test]
fn test_resolve_prefers_extension_order() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a/9.webm", b"video");
    write_file(dir.path(), "z/9.mp4", b"video");
    let catalogue = catalogue_at(dir.path());

    let resolved = catalogue.resolve("9").unwrap();
    assert_eq!(resolved.url_path(), "z/9.mp4");
}

#[test]
fn test_resolve_missing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "1.txt", b"not a video");

    assert_eq!(catalogue_at(dir.path()).resolve("1"), None);
    assert_eq!(catalogue_at(dir.path()).resolve(""), None);
    assert_eq!(catalogue_at(&dir.path().join("nope")).resolve("1"), None);
}

#[test]
fn test_resolve_sees_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let catalogue = catalogue_at(dir.path());
    assert_eq!(catalogue.resolve("11"), None);

    write_file(dir.path(), "11.mp4", b"video");
    assert!(catalogue.resolve("11").is_some());
}

#[tokio::test]
async fn test_resolve_async_matches_sync() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "3.mp4", b"video");
    let catalogue = catalogue_at(dir.path());

    assert_eq!(catalogue.resolve_async("3").await, catalogue.resolve("3"));
}

#[tokio::test]
async fn test_scan_first_basename_wins() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a/7.mp4", b"first");
    write_file(dir.path(), "b/7.webm", b"second");
    write_file(dir.path(), "8.mp4", b"");
    write_file(dir.path(), "UPPER.MP4", b"video");
    write_file(dir.path(), "notes.txt", b"ignored");

    let scan = catalogue_at(dir.path()).scan().await;

    assert_eq!(scan.len(), 2);
    assert!(scan.entries["7"].ends_with("a/7.mp4"));
    assert!(scan.contains("UPPER"));
    assert!(!scan.contains("8"));
    // One duplicate, one empty file
    assert_eq!(scan.error_count, 2);
}

#[tokio::test]
async fn test_scan_unplayable_first_copy_does_not_block_later_one() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a/5.mp4", b"");
    write_file(dir.path(), "b/5.mp4", b"video");

    let scan = catalogue_at(dir.path()).scan().await;

    assert!(scan.entries["5"].ends_with("b/5.mp4"));
    assert_eq!(scan.error_count, 1);
}

#[tokio::test]
async fn test_scan_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let scan = catalogue_at(&dir.path().join("missing")).scan().await;

    assert!(scan.is_empty());
    assert_eq!(scan.error_count, 0);
}

#[tokio::test]
async fn test_is_playable() {
    let dir = tempfile::tempdir().unwrap();
    let video = write_file(dir.path(), "1.mp4", b"video");
    let empty = write_file(dir.path(), "2.mp4", b"");

    assert!(is_playable(&video, &Probe::SizeOnly).await);
    assert!(!is_playable(&empty, &Probe::SizeOnly).await);
    assert!(!is_playable(&dir.path().join("3.mp4"), &Probe::SizeOnly).await);
    assert!(!is_playable(dir.path(), &Probe::SizeOnly).await);

    let missing_probe = Probe::ffprobe(
        dir.path().join("no-such-ffprobe"),
        Duration::from_secs(1),
    );
    assert!(is_playable(&video, &missing_probe).await);
    assert!(!is_playable(&empty, &missing_probe).await);
}

#[cfg(unix)]
fn write_probe_script(root: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = write_file(root, name, format!("#!/bin/sh\n{}\n", body).as_bytes());
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[tokio::test]
async fn test_is_playable_runs_probe() {
    let dir = tempfile::tempdir().unwrap();
    let video = write_file(dir.path(), "1.mp4", b"video");
    let timeout = Duration::from_millis(300);

    let slow = Probe::ffprobe(write_probe_script(dir.path(), "slow.sh", "sleep 5"), timeout);
    let started = std::time::Instant::now();
    assert!(!is_playable(&video, &slow).await);
    assert!(started.elapsed() < Duration::from_secs(3));

    let failing = Probe::ffprobe(write_probe_script(dir.path(), "fail.sh", "exit 1"), timeout);
    assert!(!is_playable(&video, &failing).await);

    let passing = Probe::ffprobe(write_probe_script(dir.path(), "ok.sh", "exit 0"), timeout);
    assert!(is_playable(&video, &passing).await);
}

#[cfg(unix)]
#[tokio::test]
async fn test_scan_counts_probe_failures() {
    let videos = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();
    write_file(videos.path(), "1.mp4", b"video");
    write_file(videos.path(), "2.webm", b"video");

    let failing = Probe::ffprobe(
        write_probe_script(tools.path(), "fail.sh", "exit 1"),
        Duration::from_secs(2),
    );
    let scan = Catalogue::new(videos.path(), failing).scan().await;

    assert!(scan.is_empty());
    assert_eq!(scan.error_count, 2);
}

#[test]
fn test_invalid_session_id_is_bad_request() {
    let response = JukeboxError::InvalidSessionId("nope".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_count_candidates() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "1.mp4", b"video");
    write_file(dir.path(), "sub/1.webm", b"video");
    write_file(dir.path(), "2.ogg", b"");
    write_file(dir.path(), "cover.png", b"image");

    assert_eq!(catalogue_at(dir.path()).count_candidates(), 2);
}

// ---------------------------------------------------------------------------
// Backgrounds
// ---------------------------------------------------------------------------

#[test]
fn test_list_themes_default_first() {
    let dir = tempfile::tempdir().unwrap();
    for theme in ["rock", "default", "alpha", ".hidden"] {
        fs::create_dir(dir.path().join(theme)).unwrap();
    }
    write_file(dir.path(), "loose.png", b"image");

    assert_eq!(list_themes(dir.path()), ["default", "alpha", "rock"]);
}

#[test]
fn test_list_themes_without_default() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("pop")).unwrap();

    assert_eq!(list_themes(dir.path()), ["pop"]);
}

#[test]
fn test_list_themes_fallbacks() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(list_themes(dir.path()), ["default"]);
    assert_eq!(list_themes(&dir.path().join("missing")), ["default"]);
}

#[test]
fn test_select_background_fallbacks() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "default/a.png", b"image");
    write_file(dir.path(), "rock/b.JPG", b"image");
    write_file(dir.path(), "rock/readme.txt", b"text");

    assert_eq!(select_background(dir.path(), "rock").unwrap(), "rock/b.JPG");
    assert_eq!(select_background(dir.path(), "metal").unwrap(), "default/a.png");
    assert_eq!(resolve_theme_dir(dir.path(), "metal").1, "default");
}

#[test]
fn test_select_background_root_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "c.gif", b"image");

    let (resolved, subfolder) = resolve_theme_dir(dir.path(), "metal");
    assert_eq!(resolved, dir.path());
    assert_eq!(subfolder, "");
    assert_eq!(select_background(dir.path(), "metal").unwrap(), "c.gif");
}

#[test]
fn test_select_background_not_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("default")).unwrap();

    assert!(matches!(
        select_background(dir.path(), "default"),
        Err(JukeboxError::NotFound(_))
    ));
    assert!(matches!(
        select_background(&dir.path().join("missing"), "default"),
        Err(JukeboxError::NotFound(_))
    ));
}

#[test]
fn test_select_background_is_random_among_images() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "default/1.png", b"image");
    write_file(dir.path(), "default/2.jpeg", b"image");

    for _ in 0..20 {
        let picked = select_background(dir.path(), "default").unwrap();
        assert!(picked == "default/1.png" || picked == "default/2.jpeg");
    }
}

// ---------------------------------------------------------------------------
// Playlist metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_playlist() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "playlist.json",
        br#"[{"filename": "1", "artist": "A", "title": "T", "part": "1"}]"#,
    );

    let items = load_playlist(&path).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].artist, "A");
}

#[tokio::test]
async fn test_load_playlist_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write_file(dir.path(), "broken.json", b"{ not json");

    assert!(load_playlist(&broken).await.is_empty());
    assert!(load_playlist(&dir.path().join("missing.json")).await.is_empty());
}

#[test]
fn test_filter_available_counts_errors() {
    let scan = CatalogueScan {
        entries: BTreeMap::from([("1".to_string(), PathBuf::from("/videos/1.mp4"))]),
        error_count: 2,
    };

    let available = filter_available(vec![item("1"), item("2"), item("3")], &scan);

    assert_eq!(available.items, vec![item("1")]);
    assert_eq!(available.error_count, 4);
}

#[test]
fn test_page_clamping() {
    let page = Page::clamp(None, None, 0);
    assert_eq!((page.page, page.page_size, page.total_pages), (1, 100, 1));

    let page = Page::clamp(Some("3"), Some("200"), 450);
    assert_eq!((page.page, page.page_size, page.total_pages), (3, 200, 3));
    assert_eq!(page.range(450), 400..450);

    let page = Page::clamp(Some("9"), Some("50"), 250);
    assert_eq!((page.page, page.page_size, page.total_pages), (3, 100, 3));

    let page = Page::clamp(Some("abc"), Some("xyz"), 10);
    assert_eq!((page.page, page.page_size), (1, 100));

    let page = Page::clamp(Some("0"), Some("500"), 10);
    assert_eq!((page.page, page.page_size), (1, 500));
}

#[test]
fn test_page_slice() {
    let items: Vec<usize> = (0..250).collect();
    let page = Page::clamp(Some("3"), None, items.len());

    assert_eq!(page.slice(&items), &items[200..250]);
}

// ---------------------------------------------------------------------------
// Sessions and validation
// ---------------------------------------------------------------------------

#[test]
fn test_session_id_validation() {
    let valid = SessionId::new("550e8400-e29b-41d4-a716-446655440000".to_string());
    assert!(valid.is_ok());

    assert!(SessionId::new("not-a-uuid".to_string()).is_err());
    assert!(SessionId::new("".to_string()).is_err());
    assert!(SessionId::new("550e8400".to_string()).is_err());
    assert!(SessionId::new(SessionId::generate().into_inner()).is_ok());
}

#[test]
fn test_song_and_folder_validation() {
    assert_eq!(validate_song_id("  12 ").unwrap(), "12");
    assert!(matches!(
        validate_song_id("   "),
        Err(JukeboxError::InvalidInput(_))
    ));
    assert_eq!(validate_folder_name(" rock").unwrap(), "rock");
    assert!(validate_folder_name("").is_err());
}

#[test]
fn test_session_store_lifecycle() {
    let store = MemorySessionStore::new();
    let id = SessionId::generate();
    assert!(store.get(&id).is_none());

    let mut playback = load_or_create(&store, &id);
    assert_eq!(playback, SessionPlaybackState::default());
    assert_eq!(playback.background_folder, "default");
    assert_eq!(store.len(), 1);

    playback.current_song = Some("1".to_string());
    store.set(&id, playback.clone());
    assert_eq!(load_or_create(&store, &id), playback);

    assert_eq!(store.purge_expired(Duration::from_secs(3600)), 0);
    assert_eq!(store.purge_expired(Duration::ZERO), 1);
    assert!(store.is_empty());
}

#[test]
fn test_get_session_id_from_cookie() {
    let id = "550e8400-e29b-41d4-a716-446655440000";
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("theme=dark; jukebox_session={}", id)).unwrap(),
    );
    assert_eq!(get_session_id(&headers).as_str(), id);

    let mut tampered = HeaderMap::new();
    tampered.insert(header::COOKIE, HeaderValue::from_static("jukebox_session=evil"));
    let minted = get_session_id(&tampered);
    assert_ne!(minted.as_str(), "evil");
    assert!(SessionId::new(minted.into_inner()).is_ok());

    assert!(SessionId::new(get_session_id(&HeaderMap::new()).into_inner()).is_ok());
}

#[test]
fn test_session_cookie_value() {
    let id = SessionId::generate();
    let cookie = SessionCookie::new(id.clone(), Duration::from_secs(60));
    let value = cookie.header_value();

    assert!(value.starts_with(&format!("jukebox_session={};", id)));
    assert!(value.contains("HttpOnly"));
    assert!(value.contains("Max-Age=60"));
}

// ---------------------------------------------------------------------------
// Asset helpers
// ---------------------------------------------------------------------------

#[test]
fn test_safe_join() {
    let root = Path::new("/srv/videos");
    assert_eq!(
        safe_join(root, "rock/1.mp4"),
        Some(PathBuf::from("/srv/videos/rock/1.mp4"))
    );
    assert_eq!(safe_join(root, "../etc/passwd"), None);
    assert_eq!(safe_join(root, "/etc/passwd"), None);
    assert_eq!(safe_join(root, ""), None);
}

#[test]
fn test_parse_range_header() {
    let with_range = |value: &'static str| {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static(value));
        headers
    };

    assert_eq!(parse_range_header(&HeaderMap::new(), 10), ByteRange::Full);
    assert_eq!(
        parse_range_header(&with_range("bytes=0-3"), 10),
        ByteRange::Partial(0, 3)
    );
    assert_eq!(
        parse_range_header(&with_range("bytes=4-"), 10),
        ByteRange::Partial(4, 9)
    );
    assert_eq!(
        parse_range_header(&with_range("bytes=5-100"), 10),
        ByteRange::Partial(5, 9)
    );
    assert_eq!(
        parse_range_header(&with_range("bytes=-3"), 10),
        ByteRange::Partial(7, 9)
    );
    assert_eq!(
        parse_range_header(&with_range("bytes=10-"), 10),
        ByteRange::Unsatisfiable
    );
    assert_eq!(
        parse_range_header(&with_range("items=0-3"), 10),
        ByteRange::Full
    );
}
