use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

const CHUNK_SIZE: usize = 128 * 1024;

/// Joins a request path under `root`, refusing anything that could step
/// outside it.
pub fn safe_join(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    let mut pushed = false;

    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    pushed.then_some(path)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Outcome of reading the `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable header, serve the whole file
    Full,
    /// Inclusive byte offsets
    Partial(u64, u64),
    Unsatisfiable,
}

/// Parses a single `bytes=start-end` or `bytes=-suffix` range. Headers that
/// cannot be parsed fall back to the full file.
pub fn parse_range_header(headers: &HeaderMap, file_size: u64) -> ByteRange {
    let Some(range_str) = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
    else {
        return ByteRange::Full;
    };

    let Some((start_str, end_str)) = range_str.trim().split_once('-') else {
        return ByteRange::Full;
    };

    if file_size == 0 {
        return ByteRange::Unsatisfiable;
    }

    if start_str.is_empty() {
        // Suffix form: the last N bytes
        return match end_str.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(suffix) => ByteRange::Partial(file_size.saturating_sub(suffix), file_size - 1),
            Err(_) => ByteRange::Full,
        };
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= file_size {
        return ByteRange::Unsatisfiable;
    }

    let end = if end_str.is_empty() {
        file_size - 1
    } else {
        match end_str.parse::<u64>() {
            Ok(end) if end >= start => end.min(file_size - 1),
            Ok(_) => return ByteRange::Unsatisfiable,
            Err(_) => return ByteRange::Full,
        }
    };

    ByteRange::Partial(start, end)
}

/// Streams a file under `root`, honouring byte ranges so the browser can
/// seek inside videos. Missing files and escaping paths are a 404.
pub async fn serve_file(
    root: &Path,
    requested: &str,
    headers: &HeaderMap,
) -> Result<Response, StatusCode> {
    let file_path = safe_join(root, requested).ok_or(StatusCode::NOT_FOUND)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    if !metadata.is_file() {
        return Err(StatusCode::NOT_FOUND);
    }
    let file_size = metadata.len();
    let content_type = content_type_for(&file_path);

    let mut file = File::open(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    match parse_range_header(headers, file_size) {
        ByteRange::Partial(start, end) => {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            let length = end - start + 1;
            let stream = ReaderStream::with_capacity(file.take(length), CHUNK_SIZE);

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::CONTENT_LENGTH, length.to_string())
                .body(Body::from_stream(stream))
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
        ByteRange::Unsatisfiable => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", file_size))],
        )
            .into_response()),
        ByteRange::Full => {
            let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, file_size.to_string())
                .body(Body::from_stream(stream))
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
