/// Stored PDF serving (`/uploads/{hash}.pdf`)
use crate::{
    context::AppContext,
    error::{RegistryError, RegistryResult},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Keys are content hashes, so a stored PDF never changes under its URL
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Build blob routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/uploads/:file", get(get_blob))
}

/// Serve a stored PDF
///
/// Supports conditional requests (If-None-Match) and single byte ranges.
async fn get_blob(
    State(ctx): State<AppContext>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> RegistryResult<Response> {
    let key = file
        .strip_suffix(".pdf")
        .ok_or_else(|| RegistryError::NotFound(format!("File not found: {}", file)))?;

    let data = ctx
        .store
        .get_blob(key)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("File not found: {}", file)))?;
    let total_size = data.len();

    let etag = format!("\"{}\"", key);
    let etag_value = HeaderValue::from_str(&etag)
        .map_err(|e| RegistryError::Internal(format!("Invalid ETag for {}: {}", key, e)))?;

    // Check If-None-Match header for 304 Not Modified
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"))
        .unwrap_or(false);
    if not_modified {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, etag_value),
                (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
            ],
        )
            .into_response());
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, total_size));

    if let Some((start, end)) = range {
        let partial_data = data[start..=end].to_vec();
        let content_range = format!("bytes {}-{}/{}", start, end, total_size);

        let mut response = Response::new(Body::from(partial_data));
        *response.status_mut() = StatusCode::PARTIAL_CONTENT;
        let response_headers = response.headers_mut();
        insert_common_headers(response_headers, etag_value);
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            response_headers.insert(header::CONTENT_RANGE, value);
        }
        return Ok(response);
    }

    let mut response = Response::new(Body::from(data));
    insert_common_headers(response.headers_mut(), etag_value);
    Ok(response)
}

fn insert_common_headers(headers: &mut HeaderMap, etag: HeaderValue) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::ETAG, etag);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
}

/// Parse HTTP Range header
///
/// Returns (start, end) inclusive byte positions, or None if invalid
fn parse_range(range_header: &str, total_size: usize) -> Option<(usize, usize)> {
    // Expected format: "bytes=start-end" or "bytes=start-" or "bytes=-suffix"
    let range_spec = range_header.trim().strip_prefix("bytes=")?;
    if total_size == 0 {
        return None;
    }

    let (start_str, end_str) = range_spec.split_once('-')?;

    if start_str.is_empty() {
        // Suffix range: "bytes=-500" (last 500 bytes)
        let suffix = end_str.parse::<usize>().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some((total_size.saturating_sub(suffix), total_size - 1));
    }

    let start = start_str.parse::<usize>().ok()?;
    if start >= total_size {
        return None;
    }

    if end_str.is_empty() {
        // Open-ended range: "bytes=500-"
        return Some((start, total_size - 1));
    }

    let end = end_str.parse::<usize>().ok()?.min(total_size - 1);
    (start <= end).then_some((start, end))
}
