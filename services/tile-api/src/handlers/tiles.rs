//! `GET /tiles/:z/:x/:y`

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use tile_common::{parse_zoom, FractionalZoomPolicy, RawRenderParams, TileCoord, TileError, TileResult, MAX_ZOOM_LEVEL};

use super::common::{error_response, etag_matches, http_date};
use crate::engine::TileResponse;
use crate::state::AppState;

const TILE_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-tile-source");

/// Serve one map tile.
///
/// A well-formed coordinate always gets a 200 PNG; when nothing can be
/// drawn that PNG is fully transparent. Only malformed coordinates get an
/// error status.
#[instrument(skip(state, params, headers))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(String, String, String)>,
    Query(params): Query<RawRenderParams>,
    headers: HeaderMap,
) -> Response {
    let coord = match parse_coord(&z, &x, &y, state.config.fractional_zoom) {
        Ok(coord) => coord,
        Err(e) => {
            info!(error = %e, "Rejected tile request");
            let status = StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::BAD_REQUEST);
            return error_response(status, e.to_string());
        }
    };

    let tile = state.engine.get_tile(coord, &params).await;
    tile_response(tile, &headers, state.config.cache_ttl)
}

/// Parse `z`, `x` and `y` path segments. `y` may carry a `.png` suffix.
///
/// Zooms beyond what a tile matrix can address are passed through
/// unvalidated; the engine turns them away by zoom limit.
pub fn parse_coord(z: &str, x: &str, y: &str, policy: FractionalZoomPolicy) -> TileResult<TileCoord> {
    let parsed = parse_zoom(z, policy)?;
    if let Some(requested) = parsed.rounded_from {
        info!(requested, zoom = parsed.zoom, "Rounded fractional zoom");
    }

    let y = y.strip_suffix(".png").unwrap_or(y);
    let coord = TileCoord::new(parsed.zoom, parse_index("x", x)?, parse_index("y", y)?);

    if coord.z <= MAX_ZOOM_LEVEL {
        coord.validate()?;
    }
    Ok(coord)
}

fn parse_index(axis: &str, raw: &str) -> TileResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| TileError::InvalidTile(format!("{} '{}' is not a tile index", axis, raw)))
}

fn tile_response(tile: TileResponse, request_headers: &HeaderMap, ttl: Duration) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(TILE_SOURCE_HEADER, HeaderValue::from_static(tile.outcome.source()));

    let Some(etag) = tile.etag() else {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        return (StatusCode::OK, headers, tile.body).into_response();
    };

    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(created_at) = tile.outcome.created_at() {
        if let Ok(value) = HeaderValue::from_str(&http_date(created_at)) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    let not_modified = request_headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|value| etag_matches(value, &etag));
    if not_modified {
        headers.remove(header::CONTENT_TYPE);
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }

    (StatusCode::OK, headers, tile.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coord() {
        let coord = parse_coord("6", "19", "40.png", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(coord, TileCoord::new(6, 19, 40));
        let coord = parse_coord("6", "19", "40", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(coord, TileCoord::new(6, 19, 40));
    }

    #[test]
    fn test_parse_coord_fractional_zoom() {
        let coord = parse_coord("2.6", "1", "2", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(coord.z, 3);
        assert!(parse_coord("2.6", "1", "2", FractionalZoomPolicy::Reject).is_err());
    }

    #[test]
    fn test_parse_coord_rejects_malformed() {
        assert!(parse_coord("a", "0", "0", FractionalZoomPolicy::Round).is_err());
        assert!(parse_coord("3", "-1", "0", FractionalZoomPolicy::Round).is_err());
        assert!(parse_coord("3", "0", "abc.png", FractionalZoomPolicy::Round).is_err());
        // Outside the 8x8 matrix at z=3
        assert!(parse_coord("3", "8", "0", FractionalZoomPolicy::Round).is_err());
    }

    #[test]
    fn test_parse_coord_huge_zoom_passes_through() {
        let coord = parse_coord("40", "0", "0", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(coord.z, 40);
    }
}
