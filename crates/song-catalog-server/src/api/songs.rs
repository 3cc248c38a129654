//! Song catalog API handlers.

use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use serde::Deserialize;
use song_catalog_types::Song;
use utoipa::IntoParams;

use crate::song_db::{FilterField, SongFilter};
use crate::state::AppState;
use crate::verses::verse_page;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIST_LIMIT: u32 = 10;
const DEFAULT_VERSE_LIMIT: u32 = 5;

/// Handler-level failure mapped to a status code and a short body.
///
/// Causes are logged where the error is produced; bodies never carry them.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    NotFound(&'static str),
    Internal(&'static str),
}

impl ApiError {
    pub fn into_response(self) -> HttpResponse {
        match self {
            ApiError::BadRequest(message) => HttpResponse::BadRequest().body(message),
            ApiError::NotFound(message) => HttpResponse::NotFound().body(message),
            ApiError::Internal(message) => HttpResponse::InternalServerError().body(message),
        }
    }
}

/// Parse a `page`/`limit` query value. Missing, unparsable, or values
/// below 1 fall back to `default`.
pub fn page_param(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

/// Query parameters for song listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SongListQuery {
    /// Exact group name.
    pub group: Option<String>,
    /// Exact song title.
    pub song: Option<String>,
    /// Exact release date.
    pub release_date: Option<String>,
    /// Exact link.
    pub link: Option<String>,
    /// Page number (default 1).
    #[param(value_type = Option<u32>)]
    pub page: Option<String>,
    /// Items per page (default 10).
    #[param(value_type = Option<u32>)]
    pub limit: Option<String>,
}

impl SongListQuery {
    fn filter(&self) -> SongFilter {
        [
            (FilterField::Group, &self.group),
            (FilterField::Song, &self.song),
            (FilterField::ReleaseDate, &self.release_date),
            (FilterField::Link, &self.link),
        ]
        .into_iter()
        .fold(SongFilter::new(), |filter, (field, value)| match value {
            Some(value) => filter.with(field, value.as_str()),
            None => filter,
        })
    }
}

/// Query parameters for verse pagination.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerseQuery {
    /// Page number (default 1).
    #[param(value_type = Option<u32>)]
    pub page: Option<String>,
    /// Verses per page (default 5).
    #[param(value_type = Option<u32>)]
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/songs",
    params(SongListQuery),
    responses(
        (status = 200, description = "Matching songs", body = [Song]),
        (status = 500, description = "Internal server error")
    )
)]
#[get("/songs")]
/// List songs with exact-match filters and pagination.
pub async fn songs_list(
    state: web::Data<AppState>,
    query: web::Query<SongListQuery>,
) -> impl Responder {
    let filter = query.filter();
    let page = page_param(query.page.as_deref(), DEFAULT_PAGE);
    let limit = page_param(query.limit.as_deref(), DEFAULT_LIST_LIMIT);
    match state
        .with_db(move |db| db.list_songs(&filter, page, limit))
        .await
    {
        Ok(songs) => HttpResponse::Ok().json(songs),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), page, limit, "list songs failed");
            ApiError::Internal("Internal server error").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/songs/{id}/text",
    params(
        ("id" = i64, Path, description = "Song id"),
        VerseQuery
    ),
    responses(
        (status = 200, description = "Verses on the requested page", body = [String]),
        (status = 404, description = "Song not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[get("/songs/{id}/text")]
/// Song lyrics paginated by verse.
pub async fn song_text(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<VerseQuery>,
) -> impl Responder {
    let id = path.into_inner();
    let song = match state.with_db(move |db| db.song_by_id(id)).await {
        Ok(Some(song)) => song,
        Ok(None) => return ApiError::NotFound("Song not found").into_response(),
        Err(err) => {
            tracing::error!(song_id = id, error = %format!("{err:#}"), "load song failed");
            return ApiError::Internal("Internal server error").into_response();
        }
    };
    let page = page_param(query.page.as_deref(), DEFAULT_PAGE);
    let limit = page_param(query.limit.as_deref(), DEFAULT_VERSE_LIMIT);
    HttpResponse::Ok().json(verse_page(&song.text, page, limit))
}

#[utoipa::path(
    delete,
    path = "/songs/{id}",
    params(("id" = i64, Path, description = "Song id")),
    responses(
        (status = 204, description = "Song deleted (or did not exist)"),
        (status = 500, description = "Internal server error")
    )
)]
#[delete("/songs/{id}")]
/// Delete a song by id.
pub async fn song_delete(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let id = path.into_inner();
    match state.with_db(move |db| db.delete_song(id)).await {
        Ok(existed) => {
            if !existed {
                tracing::debug!(song_id = id, "delete matched no song");
            }
            HttpResponse::NoContent().finish()
        }
        Err(err) => {
            tracing::error!(song_id = id, error = %format!("{err:#}"), "delete song failed");
            ApiError::Internal("Internal server error").into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/songs/{id}",
    params(("id" = i64, Path, description = "Song id")),
    request_body = Song,
    responses(
        (status = 200, description = "Submitted song payload", body = Song),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Internal server error")
    )
)]
#[put("/songs/{id}")]
/// Update a song's group and title. Other fields in the body are ignored.
pub async fn song_update(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<Song>,
) -> impl Responder {
    let id = path.into_inner();
    let song = body.into_inner();
    let update = song.clone();
    match state.with_db(move |db| db.update_song(id, &update)).await {
        Ok(existed) => {
            if !existed {
                tracing::debug!(song_id = id, "update matched no song");
            }
            HttpResponse::Ok().json(song)
        }
        Err(err) => {
            tracing::error!(song_id = id, error = %format!("{err:#}"), "update song failed");
            ApiError::Internal("Internal server error").into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/songs",
    request_body = Song,
    responses(
        (status = 201, description = "Created song with provider details", body = Song),
        (status = 400, description = "Invalid request body"),
        (status = 500, description = "Metadata lookup or store failure")
    )
)]
#[post("/songs")]
/// Create a song, filling release date, lyrics, and link from the metadata provider.
pub async fn song_create(state: web::Data<AppState>, body: web::Json<Song>) -> impl Responder {
    let mut song = body.into_inner();
    let detail = match state.metadata.fetch_details(&song.group, &song.song).await {
        Ok(detail) => detail,
        Err(err) => {
            tracing::error!(
                group = %song.group,
                song = %song.song,
                error = %format!("{err:#}"),
                "fetch song details failed"
            );
            return ApiError::Internal("Failed to fetch song details").into_response();
        }
    };
    song.apply_detail(detail);

    match state.with_db(move |db| db.create_song(&song)).await {
        Ok(created) => {
            tracing::info!(song_id = created.id, group = %created.group, song = %created.song, "song created");
            HttpResponse::Created().json(created)
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "create song failed");
            ApiError::Internal("Internal server error").into_response()
        }
    }
}
