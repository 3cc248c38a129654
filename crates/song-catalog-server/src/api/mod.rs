//! HTTP API handlers.
//!
//! Defines the Actix routes for the song catalog and health checks.

pub mod health;
pub mod songs;

use actix_web::error::InternalError;
use actix_web::web;

pub use songs::{song_create, song_delete, song_text, song_update, songs_list};

use songs::ApiError;

/// JSON body settings: malformed or non-JSON bodies become a plain 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        tracing::debug!(path = %req.path(), error = %err, "rejected request body");
        InternalError::from_response(
            err,
            ApiError::BadRequest("Invalid request body").into_response(),
        )
        .into()
    })
}

/// Register every route plus the JSON body settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health::health)
        .service(songs_list)
        .service(song_text)
        .service(song_create)
        .service(song_update)
        .service(song_delete);
}
