use utoipa::OpenApi;

use crate::api;
use song_catalog_types::{Song, SongDetail};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::songs::songs_list,
        api::songs::song_text,
        api::songs::song_create,
        api::songs::song_update,
        api::songs::song_delete,
        api::health::health,
    ),
    components(
        schemas(
            Song,
            SongDetail,
            api::health::HealthResponse,
        )
    ),
    tags(
        (name = "song-catalog-server", description = "Song catalog API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in ["/songs", "/songs/{id}", "/songs/{id}/text", "/health"] {
            assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
        }
        let songs = &doc.paths.paths["/songs"];
        assert!(songs.get.is_some());
        assert!(songs.post.is_some());
        let by_id = &doc.paths.paths["/songs/{id}"];
        assert!(by_id.put.is_some());
        assert!(by_id.delete.is_some());
    }
}
