//! Actix server startup + app wiring.
//!
//! Builds the shared state, routes, middleware, and OpenAPI endpoints.

use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::{App, Error, HttpServer, web};
use anyhow::Result;
use futures_util::future::{LocalBoxFuture, Ready, ok};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config::{Overrides, ServerConfig};
use crate::metadata_client::MetadataClient;
use crate::openapi;
use crate::song_db::{DbOptions, SongDb};
use crate::state::AppState;

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let settings = cfg.resolve(Overrides {
        bind: args.bind,
        port: args.port,
        db_path: args.db_path,
        api_base_url: args.api_base_url,
    })?;
    tracing::info!(
        version = api::health::VERSION,
        bind = %settings.bind,
        db_path = %settings.db_path.display(),
        api_base_url = %settings.api_base_url,
        "starting song-catalog-server"
    );

    let db = SongDb::open(
        &settings.db_path,
        DbOptions {
            timeout: settings.db_timeout,
            pool_size: settings.db_pool_size,
        },
    )?;
    let metadata = MetadataClient::new(&settings.api_base_url, settings.metadata_timeout)?;
    let state = web::Data::new(AppState::new(db, Arc::new(metadata), settings.db_timeout));
    let cors_origins = settings.cors_origins.clone();

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .configure(api::configure)
    })
    .bind(settings.bind)?
    .run()
    .await?;

    Ok(())
}

/// Load the TOML config when one was given; otherwise use an empty config.
fn load_config(path: Option<&PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path),
        None => Ok(ServerConfig::default()),
    }
}

/// Path prefixes left out of the request log: the health probe and the
/// Swagger UI / OpenAPI document served alongside the song routes.
const UNLOGGED_PREFIXES: [&str; 3] = ["/health", "/swagger-ui", "/api-doc"];

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    !UNLOGGED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Actix middleware that logs requests, skipping docs and health checks.
struct FilteredLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("-")
            .to_string();
        let ua = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    user_agent = %ua,
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, test, web};

    use super::*;

    #[::core::prelude::v1::test]
    fn docs_and_health_are_not_logged() {
        assert!(!should_log_path("/health"));
        assert!(!should_log_path("/swagger-ui/index.html"));
        assert!(!should_log_path("/api-doc/openapi.json"));
        assert!(should_log_path("/songs"));
        assert!(should_log_path("/songs/1/text"));
    }

    #[::core::prelude::v1::test]
    fn missing_config_path_yields_defaults() {
        let cfg = load_config(None).expect("default config");
        assert!(cfg.bind.is_none());
        assert!(cfg.db_path.is_none());
    }

    #[::core::prelude::v1::test]
    fn unreadable_config_path_is_an_error() {
        let path = PathBuf::from("/nonexistent/song-catalog/config.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[actix_web::test]
    async fn logger_passes_responses_through() {
        let app = test::init_service(
            App::new()
                .wrap(FilteredLogger)
                .route("/songs", web::get().to(|| async { HttpResponse::Accepted().finish() })),
        )
        .await;
        let req = test::TestRequest::get().uri("/songs").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::ACCEPTED);
    }
}
