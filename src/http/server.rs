//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, cache headers)
//! - Bind the server to a listener and stop on shutdown

use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Request};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::request::{request_id, request_id_header, UuidRequestId};
use crate::http::response::cache_control;
use crate::pipeline::Pipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// HTTP front end of the graph service.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `pipeline`.
    pub fn new(config: AppConfig, pipeline: Arc<Pipeline>) -> Self {
        let router = Self::build_router(&config, AppState { pipeline });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let graphs = Router::new()
            .route("/{domain}/{title}/{revid}/{id}", get(handlers::graph_by_page))
            .route(
                "/{domain}/v1/{format}/{title}/{revid}/{id}",
                get(handlers::graph_by_page_with_format),
            )
            .route("/{domain}/v2/{format}", post(handlers::graph_from_body))
            .route(
                "/{domain}/v2/{format}/{title}",
                post(handlers::graph_from_body).get(handlers::graph_by_v2_page),
            )
            .route("/{domain}/v2/{format}/{title}/{revid}", post(handlers::graph_from_body))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                cache_control(config.pipeline.cache_max_age_secs),
            ));

        Router::new()
            .route("/robots.txt", get(handlers::robots_txt))
            .route("/_info", get(handlers::info))
            .merge(graphs)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id(req.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(request_id_header(), UuidRequestId))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            domains = ?self.config.upstream.domains,
            timeout_ms = self.config.pipeline.timeout_ms,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
