//! Route handlers.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::path::ErrorKind as PathErrorKind;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::render::RenderedImage;
use crate::request::{InlineParams, RawParams};

const DEFAULT_FORMAT: &str = "png";

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

#[derive(Debug, Deserialize)]
pub struct PagePath {
    domain: String,
    title: String,
    revid: String,
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatPagePath {
    domain: String,
    format: String,
    title: String,
    revid: String,
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct InlinePath {
    domain: String,
    format: String,
    title: Option<String>,
    revid: Option<String>,
}

/// `GET /{domain}/{title}/{revid}/{id}`: the extension declares the format.
pub async fn graph_by_page(
    State(state): State<AppState>,
    path: Result<Path<PagePath>, PathRejection>,
    Query(extra): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> PipelineResult<RenderedImage> {
    match path {
        Ok(Path(path)) => page_request(&state, path, extra, &headers).await,
        Err(rejection) => state.pipeline.reject(path_error(rejection), request_id(&headers)),
    }
}

/// `GET /{domain}/v2/{revid}/{id}`: the page route for a page titled `v2`,
/// which shares its shape with the inline render route.
pub async fn graph_by_v2_page(
    State(state): State<AppState>,
    path: Result<Path<InlinePath>, PathRejection>,
    Query(extra): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> PipelineResult<RenderedImage> {
    match path {
        Ok(Path(path)) => {
            let page = PagePath {
                domain: path.domain,
                title: "v2".to_string(),
                revid: path.format,
                id: path.title.unwrap_or_default(),
            };
            page_request(&state, page, extra, &headers).await
        }
        Err(rejection) => state.pipeline.reject(path_error(rejection), request_id(&headers)),
    }
}

async fn page_request(
    state: &AppState,
    path: PagePath,
    extra: BTreeMap<String, String>,
    headers: &HeaderMap,
) -> PipelineResult<RenderedImage> {
    let format = path
        .id
        .split_once('.')
        .map_or(DEFAULT_FORMAT, |(_, ext)| ext)
        .to_string();

    let raw = RawParams {
        domain: path.domain,
        format,
        title: Some(path.title),
        revision: Some(path.revid),
        id: path.id,
        extra,
    };
    state.pipeline.handle(raw, request_id(headers)).await
}

/// `GET /{domain}/v1/{format}/{title}/{revid}/{id}`.
pub async fn graph_by_page_with_format(
    State(state): State<AppState>,
    path: Result<Path<FormatPagePath>, PathRejection>,
    Query(extra): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> PipelineResult<RenderedImage> {
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => return state.pipeline.reject(path_error(rejection), request_id(&headers)),
    };

    let raw = RawParams {
        domain: path.domain,
        format: path.format,
        title: Some(path.title),
        revision: Some(path.revid),
        id: path.id,
        extra,
    };
    state.pipeline.handle(raw, request_id(&headers)).await
}

/// `POST /{domain}/v2/{format}[/{title}[/{revid}]]` with the spec as body.
pub async fn graph_from_body(
    State(state): State<AppState>,
    path: Result<Path<InlinePath>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> PipelineResult<RenderedImage> {
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => return state.pipeline.reject(path_error(rejection), request_id(&headers)),
    };

    let raw = InlineParams {
        domain: path.domain,
        format: path.format,
        title: path.title,
        revision: path.revid,
    };
    state
        .pipeline
        .handle_inline(raw, &body, request_id(&headers))
        .await
}

/// Classify a path that could not be decoded by the segment it failed on.
fn path_error(rejection: PathRejection) -> PipelineError {
    let key = match &rejection {
        PathRejection::FailedToDeserializePathParams(inner) => match inner.kind() {
            PathErrorKind::InvalidUtf8InPathParam { key }
            | PathErrorKind::ParseErrorAtKey { key, .. }
            | PathErrorKind::DeserializeError { key, .. } => Some(key.clone()),
            _ => None,
        },
        _ => None,
    };

    let detail = rejection.body_text();
    match key.as_deref() {
        Some("domain") => PipelineError::InvalidDomain(detail),
        Some("format") => PipelineError::InvalidFormat(detail),
        Some("revid") => PipelineError::InvalidRevision(detail),
        Some("id") => PipelineError::InvalidSpecId(detail),
        _ => PipelineError::InvalidTitle(detail),
    }
}

pub async fn robots_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], ROBOTS_TXT)
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub renderer: &'static str,
    pub status: &'static str,
}

/// `GET /_info`.
pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: "Renders graph specs stored on wiki pages into images",
        renderer: state.pipeline.renderer_name(),
        status: "ok",
    })
}
