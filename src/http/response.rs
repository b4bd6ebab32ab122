//! Response mapping.
//!
//! # Responsibilities
//! - Turn a rendered image into a `200` with the right content type
//! - Turn any pipeline failure into a `400` whose JSON body is the error kind
//!
//! # Design Decisions
//! - Failure detail stays in logs; clients get only the stable kind string
//! - Cache-Control is applied by a layer on the graph routes, so success and
//!   failure carry the same header

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::pipeline::PipelineError;
use crate::render::RenderedImage;

impl IntoResponse for RenderedImage {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type()))],
            self.bytes,
        )
            .into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self.kind())).into_response()
    }
}

/// `public, s-maxage=N, max-age=N`.
pub fn cache_control(max_age_secs: u32) -> HeaderValue {
    HeaderValue::from_str(&format!("public, s-maxage={max_age_secs}, max-age={max_age_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("public, s-maxage=30, max-age=30"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ImageFormat;

    #[tokio::test]
    async fn test_image_response() {
        let image = RenderedImage {
            format: ImageFormat::Svg,
            bytes: b"<svg/>".to_vec(),
        };
        let response = image.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<svg/>");
    }

    #[tokio::test]
    async fn test_error_response_is_kind_only() {
        let response = PipelineError::InvalidTitle("A|B".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#""InvalidTitle""#);
    }

    #[test]
    fn test_cache_control() {
        assert_eq!(cache_control(30), "public, s-maxage=30, max-age=30");
    }
}
