//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! Spec (serde_json::Value) + RenderContext (domain, protocol, aliases)
//!     → context.rs (rewrite/deny data URLs inside the spec)
//!     → Renderer::render (external engine)
//!     → RenderedImage { format, bytes }
//! ```
//!
//! # Design Decisions
//! - The render context is an explicit argument of every call; nothing about
//!   the requesting domain is stored in shared state
//! - Output is fully buffered so the deadline covers the whole render

pub mod command;
pub mod context;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use command::CommandRenderer;
pub use context::RenderContext;

/// Concrete image formats a renderer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }

    /// MIME type for HTTP responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl RenderedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Errors reported by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No command configured for the format.
    #[error("no renderer command configured for {0}")]
    NoCommand(ImageFormat),

    /// The renderer process could not be started.
    #[error("failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Talking to the renderer failed.
    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The renderer succeeded but produced nothing.
    #[error("renderer produced no output")]
    EmptyOutput,

    /// The spec was rejected before or during rendering.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
}

/// An engine turning a visualization spec into image bytes.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `spec` in `format`, resolving relative resources against `context`.
    async fn render(
        &self,
        spec: &Value,
        context: &RenderContext,
        format: ImageFormat,
    ) -> Result<Vec<u8>, RenderError>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}
