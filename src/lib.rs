//! Graph render proxy library.
//!
//! Fetches graph specs stored in wiki page properties through the content
//! API and renders them to PNG or SVG with an external renderer.

pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod resilience;
pub mod upstream;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{ErrorKind, Pipeline, PipelineError};
