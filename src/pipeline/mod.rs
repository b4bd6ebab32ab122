//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! RawParams (GET)                      InlineParams + body (POST)
//!     → RequestValidator::validate         → RequestValidator::validate_inline
//!     → SpecFetcher::fetch (paginated)     │
//!     → ──────────────┬────────────────────┘
//!                     → RenderContext::sanitize_spec
//!                     → Renderer::render
//!                     → RenderedImage
//! The whole chain runs inside resilience::with_deadline.
//! ```
//!
//! # Design Decisions
//! - Stages short-circuit on the first error
//! - All errors belong to one closed enum; the client only sees its kind
//! - The orchestrator logs each outcome exactly once

pub mod error;
pub mod orchestrator;

pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use orchestrator::{Pipeline, SetupError};
