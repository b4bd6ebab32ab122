//! Request validation subsystem.
//!
//! # Data Flow
//! ```text
//! Routed path + query (RawParams / InlineParams)
//!     → validator.rs (format, extension, revision, title, id)
//!     → domain resolver (allow-list, canonical form, alias)
//!     → RequestDescriptor / InlineRequest (immutable, per request)
//! ```

pub mod descriptor;
pub mod validator;

pub use descriptor::{
    InlineParams, InlineRequest, OutputFormat, PageSelector, RawParams, RequestDescriptor,
};
pub use validator::RequestValidator;
