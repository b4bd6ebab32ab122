//! Content API subsystem.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → query.rs (initial ApiQuery: pageprops/graph_specs + revids|titles)
//!     → fetcher.rs loop:
//!         client.rs GET {protocol}://{domain}{api_path}?{query}
//!         → status / error / warnings checks
//!         → scan query.pages[*].pageprops.graph_specs for the spec id
//!         → not found + continue → merge continuation, next call
//!     → FetchedSpec { spec, calls }
//! ```
//!
//! # Design Decisions
//! - The transport sits behind `ApiClient` so tests script upstream answers
//! - Only the located spec survives a page scan; the rest is dropped

pub mod client;
pub mod fetcher;
pub mod query;

pub use client::{ApiClient, ApiResponse, ReqwestApiClient};
pub use fetcher::{FetchedSpec, SpecFetcher};
pub use query::ApiQuery;

/// Content API endpoint for a canonical domain.
pub fn api_url(protocol: &str, domain: &str, api_path: &str) -> String {
    format!("{protocol}://{domain}{api_path}")
}
