//! Domain resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Requested host ("en.m.wikipedia.org")
//!     → resolver.rs (allow-list pattern, marker removal)
//!     → alias table (static rewrite)
//!     → ResolvedDomain { requested, domain }
//!
//! Compilation (at startup):
//!     upstream.domains ∪ upstream.domain_map keys
//!     → escaped alternation
//!     → frozen Regex shared by all requests
//! ```

pub mod resolver;

pub use resolver::{DomainAliasTable, DomainResolver, ResolvedDomain};
