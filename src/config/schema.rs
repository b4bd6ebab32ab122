//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the graph render proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Content API settings: allowed domains, aliases, protocol.
    pub upstream: UpstreamConfig,

    /// Request pipeline settings (deadline, formats, caching).
    pub pipeline: PipelineConfig,

    /// External renderer commands.
    pub renderer: RendererConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request size limits.
    pub limits: LimitsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:11042").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:11042".to_string(),
        }
    }
}

/// Upstream content API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base domains that may be queried (e.g., "wikipedia.org").
    pub domains: Vec<String>,

    /// Old domain -> new domain rewrites, applied after canonicalization.
    pub domain_map: BTreeMap<String, String>,

    /// Protocol used for upstream calls and render base URLs.
    pub default_protocol: String,

    /// Path of the content API endpoint on every domain.
    pub api_path: String,

    /// User-Agent header sent upstream.
    pub user_agent: String,

    /// Maximum number of upstream calls per spec lookup.
    pub max_continuations: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            domain_map: BTreeMap::new(),
            default_protocol: "https".to_string(),
            api_path: "/w/api.php".to_string(),
            user_agent: concat!("graph-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            max_continuations: 250,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for a whole request in milliseconds. Zero or negative disables it.
    pub timeout_ms: i64,

    /// Output formats served over HTTP ("png", "svg").
    pub formats: Vec<String>,

    /// Cache lifetime advertised on every response, in seconds.
    pub cache_max_age_secs: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            formats: vec!["png".to_string(), "svg".to_string()],
            // Short on purpose so spec corrections propagate quickly.
            cache_max_age_secs: 30,
        }
    }
}

/// External renderer configuration.
///
/// Each command is an argv list. The spec is written to the child's stdin and
/// the image is read from its stdout. The placeholder `{base_url}` is replaced
/// with the per-request base URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Command producing PNG output.
    pub png_command: Vec<String>,

    /// Command producing SVG output.
    pub svg_command: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            png_command: vec!["vg2png".to_string(), "-b".to_string(), "{base_url}".to_string()],
            svg_command: vec!["vg2svg".to_string(), "-b".to_string(), "{base_url}".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes for posted specs.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}
