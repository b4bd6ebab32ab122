//! Per-request render context.
//!
//! # Responsibilities
//! - Carry the resolved domain and protocol into the render call
//! - Resolve relative resource URLs against the requesting wiki
//! - Deny non-HTTP(S) URLs and apply domain aliases to the rest

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::domain::DomainAliasTable;

/// Domain and protocol used to resolve resources referenced by a spec.
#[derive(Debug, Clone)]
pub struct RenderContext {
    domain: String,
    protocol: String,
    aliases: Arc<DomainAliasTable>,
}

impl RenderContext {
    pub fn new(domain: impl Into<String>, protocol: impl Into<String>, aliases: Arc<DomainAliasTable>) -> Self {
        Self {
            domain: domain.into(),
            protocol: protocol.into(),
            aliases,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Base URL for relative references, e.g. `https://en.wikipedia.org/`.
    pub fn base_url(&self) -> String {
        format!("{}://{}/", self.protocol, self.domain)
    }

    /// Normalize a resource URL, or `None` if it must not be loaded.
    pub fn sanitize_url(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let parsed = if let Some(rest) = raw.strip_prefix("//") {
            Url::parse(&format!("{}://{}", self.protocol, rest))
        } else {
            match Url::parse(raw) {
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    Url::parse(&self.base_url()).and_then(|base| base.join(raw))
                }
                other => other,
            }
        };
        let mut url = parsed.ok()?;

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_string();

        if let Some(target) = self.aliases.get(&host) {
            let (target_host, target_port) = match target.split_once(':') {
                Some((h, p)) => (h, p.parse::<u16>().ok()),
                None => (target, None),
            };
            url.set_host(Some(target_host)).ok()?;
            url.set_port(target_port).ok()?;
        }

        Some(url.to_string())
    }

    /// Sanitize every `url` entry inside a spec in place.
    ///
    /// Denied URLs are replaced with `null`. Returns the number of URLs that
    /// were denied.
    pub fn sanitize_spec(&self, spec: &mut Value) -> usize {
        let mut denied = 0;
        self.walk(spec, &mut denied);
        denied
    }

    fn walk(&self, value: &mut Value, denied: &mut usize) {
        match value {
            Value::Object(map) => {
                for (key, entry) in map.iter_mut() {
                    if key == "url" {
                        match entry {
                            Value::String(_) => self.rewrite(entry, denied),
                            // Image marks use {"url": {"value": "..."}}
                            Value::Object(inner) => {
                                if let Some(v) = inner.get_mut("value") {
                                    self.rewrite(v, denied);
                                }
                            }
                            _ => {}
                        }
                    } else {
                        self.walk(entry, denied);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, denied);
                }
            }
            _ => {}
        }
    }

    fn rewrite(&self, slot: &mut Value, denied: &mut usize) {
        let Value::String(current) = slot else {
            return;
        };
        match self.sanitize_url(current) {
            Some(fixed) if fixed == *current => {
                tracing::trace!(url = %current, "Spec URL allowed");
            }
            Some(fixed) => {
                tracing::debug!(url = %current, replacement = %fixed, "Spec URL rewritten");
                *slot = Value::String(fixed);
            }
            None => {
                tracing::debug!(url = %current, "Spec URL denied");
                *slot = Value::Null;
                *denied += 1;
            }
        }
    }
}
