//! Domain allow-listing and canonicalization.
//!
//! # Responsibilities
//! - Match a requested host against the allow-list (plus alias keys)
//! - Preserve an optional language prefix, drop the mobile/zero marker
//! - Rewrite the canonical domain through the alias table
//!
//! # Design Decisions
//! - Host matching is case-insensitive (input is lower-cased first)
//! - The pattern is compiled once at startup and never changes
//! - Mobile and desktop hosts collapse to one canonical domain so both share
//!   cache entries

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use crate::config::UpstreamConfig;
use crate::pipeline::{PipelineError, PipelineResult};

/// Markers that select a mobile or zero-rated mirror of a wiki.
const MIRROR_MARKERS: [&str; 2] = ["m.", "zero."];

/// Static `old → new` domain rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainAliasTable {
    map: BTreeMap<String, String>,
}

impl DomainAliasTable {
    /// Build the table from configured pairs. Keys are lower-cased.
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Alias target for a domain, if any.
    pub fn get(&self, domain: &str) -> Option<&str> {
        self.map.get(domain).map(String::as_str)
    }

    /// Domains that have an alias.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Outcome of resolving a requested host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDomain {
    /// The host as the client supplied it (kept for logs).
    pub requested: String,
    /// Canonical domain after marker removal and alias substitution.
    pub domain: String,
}

impl ResolvedDomain {
    /// True when the canonical domain differs from what was requested.
    pub fn is_rewritten(&self) -> bool {
        self.requested != self.domain
    }
}

/// Validates and canonicalizes request domains.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    pattern: Regex,
    aliases: Arc<DomainAliasTable>,
}

impl DomainResolver {
    /// Compile the allow-list pattern from `domains` plus every alias key.
    pub fn new(domains: &[String], aliases: Arc<DomainAliasTable>) -> Result<Self, regex::Error> {
        let alternatives = domains
            .iter()
            .map(|d| d.to_lowercase())
            .chain(aliases.keys().map(str::to_string))
            .map(|d| regex::escape(&d))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(r"^([-a-z0-9]+\.)?(m\.|zero\.)?({alternatives})$"))?;

        Ok(Self { pattern, aliases })
    }

    /// Build a resolver from the upstream section of the config.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, regex::Error> {
        let aliases = Arc::new(DomainAliasTable::new(config.domain_map.clone()));
        Self::new(&config.domains, aliases)
    }

    /// The alias table shared with render contexts.
    pub fn aliases(&self) -> &Arc<DomainAliasTable> {
        &self.aliases
    }

    /// Resolve `host` to its canonical domain or fail with `InvalidDomain`.
    pub fn resolve(&self, host: &str) -> PipelineResult<ResolvedDomain> {
        let lowered = host.to_lowercase();
        let captures = self
            .pattern
            .captures(&lowered)
            .ok_or_else(|| PipelineError::InvalidDomain(host.to_string()))?;

        let mut prefix = captures.get(1).map_or("", |m| m.as_str());
        let base = captures.get(3).map_or("", |m| m.as_str());

        // "m.wikipedia.org" lands the marker in the prefix group.
        if captures.get(2).is_none() && MIRROR_MARKERS.contains(&prefix) {
            prefix = "";
        }

        let canonical = format!("{prefix}{base}");
        let domain = match self.aliases.get(&canonical) {
            Some(target) => target.to_string(),
            None => canonical,
        };

        Ok(ResolvedDomain {
            requested: host.to_string(),
            domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;

    fn resolver() -> DomainResolver {
        let aliases = Arc::new(DomainAliasTable::new([
            ("old.example.org", "new.example.org"),
            ("en.wikipedia.org", "en.mirror.org"),
        ]));
        DomainResolver::new(
            &["wikipedia.org".to_string(), "mediawiki.org".to_string()],
            aliases,
        )
        .unwrap()
    }

    #[test]
    fn test_strips_marker_keeps_prefix() {
        let r = resolver();
        assert_eq!(r.resolve("de.m.wikipedia.org").unwrap().domain, "de.wikipedia.org");
        assert_eq!(r.resolve("fr.zero.wikipedia.org").unwrap().domain, "fr.wikipedia.org");
        assert_eq!(r.resolve("www.mediawiki.org").unwrap().domain, "www.mediawiki.org");
    }

    #[test]
    fn test_bare_marker_is_dropped() {
        let r = resolver();
        assert_eq!(r.resolve("m.mediawiki.org").unwrap().domain, "mediawiki.org");
        assert_eq!(r.resolve("zero.mediawiki.org").unwrap().domain, "mediawiki.org");
    }

    #[test]
    fn test_canonical_is_idempotent() {
        let r = resolver();
        for host in ["mediawiki.org", "de.wikipedia.org", "wikipedia.org"] {
            let first = r.resolve(host).unwrap();
            assert_eq!(first.domain, host);
            assert!(!first.is_rewritten());
            assert_eq!(r.resolve(&first.domain).unwrap().domain, host);
        }
    }

    #[test]
    fn test_alias_applied_after_canonicalization() {
        let r = resolver();
        let resolved = r.resolve("en.m.wikipedia.org").unwrap();
        assert_eq!(resolved.domain, "en.mirror.org");
        assert_eq!(resolved.requested, "en.m.wikipedia.org");
        assert!(resolved.is_rewritten());

        // Alias keys are allow-listed on their own
        assert_eq!(r.resolve("old.example.org").unwrap().domain, "new.example.org");
    }

    #[test]
    fn test_case_insensitive() {
        let r = resolver();
        assert_eq!(r.resolve("DE.Wikipedia.ORG").unwrap().domain, "de.wikipedia.org");
    }

    #[test]
    fn test_rejects_unlisted() {
        let r = resolver();
        for host in [
            "example.org",
            "wikipedia.org.evil.com",
            "evilwikipedia.org",
            "a.b.c.wikipedia.org",
            "user@wikipedia.org",
            "wikipediaxorg",
            "",
        ] {
            let err = r.resolve(host).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDomain, "host {host:?}");
        }
    }
}
