//! Request parameter validation.
//!
//! # Responsibilities
//! - Check format, extension, revision, title and spec id
//! - Delegate domain checks to the resolver
//! - Produce an immutable `RequestDescriptor`
//!
//! # Design Decisions
//! - Checks run in a fixed order; the first failure wins
//! - A revision of 0 means "not supplied" and falls back to the title
//! - Nothing here performs I/O, so rejected requests never reach upstream

use std::sync::Arc;

use serde_json::Value;

use crate::domain::DomainResolver;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::request::descriptor::{
    InlineParams, InlineRequest, OutputFormat, PageSelector, RawParams, RequestDescriptor,
};

/// Query keys owned by the fetch protocol; clients may not override them.
const RESERVED_QUERY_KEYS: [&str; 8] = [
    "action", "format", "prop", "ppprop", "continue", "revids", "titles", "pageids",
];

/// Validates raw request parameters.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    resolver: Arc<DomainResolver>,
    formats: Vec<OutputFormat>,
}

impl RequestValidator {
    /// Create a validator accepting only `formats`.
    pub fn new(resolver: Arc<DomainResolver>, formats: Vec<OutputFormat>) -> Self {
        Self { resolver, formats }
    }

    pub fn resolver(&self) -> &Arc<DomainResolver> {
        &self.resolver
    }

    /// Validate a fetch-and-render request.
    pub fn validate(&self, raw: &RawParams) -> PipelineResult<RequestDescriptor> {
        let (spec_id, extension) = match raw.id.split_once('.') {
            Some((id, ext)) => (id, Some(ext)),
            None => (raw.id.as_str(), None),
        };

        if let Some(ext) = extension {
            if ext != raw.format {
                return Err(PipelineError::InvalidExtension {
                    extension: ext.to_string(),
                    format: raw.format.clone(),
                });
            }
        }

        let output_format = self.parse_format(&raw.format)?;
        let revision = parse_revision(raw.revision.as_deref())?;

        let page = match (revision, raw.title.as_deref()) {
            (Some(rev), _) => PageSelector::Revision(rev),
            (None, Some(title)) if !title.is_empty() => {
                if title.contains('|') {
                    return Err(PipelineError::InvalidTitle(title.to_string()));
                }
                PageSelector::Title(title.to_string())
            }
            (None, _) => return Err(PipelineError::MissingPageSelector),
        };

        if !is_hex_id(spec_id) {
            return Err(PipelineError::InvalidSpecId(spec_id.to_string()));
        }

        let domain = self.resolver.resolve(&raw.domain)?;

        let raw_query = raw
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED_QUERY_KEYS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let descriptor = RequestDescriptor {
            domain,
            page,
            spec_id: spec_id.to_string(),
            output_format,
            raw_query,
        };

        tracing::info!(
            domain = %descriptor.domain.domain,
            requested_domain = %descriptor.domain.requested,
            page = ?descriptor.page,
            spec_id = %descriptor.spec_id,
            format = %descriptor.output_format,
            "Request accepted"
        );

        Ok(descriptor)
    }

    /// Validate a render-only request whose spec arrives in the body.
    pub fn validate_inline(&self, raw: &InlineParams, body: &[u8]) -> PipelineResult<InlineRequest> {
        let output_format = self.parse_format(&raw.format)?;
        let domain = self.resolver.resolve(&raw.domain)?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PipelineError::MissingSpec("empty body".to_string()));
        }
        let spec: Value = serde_json::from_slice(body)
            .map_err(|e| PipelineError::MissingSpec(e.to_string()))?;
        if !spec.is_object() {
            return Err(PipelineError::MissingSpec("body is not a JSON object".to_string()));
        }

        tracing::info!(
            domain = %domain.domain,
            requested_domain = %domain.requested,
            title = raw.title.as_deref().unwrap_or(""),
            revision = raw.revision.as_deref().unwrap_or(""),
            format = %output_format,
            "Inline request accepted"
        );

        Ok(InlineRequest {
            domain,
            output_format,
            title: raw.title.clone(),
            revision: raw.revision.clone(),
            spec,
        })
    }

    fn parse_format(&self, format: &str) -> PipelineResult<OutputFormat> {
        format
            .parse::<OutputFormat>()
            .ok()
            .filter(|f| self.formats.contains(f))
            .ok_or_else(|| PipelineError::InvalidFormat(format.to_string()))
    }
}

/// `None` for absent, empty or zero revisions.
fn parse_revision(revision: Option<&str>) -> PipelineResult<Option<u64>> {
    let Some(revision) = revision.filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if !revision.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PipelineError::InvalidRevision(revision.to_string()));
    }
    let value: u64 = revision
        .parse()
        .map_err(|_| PipelineError::InvalidRevision(revision.to_string()))?;
    Ok((value != 0).then_some(value))
}

fn is_hex_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainAliasTable;
    use crate::pipeline::ErrorKind;

    fn validator() -> RequestValidator {
        let resolver = DomainResolver::new(
            &["wikipedia.org".to_string(), "mediawiki.org".to_string()],
            Arc::new(DomainAliasTable::default()),
        )
        .unwrap();
        RequestValidator::new(Arc::new(resolver), vec![OutputFormat::Png, OutputFormat::Svg])
    }

    fn params() -> RawParams {
        RawParams {
            domain: "en.wikipedia.org".into(),
            format: "png".into(),
            title: Some("SomePage".into()),
            revision: Some("12345".into()),
            id: "abc123.png".into(),
            ..Default::default()
        }
    }

    fn kind_of(raw: RawParams) -> ErrorKind {
        validator().validate(&raw).unwrap_err().kind()
    }

    #[test]
    fn test_valid_request() {
        let desc = validator().validate(&params()).unwrap();
        assert_eq!(desc.domain.domain, "en.wikipedia.org");
        assert_eq!(desc.page, PageSelector::Revision(12345));
        assert_eq!(desc.spec_id, "abc123");
        assert_eq!(desc.output_format, OutputFormat::Png);
    }

    #[test]
    fn test_revision_zero_falls_back_to_title() {
        let raw = RawParams {
            revision: Some("0".into()),
            ..params()
        };
        let desc = validator().validate(&raw).unwrap();
        assert_eq!(desc.page, PageSelector::Title("SomePage".into()));

        let raw = RawParams {
            revision: Some("000".into()),
            ..params()
        };
        assert_eq!(validator().validate(&raw).unwrap().page, PageSelector::Title("SomePage".into()));
    }

    #[test]
    fn test_revision_wins_over_title() {
        let raw = RawParams {
            title: Some("Has|Pipe".into()),
            ..params()
        };
        // Title is never inspected when a revision is usable
        assert_eq!(validator().validate(&raw).unwrap().page, PageSelector::Revision(12345));
    }

    #[test]
    fn test_invalid_revision() {
        for rev in ["abc", "-1", "1.5", "99999999999999999999999"] {
            let raw = RawParams {
                revision: Some(rev.into()),
                ..params()
            };
            assert_eq!(kind_of(raw), ErrorKind::InvalidRevision, "revision {rev:?}");
        }
    }

    #[test]
    fn test_title_with_pipe() {
        let raw = RawParams {
            title: Some("Page|A".into()),
            revision: Some("0".into()),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidTitle);
    }

    #[test]
    fn test_missing_page_selector() {
        let raw = RawParams {
            title: None,
            revision: None,
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::MissingPageSelector);

        let raw = RawParams {
            title: Some(String::new()),
            revision: Some("0".into()),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::MissingPageSelector);
    }

    #[test]
    fn test_format_and_extension() {
        let raw = RawParams {
            id: "abc123.svg".into(),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidExtension);

        let raw = RawParams {
            format: "gif".into(),
            id: "abc123".into(),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidFormat);

        // Parses, but is not served by this validator
        let raw = RawParams {
            format: "all".into(),
            id: "abc123".into(),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidFormat);

        let raw = RawParams {
            format: "svg".into(),
            id: "abc123".into(),
            ..params()
        };
        assert_eq!(validator().validate(&raw).unwrap().output_format, OutputFormat::Svg);
    }

    #[test]
    fn test_spec_id_must_be_lower_hex() {
        for id in ["xxx123.png", "ABC123.png", ".png", "12 34.png"] {
            let raw = RawParams {
                id: id.into(),
                ..params()
            };
            assert_eq!(kind_of(raw), ErrorKind::InvalidSpecId, "id {id:?}");
        }
    }

    #[test]
    fn test_domain_checked_last() {
        let raw = RawParams {
            domain: "example.org".into(),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidDomain);

        let raw = RawParams {
            domain: "example.org".into(),
            id: "zzz.png".into(),
            ..params()
        };
        assert_eq!(kind_of(raw), ErrorKind::InvalidSpecId);
    }

    #[test]
    fn test_reserved_query_keys_dropped() {
        let mut raw = params();
        raw.extra.insert("action".into(), "edit".into());
        raw.extra.insert("uselang".into(), "de".into());
        let desc = validator().validate(&raw).unwrap();
        assert_eq!(desc.raw_query.len(), 1);
        assert_eq!(desc.raw_query.get("uselang").map(String::as_str), Some("de"));
    }

    #[test]
    fn test_inline_request() {
        let raw = InlineParams {
            domain: "mediawiki.org".into(),
            format: "png".into(),
            title: Some("Demo".into()),
            revision: None,
        };
        let req = validator().validate_inline(&raw, br#"{"width": 100}"#).unwrap();
        assert_eq!(req.spec["width"], 100);
        assert_eq!(req.domain.domain, "mediawiki.org");

        let err = validator().validate_inline(&raw, b"  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSpec);
        let err = validator().validate_inline(&raw, b"[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSpec);
        let err = validator().validate_inline(&raw, b"{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSpec);
    }
}
