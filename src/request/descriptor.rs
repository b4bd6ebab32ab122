//! Canonical request types produced by validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::domain::ResolvedDomain;
use crate::render::ImageFormat;

/// Output format requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Svg,
    /// Every image format; used for format-agnostic lookups and batch renders.
    All,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::All => "all",
        }
    }

    /// Concrete image formats this output expands to.
    pub fn image_formats(&self) -> &'static [ImageFormat] {
        match self {
            OutputFormat::Png => &[ImageFormat::Png],
            OutputFormat::Svg => &[ImageFormat::Svg],
            OutputFormat::All => &[ImageFormat::Png, ImageFormat::Svg],
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            "all" => Ok(OutputFormat::All),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the upstream page is selected. Exactly one is ever set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelector {
    Revision(u64),
    Title(String),
}

/// Raw parameters of a fetch-and-render request, as routed.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    pub domain: String,
    /// Declared output format.
    pub format: String,
    pub title: Option<String>,
    pub revision: Option<String>,
    /// Spec id, optionally followed by `.<extension>`.
    pub id: String,
    /// Additional upstream query parameters.
    pub extra: BTreeMap<String, String>,
}

/// Raw parameters of a render-only request (spec in the body).
#[derive(Debug, Clone, Default)]
pub struct InlineParams {
    pub domain: String,
    pub format: String,
    pub title: Option<String>,
    pub revision: Option<String>,
}

/// A validated fetch-and-render request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub domain: ResolvedDomain,
    pub page: PageSelector,
    /// Lowercase hex id of the graph on the page.
    pub spec_id: String,
    pub output_format: OutputFormat,
    /// Extra upstream parameters; reserved keys already removed.
    pub raw_query: BTreeMap<String, String>,
}

/// A validated render-only request.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRequest {
    pub domain: ResolvedDomain,
    pub output_format: OutputFormat,
    /// Informational only.
    pub title: Option<String>,
    /// Informational only.
    pub revision: Option<String>,
    pub spec: Value,
}
