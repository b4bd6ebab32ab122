//! Request orchestration: validate → fetch → render under one deadline.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::field::Empty;
use tracing::{Instrument, Span};

use crate::config::AppConfig;
use crate::domain::{DomainResolver, ResolvedDomain};
use crate::observability::metrics;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::render::{CommandRenderer, ImageFormat, RenderContext, RenderedImage, Renderer};
use crate::request::{InlineParams, OutputFormat, RawParams, RequestDescriptor, RequestValidator};
use crate::resilience::with_deadline;
use crate::upstream::{self, ApiClient, ApiQuery, FetchedSpec, ReqwestApiClient, SpecFetcher};

/// Failure to assemble a pipeline from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to compile domain pattern: {0}")]
    DomainPattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The shared, immutable request pipeline.
pub struct Pipeline {
    validator: RequestValidator,
    fetcher: SpecFetcher,
    renderer: Arc<dyn Renderer>,
    protocol: String,
    api_path: String,
    timeout_ms: i64,
}

impl Pipeline {
    /// Assemble a pipeline around the given transport and renderer.
    pub fn new(
        config: &AppConfig,
        client: Arc<dyn ApiClient>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, SetupError> {
        let resolver = Arc::new(DomainResolver::from_config(&config.upstream)?);
        let formats = config
            .pipeline
            .formats
            .iter()
            .filter_map(|f| f.parse::<ImageFormat>().ok())
            .map(|f| match f {
                ImageFormat::Png => OutputFormat::Png,
                ImageFormat::Svg => OutputFormat::Svg,
            })
            .collect();

        Ok(Self {
            validator: RequestValidator::new(resolver, formats),
            fetcher: SpecFetcher::new(client, config.upstream.max_continuations),
            renderer,
            protocol: config.upstream.default_protocol.clone(),
            api_path: config.upstream.api_path.clone(),
            timeout_ms: config.pipeline.timeout_ms,
        })
    }

    /// Production pipeline: reqwest transport and command renderer.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let client = Arc::new(ReqwestApiClient::new(&config.upstream.user_agent)?);
        let renderer = Arc::new(CommandRenderer::from_config(&config.renderer));
        Self::new(config, client, renderer)
    }

    pub fn resolver(&self) -> &Arc<DomainResolver> {
        self.validator.resolver()
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Serve a fetch-and-render request.
    pub async fn handle(&self, raw: RawParams, request_id: &str) -> PipelineResult<RenderedImage> {
        let span = tracing::info_span!(
            "graph_request",
            request_id = %request_id,
            mode = "fetch",
            requested_domain = %raw.domain,
            title = raw.title.as_deref().unwrap_or(""),
            revid = raw.revision.as_deref().unwrap_or(""),
            id = %raw.id,
            domain = Empty,
            spec_id = Empty,
            format = Empty,
            api_calls = Empty,
        );

        let started = Instant::now();
        let result = with_deadline(self.timeout_ms, self.fetch_and_render(&raw))
            .instrument(span.clone())
            .await;
        report(&span, started, &result);
        result
    }

    /// Serve a render-only request whose spec is the request body.
    pub async fn handle_inline(
        &self,
        raw: InlineParams,
        body: &[u8],
        request_id: &str,
    ) -> PipelineResult<RenderedImage> {
        let span = tracing::info_span!(
            "graph_request",
            request_id = %request_id,
            mode = "inline",
            requested_domain = %raw.domain,
            title = raw.title.as_deref().unwrap_or(""),
            revid = raw.revision.as_deref().unwrap_or(""),
            domain = Empty,
            format = Empty,
        );

        let started = Instant::now();
        let result = with_deadline(self.timeout_ms, async {
            let request = self.validator.validate_inline(&raw, body)?;
            let span = Span::current();
            span.record("domain", request.domain.domain.as_str());
            span.record("format", request.output_format.as_str());
            metrics::record_request("inline", &request.domain.domain);

            self.render(request.spec, &request.domain, request.output_format).await
        })
        .instrument(span.clone())
        .await;
        report(&span, started, &result);
        result
    }

    /// Fail a request the router could not even parse, reporting it like any other.
    pub fn reject(&self, error: PipelineError, request_id: &str) -> PipelineResult<RenderedImage> {
        let span = tracing::info_span!("graph_request", request_id = %request_id, mode = "rejected");
        let result = Err(error);
        report(&span, Instant::now(), &result);
        result
    }

    /// Locate the spec for a validated request.
    pub async fn lookup(&self, descriptor: &RequestDescriptor) -> PipelineResult<FetchedSpec> {
        let api_url = upstream::api_url(&self.protocol, &descriptor.domain.domain, &self.api_path);
        let started = Instant::now();
        let fetched = self
            .fetcher
            .fetch(&api_url, ApiQuery::for_descriptor(descriptor), &descriptor.spec_id)
            .await;
        metrics::record_stage("fetch", started);

        let fetched = fetched?;
        Span::current().record("api_calls", fetched.calls);
        metrics::record_upstream_calls_per_request(fetched.calls);
        Ok(fetched)
    }

    async fn fetch_and_render(&self, raw: &RawParams) -> PipelineResult<RenderedImage> {
        let descriptor = self.validator.validate(raw)?;

        let span = Span::current();
        span.record("domain", descriptor.domain.domain.as_str());
        span.record("spec_id", descriptor.spec_id.as_str());
        span.record("format", descriptor.output_format.as_str());
        metrics::record_request("fetch", &descriptor.domain.domain);

        let fetched = self.lookup(&descriptor).await?;
        self.render(fetched.spec, &descriptor.domain, descriptor.output_format)
            .await
    }

    async fn render(
        &self,
        mut spec: Value,
        domain: &ResolvedDomain,
        output_format: OutputFormat,
    ) -> PipelineResult<RenderedImage> {
        let format = match output_format.image_formats() {
            [single] => *single,
            _ => return Err(PipelineError::InvalidFormat(output_format.to_string())),
        };

        let context = RenderContext::new(
            domain.domain.as_str(),
            self.protocol.as_str(),
            self.resolver().aliases().clone(),
        );
        let denied = context.sanitize_spec(&mut spec);
        if denied > 0 {
            tracing::debug!(denied, "Removed disallowed data URLs from spec");
        }

        let started = Instant::now();
        let bytes = self
            .renderer
            .render(&spec, &context, format)
            .await
            .map_err(|e| PipelineError::RenderError(e.to_string()));
        metrics::record_stage("render", started);

        Ok(RenderedImage { format, bytes: bytes? })
    }
}

/// Log the outcome of one request. This is the only place failures are logged.
fn report(span: &Span, started: Instant, result: &PipelineResult<RenderedImage>) {
    metrics::record_stage("total", started);
    let elapsed_ms = started.elapsed().as_millis() as u64;

    span.in_scope(|| match result {
        Ok(image) => {
            tracing::info!(
                content_type = image.content_type(),
                bytes = image.bytes.len(),
                elapsed_ms,
                "Graph rendered"
            );
        }
        Err(err) => {
            let kind = err.kind();
            metrics::record_failure(kind);
            if kind.is_client_input() {
                tracing::info!(kind = %kind, error = %err, elapsed_ms, "Graph request rejected");
            } else {
                tracing::warn!(kind = %kind, error = %err, elapsed_ms, "Graph request failed");
            }
        }
    });
}
