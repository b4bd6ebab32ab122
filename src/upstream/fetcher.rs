//! Paginated graph spec lookup.
//!
//! # Responsibilities
//! - Drive the request/continue loop against the content API
//! - Scan each page's `graph_specs` property for the requested id
//! - Turn upstream failures into pipeline errors
//!
//! # Design Decisions
//! - Strictly sequential: the next query depends on the previous answer
//! - First page containing the id wins; later pages are never requested
//! - The loop is bounded by `max_continuations` calls

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::upstream::client::ApiClient;
use crate::upstream::query::ApiQuery;

/// A spec located upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSpec {
    pub spec: Value,
    /// Upstream calls it took to find the spec.
    pub calls: u32,
}

/// Locates one graph spec across continuation pages.
#[derive(Clone)]
pub struct SpecFetcher {
    client: Arc<dyn ApiClient>,
    max_continuations: u32,
}

impl SpecFetcher {
    pub fn new(client: Arc<dyn ApiClient>, max_continuations: u32) -> Self {
        Self {
            client,
            max_continuations,
        }
    }

    /// Query `api_url` until `spec_id` turns up or upstream runs out of pages.
    pub async fn fetch(&self, api_url: &str, initial: ApiQuery, spec_id: &str) -> PipelineResult<FetchedSpec> {
        let mut query = initial;
        let mut calls: u32 = 0;

        loop {
            if calls >= self.max_continuations {
                return Err(PipelineError::UpstreamError(format!(
                    "spec '{spec_id}' not found within {calls} API calls"
                )));
            }
            calls += 1;

            let started = Instant::now();
            let result = self.client.get(api_url, &query).await;
            metrics::record_upstream_call(
                result.as_ref().map_or("transport_error", |r| status_label(r.status)),
                started,
            );
            let response = result?;

            if response.status != 200 {
                return Err(PipelineError::UpstreamStatus {
                    status: response.status,
                });
            }

            let Value::Object(body) = response.body else {
                return Err(PipelineError::MalformedPayload(
                    "response body is not a JSON object".to_string(),
                ));
            };

            if let Some(error) = body.get("error") {
                return Err(PipelineError::UpstreamError(error.to_string()));
            }

            if let Some(warnings) = body.get("warnings") {
                tracing::warn!(
                    api_url = %api_url,
                    call = calls,
                    warnings = %warnings,
                    "Content API returned warnings"
                );
            }

            if let Some(spec) = find_spec(&body, spec_id)? {
                tracing::debug!(api_url = %api_url, spec_id = %spec_id, calls, "Graph spec found");
                return Ok(FetchedSpec { spec, calls });
            }

            match body.get("continue") {
                Some(Value::Object(continuation)) => {
                    tracing::debug!(api_url = %api_url, call = calls, "Following continuation");
                    query = query.merge_continuation(continuation);
                }
                _ => {
                    return Err(PipelineError::SpecNotFound {
                        spec_id: spec_id.to_string(),
                        calls,
                    })
                }
            }
        }
    }
}

fn status_label(status: u16) -> &'static str {
    match status {
        200 => "ok",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "other",
    }
}

/// Scan `query.pages` in upstream order for `spec_id`.
fn find_spec(body: &Map<String, Value>, spec_id: &str) -> PipelineResult<Option<Value>> {
    let pages: Box<dyn Iterator<Item = &Value> + '_> = match body.get("query").and_then(|q| q.get("pages")) {
        Some(Value::Object(pages)) => Box::new(pages.values()),
        // formatversion=2 returns a list
        Some(Value::Array(pages)) => Box::new(pages.iter()),
        _ => return Ok(None),
    };

    for page in pages {
        let Some(graph_specs) = page.get("pageprops").and_then(|p| p.get("graph_specs")) else {
            continue;
        };

        let mut specs = match graph_specs {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(specs)) => specs,
                Ok(_) => {
                    return Err(PipelineError::MalformedPayload(
                        "graph_specs is not a JSON object".to_string(),
                    ))
                }
                Err(e) => {
                    return Err(PipelineError::MalformedPayload(format!(
                        "graph_specs does not parse: {e}"
                    )))
                }
            },
            Value::Object(specs) => specs.clone(),
            _ => {
                return Err(PipelineError::MalformedPayload(
                    "graph_specs has an unexpected type".to_string(),
                ))
            }
        };

        if let Some(spec) = specs.remove(spec_id) {
            return Ok(Some(spec));
        }
    }

    Ok(None)
}
