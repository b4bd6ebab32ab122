//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use graph_proxy::pipeline::PipelineResult;
use graph_proxy::render::{ImageFormat, RenderContext, RenderError, Renderer};
use graph_proxy::upstream::{ApiClient, ApiQuery, ApiResponse};
use graph_proxy::{AppConfig, HttpServer, Pipeline, Shutdown};

/// Content API stub that replays scripted answers and records every call.
#[derive(Default)]
pub struct StubApi {
    responses: Mutex<VecDeque<PipelineResult<ApiResponse>>>,
    calls: Mutex<Vec<(String, ApiQuery)>>,
}

impl StubApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stub answering each call with the next body, as HTTP 200.
    pub fn with_pages(bodies: Vec<Value>) -> Arc<Self> {
        let stub = Self::default();
        for body in bodies {
            stub.push(Ok(ApiResponse::ok(body)));
        }
        Arc::new(stub)
    }

    pub fn push(&self, response: PipelineResult<ApiResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, ApiQuery)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for StubApi {
    async fn get(&self, url: &str, query: &ApiQuery) -> PipelineResult<ApiResponse> {
        self.calls.lock().unwrap().push((url.to_string(), query.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::ok(json!({"batchcomplete": ""}))))
    }
}

/// Renders a spec as its own compact JSON bytes.
pub struct EchoRenderer;

#[async_trait]
impl Renderer for EchoRenderer {
    async fn render(&self, spec: &Value, _context: &RenderContext, _format: ImageFormat) -> Result<Vec<u8>, RenderError> {
        serde_json::to_vec(spec).map_err(|e| RenderError::InvalidSpec(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// A renderer that never finishes.
pub struct PendingRenderer;

#[async_trait]
impl Renderer for PendingRenderer {
    async fn render(&self, _spec: &Value, _context: &RenderContext, _format: ImageFormat) -> Result<Vec<u8>, RenderError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "pending"
    }
}

/// Valid config allowing wikipedia.org and mediawiki.org.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.domains = vec!["wikipedia.org".to_string(), "mediawiki.org".to_string()];
    config
}

/// A content API answer holding one page with the given `graph_specs`.
pub fn page_with_specs(specs: Value) -> Value {
    json!({
        "batchcomplete": "",
        "query": {"pages": {"12": {
            "pageid": 12,
            "ns": 0,
            "title": "SomePage",
            "pageprops": {"graph_specs": specs.to_string()}
        }}}
    })
}

pub fn pipeline(config: &AppConfig, api: Arc<StubApi>, renderer: Arc<dyn Renderer>) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(config, api, renderer).unwrap())
}

/// Fully layered router over a stub upstream.
pub fn router(config: AppConfig, api: Arc<StubApi>, renderer: Arc<dyn Renderer>) -> Router {
    let pipeline = pipeline(&config, api, renderer);
    HttpServer::new(config, pipeline).router()
}

/// Serve on an ephemeral port; trigger the returned `Shutdown` to stop.
pub async fn start_server(
    config: AppConfig,
    api: Arc<StubApi>,
    renderer: Arc<dyn Renderer>,
) -> (SocketAddr, Arc<Shutdown>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());

    let pipeline = pipeline(&config, api, renderer);
    let server = HttpServer::new(config, pipeline);
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (addr, shutdown, handle)
}
