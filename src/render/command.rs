//! Renderer backed by an external executable.
//!
//! The spec is written to the child's stdin as JSON and the image is read
//! from its stdout. Children are spawned with `kill_on_drop`, so dropping
//! the render future (deadline expiry) terminates the process.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::RendererConfig;
use crate::render::{ImageFormat, RenderContext, RenderError, Renderer};

/// Placeholder substituted with the per-request base URL.
const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// Longest stderr excerpt kept in errors.
const MAX_STDERR_BYTES: usize = 2048;

/// Runs one command per image format (e.g. `vg2png` / `vg2svg`).
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    png_command: Vec<String>,
    svg_command: Vec<String>,
}

impl CommandRenderer {
    pub fn new(png_command: Vec<String>, svg_command: Vec<String>) -> Self {
        Self {
            png_command,
            svg_command,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.png_command.clone(), config.svg_command.clone())
    }

    fn command_for(&self, format: ImageFormat) -> &[String] {
        match format {
            ImageFormat::Png => &self.png_command,
            ImageFormat::Svg => &self.svg_command,
        }
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(
        &self,
        spec: &Value,
        context: &RenderContext,
        format: ImageFormat,
    ) -> Result<Vec<u8>, RenderError> {
        let (program, args) = self
            .command_for(format)
            .split_first()
            .ok_or(RenderError::NoCommand(format))?;

        let base_url = context.base_url();
        let input = serde_json::to_vec(spec).map_err(|e| RenderError::InvalidSpec(e.to_string()))?;

        let mut child = Command::new(program)
            .args(args.iter().map(|arg| arg.replace(BASE_URL_PLACEHOLDER, &base_url)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: program.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Io(std::io::Error::other("renderer stdin unavailable")))?;

        // Feed stdin while draining stdout so large specs cannot deadlock.
        let feed = async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.len() > MAX_STDERR_BYTES {
                let mut cut = MAX_STDERR_BYTES;
                while !stderr.is_char_boundary(cut) {
                    cut -= 1;
                }
                stderr.truncate(cut);
            }
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        // A renderer may legitimately stop reading early.
        if let Err(e) = fed {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(RenderError::Io(e));
            }
        }

        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        tracing::debug!(
            renderer = self.name(),
            format = %format,
            bytes = output.stdout.len(),
            "Render complete"
        );

        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::DomainAliasTable;
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> RenderContext {
        RenderContext::new("en.wikipedia.org", "https", Arc::new(DomainAliasTable::default()))
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_spec_is_piped_through() {
        let renderer = CommandRenderer::new(argv(&["cat"]), argv(&["cat"]));
        let spec = json!({"width": 10});

        let bytes = renderer.render(&spec, &context(), ImageFormat::Png).await.unwrap();

        let echoed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(echoed, spec);
    }

    #[tokio::test]
    async fn test_base_url_placeholder() {
        let renderer = CommandRenderer::new(
            argv(&["cat"]),
            argv(&["sh", "-c", "cat > /dev/null; printf %s \"$0\"", "{base_url}"]),
        );

        let bytes = renderer.render(&json!({}), &context(), ImageFormat::Svg).await.unwrap();

        assert_eq!(bytes, b"https://en.wikipedia.org/");
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let renderer = CommandRenderer::new(argv(&["sh", "-c", "echo bad spec >&2; exit 3"]), argv(&["cat"]));

        let err = renderer.render(&json!({}), &context(), ImageFormat::Png).await.unwrap_err();

        match err {
            RenderError::Failed { stderr, .. } => assert_eq!(stderr, "bad spec"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output() {
        let renderer = CommandRenderer::new(argv(&["sh", "-c", "cat > /dev/null"]), argv(&["cat"]));
        let err = renderer.render(&json!({}), &context(), ImageFormat::Png).await.unwrap_err();
        assert!(matches!(err, RenderError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let renderer = CommandRenderer::new(argv(&["definitely-not-a-renderer-xyz"]), Vec::new());

        let err = renderer.render(&json!({}), &context(), ImageFormat::Png).await.unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));

        let err = renderer.render(&json!({}), &context(), ImageFormat::Svg).await.unwrap_err();
        assert!(matches!(err, RenderError::NoCommand(ImageFormat::Svg)));
    }
}
