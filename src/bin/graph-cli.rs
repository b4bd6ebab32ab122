use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use graph_proxy::config::load_config;
use graph_proxy::request::{OutputFormat, RawParams, RequestValidator};
use graph_proxy::resilience::with_deadline;
use graph_proxy::Pipeline;

#[derive(Parser)]
#[command(name = "graph-cli")]
#[command(about = "Management CLI for the graph render proxy", long_about = None)]
struct Cli {
    /// Base URL of a running graph-proxy.
    #[arg(short, long, default_value = "http://localhost:11042")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service name, version and renderer
    Info,
    /// Render a graph through the running service and save the image(s)
    Render {
        domain: String,
        title: String,
        revid: String,
        /// Graph spec id (hex)
        id: String,
        /// png, svg, or all
        #[arg(short, long, default_value = "png")]
        format: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Look up a graph spec directly through the content API and print it
    Spec {
        /// Path to the service's TOML configuration
        #[arg(short, long)]
        config: PathBuf,
        domain: String,
        /// Graph spec id (hex)
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        revid: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info => {
            let res = reqwest::get(format!("{}/_info", cli.url)).await?;
            print_response(res).await?;
        }
        Commands::Render {
            domain,
            title,
            revid,
            id,
            format,
            out_dir,
        } => {
            let output: OutputFormat = format
                .parse()
                .map_err(|_| format!("unknown format '{format}' (expected png, svg or all)"))?;
            let client = reqwest::Client::new();

            for image_format in output.image_formats() {
                let res = client
                    .get(format!(
                        "{}/{}/v1/{}/{}/{}/{}.{}",
                        cli.url, domain, image_format, title, revid, id, image_format
                    ))
                    .send()
                    .await?;

                let status = res.status();
                if !status.is_success() {
                    eprintln!("Error: {image_format} render returned status {status}");
                    if let Ok(text) = res.text().await {
                        eprintln!("Response: {text}");
                    }
                    continue;
                }

                let path = out_dir.join(format!("{id}.{image_format}"));
                let bytes = res.bytes().await?;
                tokio::fs::write(&path, &bytes).await?;
                println!("{} ({} bytes)", path.display(), bytes.len());
            }
        }
        Commands::Spec {
            config,
            domain,
            id,
            title,
            revid,
        } => {
            let config = load_config(&config)?;
            let pipeline = Pipeline::from_config(&config)?;

            // Lookups are format-agnostic.
            let validator = RequestValidator::new(pipeline.resolver().clone(), vec![OutputFormat::All]);
            let descriptor = validator.validate(&RawParams {
                domain,
                format: OutputFormat::All.to_string(),
                title,
                revision: revid,
                id,
                ..Default::default()
            })?;

            let fetched = with_deadline(config.pipeline.timeout_ms, pipeline.lookup(&descriptor)).await?;
            eprintln!(
                "Found '{}' on {} after {} API call(s)",
                descriptor.spec_id, descriptor.domain.domain, fetched.calls
            );
            println!("{}", serde_json::to_string_pretty(&fetched.spec)?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
