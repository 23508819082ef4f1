//! REST API server example
//!
//! This example shows how to run media-dl with the REST API enabled,
//! allowing control via HTTP endpoints.
//!
//! Pass a JSON config file as the first argument to override the defaults.
//! Logging is controlled with `RUST_LOG` (default: `info`).
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Probe a URL via POST http://localhost:8000/probe
//! - Start a download via POST http://localhost:8000/download
//! - Poll progress via GET http://localhost:8000/progress/{task_id}
//! - Fetch the file via GET http://localhost:8000/download/{task_id}

use media_dl::{Config, MediaDownloader, serve_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Config>(&raw)?
        }
        None => Config::default(),
    };
    let address = config.server.api.bind_address;

    let downloader = Arc::new(MediaDownloader::new(config).await?);

    println!("Starting media-dl REST API server (engine: {})", downloader.engine_name());
    println!("Swagger UI: http://{}/swagger-ui", address);
    println!();
    println!("Example commands:");
    println!("  # Probe a URL");
    println!("  curl -X POST http://{}/probe \\", address);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://www.youtube.com/watch?v=BaW_jenozKc\"}}'");
    println!();
    println!("  # Start a download with a format id from the probe");
    println!("  curl -X POST http://{}/download \\", address);
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"url\": \"https://www.youtube.com/watch?v=BaW_jenozKc\", \"format_id\": \"137\"}}'"
    );
    println!();
    println!("  # Poll and fetch");
    println!("  curl http://{}/progress/<task_id>", address);
    println!("  curl -OJ http://{}/download/<task_id>", address);
    println!();
    println!("Press Ctrl+C to stop the server");

    serve_with_shutdown(downloader).await?;

    Ok(())
}
