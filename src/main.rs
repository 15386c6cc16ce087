//! inkalbum - rotating dithered album images for e-paper frames
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::http::Request;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inkalbum::generator::ImageGenerator;
use inkalbum::{AppState, Config, Service, router};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production
    let _ = dotenvy::dotenv();

    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = parse_args(std::env::args().skip(1))?;
    match cli.command {
        Command::Serve => serve(cli.config.as_deref()).await,
        Command::Generate { out } => generate(cli.config.as_deref(), out.as_deref()).await,
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve,
    Generate { out: Option<PathBuf> },
    Help,
    Version,
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    command: Command,
    config: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut command = None;
    let mut config = None;
    let mut out = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => return Ok(Cli { command: Command::Help, config }),
            "-v" | "--version" | "version" => {
                return Ok(Cli {
                    command: Command::Version,
                    config,
                });
            }
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing path after {arg}"))?;
                config = Some(PathBuf::from(path));
            }
            "-o" | "--out" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing path after {arg}"))?;
                out = Some(PathBuf::from(path));
            }
            "serve" if command.is_none() => command = Some(Command::Serve),
            "generate" | "gen" if command.is_none() => {
                command = Some(Command::Generate { out: None });
            }
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown argument: {other}\nRun 'inkalbum --help' for usage"
                ));
            }
        }
    }

    let command = match command.unwrap_or(Command::Serve) {
        Command::Generate { .. } => Command::Generate { out },
        Command::Serve if out.is_some() => {
            return Err(anyhow::anyhow!("--out is only valid with 'generate'"));
        }
        other => other,
    };
    Ok(Cli { command, config })
}

fn print_help() {
    println!(
        r#"inkalbum {} - rotating dithered album images for e-paper frames

USAGE:
    inkalbum [serve] [OPTIONS]         Run the HTTP server (default)
    inkalbum generate [OPTIONS]        Render one image and exit

OPTIONS:
    -c, --config <path>                TOML config file (or INKALBUM_CONFIG)
    -o, --out <path>                   Where 'generate' writes the PNG
                                       (default: the served artifact)
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    SHARED_ALBUM_URL                   Shared album link (required)
    PORT, BIND_ADDR                    Listen address (3000, 0.0.0.0)
    IMAGE_WIDTH, IMAGE_HEIGHT          Output size (800x480)
    LANDSCAPE_ONLY                     Skip portrait photos (true)
    CROP_STRATEGY                      center, top, ..., attention, entropy
    DITHER_MODE                        burkes, floyd-steinberg, atkinson, ...
    DATA_DIR                           Stores and artifact location
    RUST_LOG                           Log filter (info)

ENDPOINTS:
    GET /image                         The current 1-bit PNG
    GET /health                        Health check"#,
        inkalbum::VERSION
    );
}

fn print_version() {
    println!("inkalbum {}", inkalbum::VERSION);
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let addr = config.socket_addr()?;
    let service = Service::build(&config)?;

    match service.paths.remove_stale_temps() {
        Ok(0) => {}
        Ok(n) => tracing::info!(removed = n, "Removed abandoned temp files"),
        Err(e) => tracing::warn!("Failed to clean temp files: {e}"),
    }

    if config.pregenerate_on_start {
        tracing::info!("Warming up");
        if let Err(e) = service.pregen.ensure_fresh().await {
            tracing::warn!("Warm-up failed, first request will retry: {e}");
        }
    }

    let app = router(AppState::new(service.pregen)).layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, album = %config.album_url, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn generate(config_path: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let service = Service::build(&config)?;

    if let Some(out) = out {
        let image = service.generator.generate().await?;
        tokio::fs::write(out, &image.bytes)
            .await
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("✓ Wrote {} ({} bytes)", out.display(), image.bytes.len());
    } else {
        service.pregen.generate_now().await?;
        println!("✓ Wrote {}", service.paths.artifact().display());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
