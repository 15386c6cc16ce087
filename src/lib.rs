//! # inkalbum 🖼️
//!
//! Serves one rotating, dithered 1-bit PNG from a shared photo album to an
//! e-paper picture frame.
//!
//! ## Overview
//!
//! The frame polls `GET /image`. Each response is the image that was
//! prepared in the background after the previous request, so the frame never
//! waits for album scraping, downloads, or dithering once the service is warm.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP (routes)                           │
//! │           GET /image, GET /health, 304 validators           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Pregenerator (pregen)                      │
//! │   MISSING → GENERATING → READY, atomic temp + rename        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//! ┌─────────────────┐                     ┌─────────────────┐
//! │  AlbumResolver  │                     │CandidateSelector│
//! │                 │                     │                 │
//! │ • URL cache     │                     │ • Random draws  │
//! │ • Size hints    │                     │ • Attempt bound │
//! │ • Light / heavy │                     │ • Filter        │
//! └─────────────────┘                     └─────────────────┘
//!          │                                       │
//!          ▼                              ┌────────┴────────┐
//! ┌─────────────────┐                     ▼                 ▼
//! │   AlbumSource   │            ┌─────────────────┐ ┌─────────────────┐
//! │                 │            │   Suitability   │ │    Pipeline     │
//! │ • Google Photos │            │                 │ │                 │
//! │ • Video probe   │            │ • Blocklist     │ │ • Decode + gate │
//! │ • Download      │            │ • Video probe   │ │ • Crop, dither  │
//! └─────────────────┘            └─────────────────┘ │ • 1-bit PNG     │
//!                                                    └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`album`] — Album discovery, URL cache, Google Photos client
//! - [`config`] — Configuration from file and environment
//! - [`db`] — `SQLite` key-value stores (blocklist, album metadata)
//! - [`filter`] — Cheap suitability checks before download
//! - [`pipeline`] — Decode, crop, dither, encode
//! - [`pregen`] — The on-disk artifact and its regeneration
//! - [`routes`] — HTTP handlers
//! - [`selector`] — Bounded random candidate selection
//!
//! ## Example
//!
//! ```no_run
//! use inkalbum::{AppState, Config, Service, router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let service = Service::build(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;
//!     axum::serve(listener, router(AppState::new(service.pregen))).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/inkalbum/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::return_self_not_must_use)]

pub mod album;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod generator;
pub mod models;
pub mod paths;
pub mod pipeline;
pub mod pregen;
pub mod routes;
pub mod selector;
pub mod service;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use routes::router;
pub use service::Service;
pub use state::AppState;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
