//! Configuration module for inkalbum
//!
//! Settings come from an optional TOML file, then environment variables on
//! top. The album URL is the only required setting.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pipeline::{CropStrategy, DitherMode, TransformOptions};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "INKALBUM_CONFIG";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Shared album link (photos.app.goo.gl or photos.google.com/share)
    #[serde(default)]
    pub album_url: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Output width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Skip portrait and square photos
    #[serde(default = "default_true")]
    pub landscape_only: bool,

    /// Crop anchor name (center, top, ..., attention, entropy)
    #[serde(default = "default_crop")]
    pub crop_strategy: String,

    /// Dithering algorithm name
    #[serde(default = "default_dither")]
    pub dither_mode: String,

    /// Where stores and the artifact live (default: platform data dir)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Candidates tried per generation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// How long a resolved album stays cached
    #[serde(default = "default_url_cache_ttl")]
    pub url_cache_ttl_secs: u64,

    /// Per-request timeout for probes and downloads
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for a whole album scrape
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,

    /// Generate an image before accepting requests
    #[serde(default = "default_true")]
    pub pregenerate_on_start: bool,
}

const fn default_port() -> u16 {
    3000
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

const fn default_width() -> u32 {
    crate::pipeline::DEFAULT_WIDTH
}

const fn default_height() -> u32 {
    crate::pipeline::DEFAULT_HEIGHT
}

const fn default_true() -> bool {
    true
}

fn default_crop() -> String {
    CropStrategy::default().name().to_string()
}

fn default_dither() -> String {
    DitherMode::default().name().to_string()
}

const fn default_max_attempts() -> usize {
    crate::selector::DEFAULT_MAX_ATTEMPTS
}

const fn default_url_cache_ttl() -> u64 {
    3600
}

const fn default_fetch_timeout() -> u64 {
    30
}

const fn default_scrape_timeout() -> u64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            album_url: String::new(),
            port: default_port(),
            bind_addr: default_bind_addr(),
            width: default_width(),
            height: default_height(),
            landscape_only: true,
            crop_strategy: default_crop(),
            dither_mode: default_dither(),
            data_dir: None,
            max_attempts: default_max_attempts(),
            url_cache_ttl_secs: default_url_cache_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            scrape_timeout_secs: default_scrape_timeout(),
            pregenerate_on_start: true,
        }
    }
}

impl Config {
    /// Load from an optional file plus the process environment.
    ///
    /// The file is `path` if given, else `$INKALBUM_CONFIG` if set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.or(from_env.as_deref()) {
            Some(p) => Self::load_from(p)?,
            None => Self::default(),
        };
        config.apply_vars(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus variables from `lookup`
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_vars(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Override fields with whichever variables `lookup` knows
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SHARED_ALBUM_URL") {
            self.album_url = v.trim().to_string();
        }
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("CROP_STRATEGY") {
            self.crop_strategy = v;
        }
        if let Some(v) = get("DITHER_MODE") {
            self.dither_mode = v;
        }
        if let Some(v) = get("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        parse_into(&get, "PORT", &mut self.port)?;
        parse_into(&get, "IMAGE_WIDTH", &mut self.width)?;
        parse_into(&get, "IMAGE_HEIGHT", &mut self.height)?;
        parse_into(&get, "MAX_ATTEMPTS", &mut self.max_attempts)?;
        parse_into(&get, "URL_CACHE_TTL_SECS", &mut self.url_cache_ttl_secs)?;
        parse_into(&get, "FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs)?;
        parse_into(&get, "SCRAPE_TIMEOUT_SECS", &mut self.scrape_timeout_secs)?;
        if let Some(v) = get("LANDSCAPE_ONLY") {
            self.landscape_only = parse_bool("LANDSCAPE_ONLY", &v)?;
        }
        if let Some(v) = get("PREGENERATE_ON_START") {
            self.pregenerate_on_start = parse_bool("PREGENERATE_ON_START", &v)?;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.album_url.is_empty() {
            return Err(Error::Config(
                "SHARED_ALBUM_URL environment variable is not set".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Address to bind the HTTP server to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip = IpAddr::from_str(&self.bind_addr)
            .map_err(|e| Error::Config(format!("invalid BIND_ADDR {:?}: {e}", self.bind_addr)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Pipeline options. Unknown crop or dither names fall back with a warning.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            width: self.width,
            height: self.height,
            landscape_only: self.landscape_only,
            crop: CropStrategy::from_name_or_default(&self.crop_strategy),
            dither: DitherMode::from_name_or_default(&self.dither_mode),
        }
    }

    /// Longest edge to request from the album host. Twice the target box
    /// leaves room for the cover crop.
    pub fn download_size(&self) -> u32 {
        self.width.max(self.height).saturating_mul(2)
    }

    /// URL cache lifetime
    pub fn url_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.url_cache_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Probe and download timeout
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Album scrape timeout
    pub const fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

fn parse_into<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Some(v) = get(key) {
        *slot = v
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key} {v:?}: {e}")))?;
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid {key} {value:?}: expected true or false"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = assert_ok!(Config::from_vars(vars(&[(
            "SHARED_ALBUM_URL",
            "https://photos.app.goo.gl/abc"
        )])));
        assert_eq!(config.port, 3000);
        assert_eq!((config.width, config.height), (800, 480));
        assert!(config.landscape_only);
        assert_eq!(config.max_attempts, 10);

        let opts = config.transform_options();
        assert_eq!(opts.crop, CropStrategy::Center);
        assert_eq!(opts.dither, DitherMode::Burkes);
        assert_eq!(config.download_size(), 1600);
    }

    #[test]
    fn test_missing_album_is_config_error() {
        let err = assert_err!(Config::from_vars(vars(&[("PORT", "8080")])));
        assert!(matches!(err, Error::Config(_)));

        let err = assert_err!(Config::from_vars(vars(&[("SHARED_ALBUM_URL", "  ")])));
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_vars(vars(&[
            ("SHARED_ALBUM_URL", "https://photos.app.goo.gl/abc"),
            ("PORT", "8080"),
            ("IMAGE_WIDTH", "640"),
            ("IMAGE_HEIGHT", "384"),
            ("LANDSCAPE_ONLY", "false"),
            ("CROP_STRATEGY", "entropy"),
            ("DITHER_MODE", "atkinson"),
            ("DATA_DIR", "/var/lib/inkalbum"),
        ]))
        .unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/inkalbum")));

        let opts = config.transform_options();
        assert_eq!((opts.width, opts.height), (640, 384));
        assert!(!opts.landscape_only);
        assert_eq!(opts.crop, CropStrategy::Entropy);
        assert_eq!(opts.dither, DitherMode::Atkinson);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let config = Config::from_vars(vars(&[
            ("SHARED_ALBUM_URL", "x"),
            ("CROP_STRATEGY", "diagonal"),
            ("DITHER_MODE", "halftone"),
        ]))
        .unwrap();
        let opts = config.transform_options();
        assert_eq!(opts.crop, CropStrategy::Center);
        assert_eq!(opts.dither, DitherMode::Burkes);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = Config::from_vars(vars(&[("SHARED_ALBUM_URL", "x"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(Config::from_vars(vars(&[("SHARED_ALBUM_URL", "x"), ("LANDSCAPE_ONLY", "maybe")])).is_err());
    }

    #[test]
    fn test_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "album_url = \"https://photos.app.goo.gl/file\"\nport = 4000\ndither_mode = \"sierra\"\n",
        )
        .unwrap();

        let mut config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.height, 480);

        config.apply_vars(vars(&[("PORT", "5000")])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.album_url, "https://photos.app.goo.gl/file");
        assert_eq!(config.transform_options().dither, DitherMode::Sierra);
    }
}
