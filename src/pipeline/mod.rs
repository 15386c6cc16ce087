//! Transform pipeline: decode → orientation gate → cover crop → dither →
//! 1-bit PNG.
//!
//! The pipeline is pure: the same bytes and the same [`TransformOptions`]
//! always produce byte-identical output.

pub mod crop;
pub mod dither;
pub mod encode;

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};

use crate::error::{Error, Result};
use crate::models::ProcessedImage;

pub use crop::CropStrategy;
pub use dither::{ColorScheme, DitherMode, Dithered, Ditherer, ErrorDiffusion};

/// Default panel width (7.5" e-paper)
pub const DEFAULT_WIDTH: u32 = 800;

/// Default panel height
pub const DEFAULT_HEIGHT: u32 = 480;

/// How source images become display output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Reject sources whose height >= width
    pub landscape_only: bool,
    /// Crop anchor
    pub crop: CropStrategy,
    /// Dithering algorithm
    pub dither: DitherMode,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            landscape_only: true,
            crop: CropStrategy::default(),
            dither: DitherMode::default(),
        }
    }
}

/// Why a decodable image was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Portrait or square after decoding
    NotLandscape {
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLandscape { width, height } => {
                write!(f, "not landscape ({width}x{height})")
            }
        }
    }
}

/// Result of running the pipeline on one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Display-ready output
    Processed(ProcessedImage),
    /// Source is valid but unsuitable
    Rejected(Rejection),
}

static PALETTE_WARNED: AtomicBool = AtomicBool::new(false);

/// Runs the transform chain with fixed options.
#[derive(Clone)]
pub struct Transformer {
    options: TransformOptions,
    ditherer: Arc<dyn Ditherer>,
}

impl Transformer {
    /// Transformer using the built-in ditherer
    pub fn new(options: TransformOptions) -> Self {
        Self::with_ditherer(options, Arc::new(ErrorDiffusion))
    }

    /// Transformer using a specific ditherer
    pub fn with_ditherer(options: TransformOptions, ditherer: Arc<dyn Ditherer>) -> Self {
        Self { options, ditherer }
    }

    /// Run the pipeline on the blocking pool.
    pub async fn transform_async(&self, bytes: Vec<u8>) -> Result<Outcome> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.transform(&bytes)).await?
    }

    /// Run the pipeline on the current thread.
    pub fn transform(&self, bytes: &[u8]) -> Result<Outcome> {
        let opts = &self.options;
        let source = decode(bytes)?;
        let (src_w, src_h) = (source.width(), source.height());

        if opts.landscape_only && src_h >= src_w {
            return Ok(Outcome::Rejected(Rejection::NotLandscape {
                width: src_w,
                height: src_h,
            }));
        }

        let raster = crop::resize_cover(&source, opts.width, opts.height, opts.crop);
        drop(source);

        let dithered = self.ditherer.dither(&raster, ColorScheme::Mono, opts.dither);

        let expected = opts.width as usize * opts.height as usize;
        if dithered.indices.len() != expected {
            return Err(Error::DitherMismatch {
                width: opts.width,
                height: opts.height,
                expected,
                actual: dithered.indices.len(),
            });
        }
        check_palette_convention(&dithered);

        // Index 1 is "on" (white), everything else "off"
        let gray: Vec<u8> = dithered
            .indices
            .iter()
            .map(|i| if *i == 1 { 255 } else { 0 })
            .collect();

        let bytes = encode::encode_mono_png(&gray, opts.width, opts.height)?;
        Ok(Outcome::Processed(ProcessedImage::png(
            bytes,
            opts.width,
            opts.height,
        )))
    }
}

/// Decode and apply EXIF orientation so width/height are as displayed
fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// The index→intensity mapping assumes index 1 is the brighter entry.
/// Warn once if the ditherer's palette says otherwise.
fn check_palette_convention(dithered: &Dithered) {
    let brightness = |c: &[u8; 3]| c.iter().map(|v| u32::from(*v)).sum::<u32>();
    let holds = match dithered.palette.as_slice() {
        [off, on] => brightness(on) > brightness(off),
        _ => false,
    };
    if !holds && !PALETTE_WARNED.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            palette = ?dithered.palette,
            "Ditherer palette does not match the index 1 = white convention; output may be inverted"
        );
    }
}
