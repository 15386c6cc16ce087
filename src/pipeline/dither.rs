//! Reduction to a two-entry palette.
//!
//! Error diffusion walks the image left to right, top to bottom, and pushes
//! each pixel's quantization error onto unvisited neighbours according to a
//! kernel. Everything here is deterministic.

use image::RgbaImage;

/// Target palette family. Only monochrome panels are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    /// Black and white
    #[default]
    Mono,
}

impl ColorScheme {
    /// Palette entries, index order
    pub const fn palette(self) -> &'static [[u8; 3]] {
        match self {
            Self::Mono => &[[0, 0, 0], [255, 255, 255]],
        }
    }
}

/// Dithering algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DitherMode {
    /// Plain threshold
    None,
    /// 4x4 Bayer matrix
    Ordered,
    /// Floyd-Steinberg
    FloydSteinberg,
    /// Atkinson (diffuses 3/4 of the error)
    Atkinson,
    /// Burkes
    #[default]
    Burkes,
    /// Stucki
    Stucki,
    /// Sierra (three-row)
    Sierra,
    /// Sierra Lite
    SierraLite,
    /// Jarvis, Judice and Ninke
    JarvisJudiceNinke,
}

impl DitherMode {
    /// All modes
    pub const fn all() -> &'static [Self] {
        &[
            Self::None,
            Self::Ordered,
            Self::FloydSteinberg,
            Self::Atkinson,
            Self::Burkes,
            Self::Stucki,
            Self::Sierra,
            Self::SierraLite,
            Self::JarvisJudiceNinke,
        ]
    }

    /// Canonical configuration name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ordered => "ordered",
            Self::FloydSteinberg => "floyd-steinberg",
            Self::Atkinson => "atkinson",
            Self::Burkes => "burkes",
            Self::Stucki => "stucki",
            Self::Sierra => "sierra",
            Self::SierraLite => "sierra-lite",
            Self::JarvisJudiceNinke => "jarvis-judice-ninke",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "none" | "threshold" => Some(Self::None),
            "ordered" | "bayer" => Some(Self::Ordered),
            "floyd_steinberg" | "floyd" => Some(Self::FloydSteinberg),
            "atkinson" => Some(Self::Atkinson),
            "burkes" => Some(Self::Burkes),
            "stucki" => Some(Self::Stucki),
            "sierra" => Some(Self::Sierra),
            "sierra_lite" => Some(Self::SierraLite),
            "jarvis_judice_ninke" | "jarvis" | "jjn" => Some(Self::JarvisJudiceNinke),
            _ => None,
        }
    }

    /// Parse a configured name, falling back to the default with a warning
    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            let fallback = Self::default();
            tracing::warn!(value = s, fallback = fallback.name(), "Unknown dither mode");
            fallback
        })
    }

    /// Diffusion kernel as `(dx, dy, weight)` plus divisor
    fn kernel(self) -> Option<(&'static [(i32, i32, f32)], f32)> {
        match self {
            Self::None | Self::Ordered => None,
            Self::FloydSteinberg => Some((
                &[(1, 0, 7.0), (-1, 1, 3.0), (0, 1, 5.0), (1, 1, 1.0)],
                16.0,
            )),
            Self::Atkinson => Some((
                &[
                    (1, 0, 1.0),
                    (2, 0, 1.0),
                    (-1, 1, 1.0),
                    (0, 1, 1.0),
                    (1, 1, 1.0),
                    (0, 2, 1.0),
                ],
                8.0,
            )),
            Self::Burkes => Some((
                &[
                    (1, 0, 8.0),
                    (2, 0, 4.0),
                    (-2, 1, 2.0),
                    (-1, 1, 4.0),
                    (0, 1, 8.0),
                    (1, 1, 4.0),
                    (2, 1, 2.0),
                ],
                32.0,
            )),
            Self::Stucki => Some((
                &[
                    (1, 0, 8.0),
                    (2, 0, 4.0),
                    (-2, 1, 2.0),
                    (-1, 1, 4.0),
                    (0, 1, 8.0),
                    (1, 1, 4.0),
                    (2, 1, 2.0),
                    (-2, 2, 1.0),
                    (-1, 2, 2.0),
                    (0, 2, 4.0),
                    (1, 2, 2.0),
                    (2, 2, 1.0),
                ],
                42.0,
            )),
            Self::Sierra => Some((
                &[
                    (1, 0, 5.0),
                    (2, 0, 3.0),
                    (-2, 1, 2.0),
                    (-1, 1, 4.0),
                    (0, 1, 5.0),
                    (1, 1, 4.0),
                    (2, 1, 2.0),
                    (-1, 2, 2.0),
                    (0, 2, 3.0),
                    (1, 2, 2.0),
                ],
                32.0,
            )),
            Self::SierraLite => Some((&[(1, 0, 2.0), (-1, 1, 1.0), (0, 1, 1.0)], 4.0)),
            Self::JarvisJudiceNinke => Some((
                &[
                    (1, 0, 7.0),
                    (2, 0, 5.0),
                    (-2, 1, 3.0),
                    (-1, 1, 5.0),
                    (0, 1, 7.0),
                    (1, 1, 5.0),
                    (2, 1, 3.0),
                    (-2, 2, 1.0),
                    (-1, 2, 3.0),
                    (0, 2, 5.0),
                    (1, 2, 3.0),
                    (2, 2, 1.0),
                ],
                48.0,
            )),
        }
    }
}

impl std::fmt::Display for DitherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Palette-indexed output of a ditherer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dithered {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// One palette index per pixel, row-major
    pub indices: Vec<u8>,
    /// Palette the indices refer to
    pub palette: Vec<[u8; 3]>,
}

/// Anything that can reduce an RGBA raster to palette indices.
pub trait Ditherer: Send + Sync {
    /// Dither `image` to the palette of `scheme` using `mode`.
    fn dither(&self, image: &RgbaImage, scheme: ColorScheme, mode: DitherMode) -> Dithered;
}

/// Built-in error-diffusion and ordered ditherer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorDiffusion;

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Perceived brightness, alpha composited over white
fn luminance(p: &image::Rgba<u8>) -> f32 {
    let [r, g, b, a] = p.0;
    let l = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    let alpha = f32::from(a) / 255.0;
    l.mul_add(alpha, 255.0 * (1.0 - alpha))
}

fn palette_luminance(c: [u8; 3]) -> f32 {
    0.299 * f32::from(c[0]) + 0.587 * f32::from(c[1]) + 0.114 * f32::from(c[2])
}

/// Nearest palette entry by luminance
fn nearest(levels: &[f32], value: f32) -> usize {
    levels
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
        .map_or(0, |(i, _)| i)
}

impl Ditherer for ErrorDiffusion {
    fn dither(&self, image: &RgbaImage, scheme: ColorScheme, mode: DitherMode) -> Dithered {
        let (width, height) = image.dimensions();
        let palette = scheme.palette().to_vec();
        let levels: Vec<f32> = palette.iter().map(|c| palette_luminance(*c)).collect();
        let mut values: Vec<f32> = image.pixels().map(luminance).collect();
        let mut indices = vec![0u8; values.len()];
        let (w, h) = (width as usize, height as usize);

        match mode.kernel() {
            None => {
                for y in 0..h {
                    for x in 0..w {
                        let i = y * w + x;
                        let value = if mode == DitherMode::Ordered {
                            // Shift around mid-grey by the Bayer threshold
                            let t = (f32::from(BAYER_4X4[y % 4][x % 4]) + 0.5) / 16.0;
                            values[i] + (0.5 - t) * 255.0
                        } else {
                            values[i]
                        };
                        indices[i] = nearest(&levels, value) as u8;
                    }
                }
            }
            Some((kernel, divisor)) => {
                for y in 0..h {
                    for x in 0..w {
                        let i = y * w + x;
                        let old = values[i];
                        let idx = nearest(&levels, old);
                        indices[i] = idx as u8;
                        let error = old - levels[idx];
                        if error == 0.0 {
                            continue;
                        }
                        for &(dx, dy, weight) in kernel {
                            let nx = x as i64 + i64::from(dx);
                            let ny = y + dy as usize;
                            if nx < 0 || nx >= w as i64 || ny >= h {
                                continue;
                            }
                            values[ny * w + nx as usize] += error * weight / divisor;
                        }
                    }
                }
            }
        }

        Dithered {
            width,
            height,
            indices,
            palette,
        }
    }
}
