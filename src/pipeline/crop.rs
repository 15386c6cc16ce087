//! Cover-fit resize and crop anchoring.
//!
//! The source is scaled so it covers the target box, then cropped to it.
//! Exactly one axis has slack after scaling; the crop strategy decides
//! where along that axis the window sits.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Where the crop window is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CropStrategy {
    /// Centered on both axes
    #[default]
    Center,
    /// North
    Top,
    /// North-east
    TopRight,
    /// East
    Right,
    /// South-east
    BottomRight,
    /// South
    Bottom,
    /// South-west
    BottomLeft,
    /// West
    Left,
    /// North-west
    TopLeft,
    /// Window with the most edges, saturation and skin tones
    Attention,
    /// Window with the highest luminance entropy
    Entropy,
}

impl CropStrategy {
    /// All strategies
    pub const fn all() -> &'static [Self] {
        &[
            Self::Center,
            Self::Top,
            Self::TopRight,
            Self::Right,
            Self::BottomRight,
            Self::Bottom,
            Self::BottomLeft,
            Self::Left,
            Self::TopLeft,
            Self::Attention,
            Self::Entropy,
        ]
    }

    /// Canonical configuration name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Top => "top",
            Self::TopRight => "right top",
            Self::Right => "right",
            Self::BottomRight => "right bottom",
            Self::Bottom => "bottom",
            Self::BottomLeft => "left bottom",
            Self::Left => "left",
            Self::TopLeft => "left top",
            Self::Attention => "attention",
            Self::Entropy => "entropy",
        }
    }

    /// Parse from string (position names and compass names)
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "center" | "centre" => Some(Self::Center),
            "top" | "north" => Some(Self::Top),
            "right top" | "top right" | "northeast" | "north east" => Some(Self::TopRight),
            "right" | "east" => Some(Self::Right),
            "right bottom" | "bottom right" | "southeast" | "south east" => {
                Some(Self::BottomRight)
            }
            "bottom" | "south" => Some(Self::Bottom),
            "left bottom" | "bottom left" | "southwest" | "south west" => Some(Self::BottomLeft),
            "left" | "west" => Some(Self::Left),
            "left top" | "top left" | "northwest" | "north west" => Some(Self::TopLeft),
            "attention" => Some(Self::Attention),
            "entropy" => Some(Self::Entropy),
            _ => None,
        }
    }

    /// Parse a configured name, falling back to center with a warning
    pub fn from_name_or_default(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            tracing::warn!(value = s, "Unknown crop strategy, using center");
            Self::default()
        })
    }
}

impl std::fmt::Display for CropStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Smallest size with the source aspect ratio that covers the target box
pub fn cover_dimensions(width: u32, height: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let (w, h) = (u64::from(width.max(1)), u64::from(height.max(1)));
    let (tw, th) = (u64::from(target_w), u64::from(target_h));
    let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);

    if w * th >= tw * h {
        // Relatively wider than the target: height fits, width overflows
        (clamp((w * th).div_ceil(h).max(tw)), target_h)
    } else {
        (target_w, clamp((h * tw).div_ceil(w).max(th)))
    }
}

/// Scaled cover may overflow the target by at most this factor on its long axis
pub const MAX_COVER_OVERFLOW: u64 = 4;

/// Source region `(x, y, width, height)` worth scaling.
///
/// Extreme panoramas are trimmed first, anchored per `strategy`, so the
/// scaled cover stays within [`MAX_COVER_OVERFLOW`] times the target.
pub fn source_window(
    width: u32,
    height: u32,
    target_w: u32,
    target_h: u32,
    strategy: CropStrategy,
) -> (u32, u32, u32, u32) {
    let (w, h) = (u64::from(width.max(1)), u64::from(height.max(1)));
    let (tw, th) = (u64::from(target_w.max(1)), u64::from(target_h.max(1)));
    let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);

    let keep_w = (h * tw * MAX_COVER_OVERFLOW).div_ceil(th);
    if w > keep_w {
        let slack = clamp(w - keep_w);
        let x = match strategy {
            CropStrategy::Left | CropStrategy::TopLeft | CropStrategy::BottomLeft => 0,
            CropStrategy::Right | CropStrategy::TopRight | CropStrategy::BottomRight => slack,
            _ => slack / 2,
        };
        return (x, 0, clamp(keep_w), height);
    }

    let keep_h = (w * th * MAX_COVER_OVERFLOW).div_ceil(tw);
    if h > keep_h {
        let slack = clamp(h - keep_h);
        let y = match strategy {
            CropStrategy::Top | CropStrategy::TopLeft | CropStrategy::TopRight => 0,
            CropStrategy::Bottom | CropStrategy::BottomLeft | CropStrategy::BottomRight => slack,
            _ => slack / 2,
        };
        return (0, y, width, clamp(keep_h));
    }

    (0, 0, width, height)
}

/// Scale `image` to cover the target box and crop it per `strategy`.
pub fn resize_cover(
    image: &DynamicImage,
    target_w: u32,
    target_h: u32,
    strategy: CropStrategy,
) -> RgbaImage {
    let (x, y, w, h) = source_window(image.width(), image.height(), target_w, target_h, strategy);
    let trimmed;
    let image = if (w, h) == (image.width(), image.height()) {
        image
    } else {
        trimmed = image.crop_imm(x, y, w, h);
        &trimmed
    };

    let (scaled_w, scaled_h) = cover_dimensions(image.width(), image.height(), target_w, target_h);
    let scaled = image
        .resize_exact(scaled_w, scaled_h, FilterType::Lanczos3)
        .to_rgba8();
    let (x, y) = crop_offset(&scaled, target_w, target_h, strategy);
    imageops::crop_imm(&scaled, x, y, target_w, target_h).to_image()
}

/// Top-left corner of the crop window inside the scaled image
pub fn crop_offset(
    scaled: &RgbaImage,
    target_w: u32,
    target_h: u32,
    strategy: CropStrategy,
) -> (u32, u32) {
    let slack_x = scaled.width().saturating_sub(target_w);
    let slack_y = scaled.height().saturating_sub(target_h);

    match strategy {
        CropStrategy::Center => (slack_x / 2, slack_y / 2),
        CropStrategy::Top => (slack_x / 2, 0),
        CropStrategy::TopRight => (slack_x, 0),
        CropStrategy::Right => (slack_x, slack_y / 2),
        CropStrategy::BottomRight => (slack_x, slack_y),
        CropStrategy::Bottom => (slack_x / 2, slack_y),
        CropStrategy::BottomLeft => (0, slack_y),
        CropStrategy::Left => (0, slack_y / 2),
        CropStrategy::TopLeft => (0, 0),
        CropStrategy::Attention => {
            let saliency = saliency_map(scaled);
            smart_offset(scaled, target_w, target_h, slack_x, slack_y, |axis, off| {
                window_sum(&saliency, scaled.width(), scaled.height(), axis, off, target_w, target_h)
            })
        }
        CropStrategy::Entropy => {
            let luma = luma_plane(scaled);
            smart_offset(scaled, target_w, target_h, slack_x, slack_y, |axis, off| {
                window_entropy(&luma, scaled.width(), axis, off, target_w, target_h)
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Pick the best-scoring offset along whichever axis has slack
fn smart_offset(
    scaled: &RgbaImage,
    target_w: u32,
    target_h: u32,
    slack_x: u32,
    slack_y: u32,
    score: impl Fn(Axis, u32) -> f64,
) -> (u32, u32) {
    if slack_x >= slack_y && slack_x > 0 {
        (best_offset(slack_x, |off| score(Axis::X, off)), slack_y / 2)
    } else if slack_y > 0 {
        (slack_x / 2, best_offset(slack_y, |off| score(Axis::Y, off)))
    } else {
        debug_assert!(scaled.width() == target_w && scaled.height() == target_h);
        (0, 0)
    }
}

/// Scan up to 33 evenly spaced offsets; ties go to the one nearest center
fn best_offset(slack: u32, score: impl Fn(u32) -> f64) -> u32 {
    const STEPS: u32 = 32;
    let step = (slack / STEPS).max(1);
    let center = slack / 2;

    let mut best = (center, score(center));
    let mut pos = 0;
    loop {
        let s = score(pos);
        let tie = (s - best.1).abs() <= f64::EPSILON;
        if (s > best.1 && !tie) || (tie && pos.abs_diff(center) < best.0.abs_diff(center)) {
            best = (pos, s);
        }
        if pos == slack {
            break;
        }
        pos = (pos + step).min(slack);
    }
    best.0
}

fn luma_of(p: &image::Rgba<u8>) -> u8 {
    let [r, g, b, _] = p.0;
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

fn luma_plane(img: &RgbaImage) -> Vec<u8> {
    img.pixels().map(luma_of).collect()
}

/// Per-pixel interest: local contrast, saturation and a skin-tone bonus
fn saliency_map(img: &RgbaImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let luma = luma_plane(img);
    let idx = |x: u32, y: u32| y as usize * w as usize + x as usize;

    let mut out = vec![0.0f32; luma.len()];
    for y in 0..h {
        for x in 0..w {
            let l = i32::from(luma[idx(x, y)]);
            let dx = if x + 1 < w { (i32::from(luma[idx(x + 1, y)]) - l).abs() } else { 0 };
            let dy = if y + 1 < h { (i32::from(luma[idx(x, y + 1)]) - l).abs() } else { 0 };

            let [r, g, b, _] = img.get_pixel(x, y).0;
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            let saturation = f32::from(max - min);
            let skin = r > 95 && g > 40 && b > 20 && r > g && r > b && (r - g) > 15;

            out[idx(x, y)] =
                (dx + dy) as f32 + saturation * 0.5 + if skin { 64.0 } else { 0.0 };
        }
    }
    out
}

fn window_sum(
    map: &[f32],
    width: u32,
    height: u32,
    axis: Axis,
    offset: u32,
    target_w: u32,
    target_h: u32,
) -> f64 {
    let (x0, y0, x1, y1) = match axis {
        Axis::X => (offset, 0, offset + target_w, height.min(target_h)),
        Axis::Y => (0, offset, width.min(target_w), offset + target_h),
    };
    let mut total = 0.0f64;
    for y in y0..y1 {
        let row = y as usize * width as usize;
        total += map[row + x0 as usize..row + x1 as usize]
            .iter()
            .map(|v| f64::from(*v))
            .sum::<f64>();
    }
    total
}

fn window_entropy(
    luma: &[u8],
    width: u32,
    axis: Axis,
    offset: u32,
    target_w: u32,
    target_h: u32,
) -> f64 {
    let (x0, y0) = match axis {
        Axis::X => (offset, 0),
        Axis::Y => (0, offset),
    };
    let mut histogram = [0u32; 256];
    for y in y0..y0 + target_h {
        let row = y as usize * width as usize;
        for v in &luma[row + x0 as usize..row + (x0 + target_w) as usize] {
            histogram[*v as usize] += 1;
        }
    }
    let total = f64::from(target_w) * f64::from(target_h);
    histogram
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = f64::from(*c) / total;
            -p * p.log2()
        })
        .sum()
}
