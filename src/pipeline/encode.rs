//! 1-bit indexed PNG encoding

use crate::error::Result;

/// Palette written into every output image: index 0 black, index 1 white
const MONO_PALETTE: [u8; 6] = [0, 0, 0, 255, 255, 255];

/// Encode an 8-bit single-channel buffer as a 1-bit, 2-color PNG.
///
/// Pixels at or above mid-grey map to the white entry. Compression is set
/// to the slowest, smallest setting since the output is served many times.
pub fn encode_mono_png(gray: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let packed = pack_bits(gray, width as usize, height as usize);

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::One);
        encoder.set_palette(&MONO_PALETTE[..]);
        encoder.set_compression(png::Compression::Best);
        encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&packed)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Pack one byte per pixel into MSB-first bit rows, each row byte-aligned
fn pack_bits(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    let row_bytes = width.div_ceil(8);
    let mut packed = vec![0u8; row_bytes * height];
    for (y, row) in gray.chunks_exact(width).take(height).enumerate() {
        for (x, value) in row.iter().enumerate() {
            if *value >= 128 {
                packed[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    packed
}
