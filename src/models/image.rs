//! Display-ready output of the transform pipeline

/// An encoded, display-ready image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ProcessedImage {
    /// Wrap PNG bytes
    pub const fn png(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            mime_type: "image/png",
            width,
            height,
        }
    }
}
