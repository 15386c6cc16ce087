//! Data models for inkalbum

mod album;
mod candidate;
mod image;

pub use album::AlbumMetadata;
pub use candidate::{CandidateUrl, Orientation};
pub use image::ProcessedImage;
