//! Candidate image URLs produced by album discovery

use serde::{Deserialize, Serialize};

/// A discovered image URL, with dimensions when the discovery strategy
/// reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateUrl {
    /// Base URL of the image on the album host
    pub url: String,
    /// Width reported at discovery time
    pub width: Option<u32>,
    /// Height reported at discovery time
    pub height: Option<u32>,
}

/// Orientation of a candidate as far as discovery metadata can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Strictly wider than tall
    Landscape,
    /// Taller than wide, or square
    PortraitOrSquare,
    /// No dimensions reported
    Unknown,
}

impl CandidateUrl {
    /// Candidate with reported dimensions
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Candidate without dimensions (heavy strategy results)
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
        }
    }

    /// Orientation from the reported dimensions
    pub const fn orientation(&self) -> Orientation {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h >= w => Orientation::PortraitOrSquare,
            (Some(_), Some(_)) => Orientation::Landscape,
            _ => Orientation::Unknown,
        }
    }
}

impl std::fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation() {
        assert_eq!(
            CandidateUrl::new("a", 200, 100).orientation(),
            Orientation::Landscape
        );
        assert_eq!(
            CandidateUrl::new("a", 100, 200).orientation(),
            Orientation::PortraitOrSquare
        );
        assert_eq!(
            CandidateUrl::new("a", 100, 100).orientation(),
            Orientation::PortraitOrSquare
        );
        assert_eq!(CandidateUrl::bare("a").orientation(), Orientation::Unknown);
    }
}
