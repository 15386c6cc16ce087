//! Application state shared across all request handlers.

use crate::pregen::Pregenerator;

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owner of the served artifact
    pub pregen: Pregenerator,
}

impl AppState {
    /// Create the handler state
    pub const fn new(pregen: Pregenerator) -> Self {
        Self { pregen }
    }
}
