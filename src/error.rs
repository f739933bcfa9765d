//! Domain-specific error types for the beam control protocol.
//!
//! All fallible operations return `Result<T, BeamError>`.
//! No panics on invalid input — every error is typed and recoverable, and
//! none of them may cross the Hub/Engine/Resolver boundary as a crash.

use thiserror::Error;

/// The canonical error type for the beam control library.
#[derive(Debug, Error)]
pub enum BeamError {
    // ── Color input validation ───────────────────────────────────
    /// The requested color space id is not registered.
    #[error("unknown color space: {0}")]
    UnknownSpace(String),

    /// The space does not accept input in the requested mode.
    #[error("input mode {mode} is not available for space {space}")]
    UnsupportedMode { space: String, mode: String },

    /// A hex string was not 3 or 6 hex digits (with optional leading `#`).
    #[error("invalid hex color {0:?}: expected 3 or 6 hex digits")]
    InvalidHex(String),

    /// A numeric-mode input did not supply every component.
    #[error("missing component {label}: expected {expected} values, got {actual}")]
    MissingComponent {
        label: &'static str,
        expected: usize,
        actual: usize,
    },

    /// More components were supplied than the space defines.
    #[error("too many components: expected {expected}, got {actual}")]
    TooManyComponents { expected: usize, actual: usize },

    /// A component did not parse as a finite number.
    #[error("component {label} is not a number: {raw:?}")]
    InvalidComponent { label: &'static str, raw: String },

    /// A component fell outside the range the space declares for the mode.
    #[error("component {label} out of range: {value} (allowed {min}-{max})")]
    ComponentOutOfRange {
        label: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A conversion produced NaN or an infinity in the pivot space.
    #[error("conversion for {space} produced a non-finite value")]
    NonFinitePivot { space: String },

    // ── Command validation ───────────────────────────────────────
    /// A display command failed shape validation.
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),

    // ── Templates ────────────────────────────────────────────────
    /// The template id is not known to the resolver's store.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Template content could not be fetched. The cache entry is evicted,
    /// so a later request retries from scratch.
    #[error("failed to load template {id}: {reason}")]
    TemplateLoad { id: String, reason: String },

    // ── Serialization ────────────────────────────────────────────
    /// Encoding or decoding of a wire message failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for BeamError {
    fn from(e: serde_json::Error) -> Self {
        BeamError::Encoding(e.to_string())
    }
}
