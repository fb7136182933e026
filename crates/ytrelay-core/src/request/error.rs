//! Rejection reasons for malformed request lines.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no video URL provided")]
    MissingUrl,
    #[error("no destination node provided")]
    MissingDestination,
    /// A fourth field was present; trailing garbage is rejected, not ignored.
    #[error("too many arguments: expected at most 3 (destination, url, quality)")]
    TooManyArguments,
    #[error("could not parse quality {0:?} (expected best, worst or bestaudio)")]
    UnknownQuality(String),
}
