//! Request lines: `<destination> <url> [<quality>]`.
//!
//! One line of the intake queue becomes one [`Request`]. Parsing is strict:
//! missing fields, unknown quality tokens and extra fields are all errors.

mod error;
mod quality;

pub use error::ParseError;
pub use quality::Quality;

use std::fmt;
use std::str::FromStr;

/// One download job as submitted on the queue. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Remote video location. Syntax is checked later by the executor.
    pub url: String,
    /// NNCP node that receives the file and any notifications.
    pub destination: String,
    pub quality: Quality,
}

impl Request {
    pub fn new(destination: impl Into<String>, url: impl Into<String>, quality: Quality) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            quality,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.destination, self.url)?;
        if self.quality != Quality::Medium {
            write!(f, " {}", self.quality.token())?;
        }
        Ok(())
    }
}

impl FromStr for Request {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)
    }
}

/// Parses one queue line into a [`Request`].
///
/// Fields are whitespace-separated and trimmed. The URL is checked before the
/// destination, so a blank line reports a missing URL.
///
/// # Examples
///
/// - `"nodeA https://example.com/v best"` → `Request { destination: "nodeA", url: "https://example.com/v", quality: Best }`
/// - `"nodeA https://example.com/v"` → quality `Medium`
pub fn parse_line(line: &str) -> Result<Request, ParseError> {
    let mut fields = line.split_whitespace();
    let destination = fields.next().unwrap_or_default();
    let url = fields.next().unwrap_or_default();
    let quality_token = fields.next().unwrap_or_default();
    if fields.next().is_some() {
        return Err(ParseError::TooManyArguments);
    }

    if url.is_empty() {
        return Err(ParseError::MissingUrl);
    }
    if destination.is_empty() {
        return Err(ParseError::MissingDestination);
    }
    let quality = Quality::resolve(quality_token)?;

    Ok(Request::new(destination, url, quality))
}
