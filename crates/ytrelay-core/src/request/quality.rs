//! Quality tokens and their youtube-dl format selectors.

use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// Fetch-quality tier requested for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Best,
    Worst,
    /// Let the fetch tool pick its own default format.
    #[default]
    Medium,
    BestAudio,
}

impl Quality {
    /// Every variant, for exhaustive checks over the token and selector tables.
    pub const ALL: [Quality; 4] = [
        Quality::Best,
        Quality::Worst,
        Quality::Medium,
        Quality::BestAudio,
    ];

    /// Resolves a request token. Only the empty token maps to `Medium`;
    /// anything unrecognized is an error rather than a silent default.
    pub fn resolve(token: &str) -> Result<Self, ParseError> {
        match token {
            "best" => Ok(Quality::Best),
            "worst" => Ok(Quality::Worst),
            "bestaudio" => Ok(Quality::BestAudio),
            "" => Ok(Quality::Medium),
            other => Err(ParseError::UnknownQuality(other.to_string())),
        }
    }

    /// Format selector passed to the fetch tool via `-f`. Empty for `Medium`,
    /// in which case the flag must be left out entirely.
    pub fn render(self) -> &'static str {
        match self {
            Quality::Best => "bestvideo+bestaudio",
            Quality::Worst => "worstvideo+worstaudio",
            Quality::Medium => "",
            Quality::BestAudio => "bestaudio",
        }
    }

    /// `Some(selector)` when an explicit `-f` argument is needed.
    pub fn format_selector(self) -> Option<&'static str> {
        Some(self.render()).filter(|s| !s.is_empty())
    }

    /// Token accepted by [`Quality::resolve`] for this variant.
    pub fn token(self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::Worst => "worst",
            Quality::Medium => "",
            Quality::BestAudio => "bestaudio",
        }
    }
}

impl FromStr for Quality {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::resolve(s)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Medium => write!(f, "(default)"),
            other => write!(f, "{}", other.token()),
        }
    }
}
