pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod proxy;
pub mod server;
pub mod session;
pub mod youtube;

use std::fmt;

use url::Url;

pub use error::{Error, Result};

/// Language every preference list falls back to
pub const FALLBACK_LANG: &str = "en";

/// Base used to resolve scheme-less inputs such as `https//www.youtube.com/watch?v=ID`
const RELATIVE_BASE: &str = "https://www.youtube.com/";

/// A single captioned segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Caption track fetched for a video
#[derive(Debug, Clone)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub is_generated: bool,
    pub segments: Vec<Segment>,
}

/// A video identifier extracted from a YouTube URL.
///
/// Only non-emptiness is guaranteed; anything else is left for YouTube to reject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of languages to try, most preferred first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreference(Vec<String>);

impl LanguagePreference {
    /// `en` stays alone, anything else gets `en` appended as a fallback
    pub fn from_requested(lang: &str) -> Self {
        if lang == FALLBACK_LANG {
            Self(vec![FALLBACK_LANG.to_string()])
        } else {
            Self(vec![lang.to_string(), FALLBACK_LANG.to_string()])
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.0
    }

    /// Value for the `Accept-Language` header
    pub fn accept_language(&self) -> String {
        self.0.join(",")
    }
}

/// Extract the video ID from a watch URL (`?v=ID`) or a short link (`youtu.be/ID`)
pub fn resolve_video_id(input: &str) -> Result<VideoId> {
    let invalid = || Error::InvalidUrl(input.to_string());

    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(input))
            .map_err(|_| invalid())?,
        Err(_) => return Err(invalid()),
    };

    let id = if url.host_str() == Some("youtu.be") {
        url.path().trim_start_matches('/').to_string()
    } else {
        url.query_pairs()
            .find(|(key, value)| key == "v" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
            .ok_or_else(invalid)?
    };

    if id.is_empty() {
        return Err(invalid());
    }
    Ok(VideoId(id))
}
