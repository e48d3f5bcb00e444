use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("couldn't find a video ID from the provided URL: {0}.")]
    InvalidUrl(String),

    #[error("request to YouTube failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube returned {status} for the {what} of video {video_id}")]
    HttpStatus {
        video_id: String,
        what: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("YouTube is blocking requests from this IP (video {0})")]
    IpBlocked(String),

    #[error("YouTube asked to confirm this is not a bot (video {0})")]
    RequestBlocked(String),

    #[error("video {0} is age restricted")]
    AgeRestricted(String),

    #[error("video {0} is no longer available")]
    VideoUnavailable(String),

    #[error("video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("no transcript found for video {video_id} in {requested:?} (available: {available:?})")]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("could not parse YouTube data for video {0}")]
    DataUnparsable(String),

    #[error("failed to get past the consent page for video {0}")]
    ConsentCookie(String),

    #[error("video {0} requires a PO token to fetch captions")]
    PoTokenRequired(String),

    #[error("error parsing caption XML: {0}")]
    CaptionXml(String),

    #[error("invalid proxy configuration: {0}")]
    Proxy(String),
}

impl Error {
    /// Whether the failure came from talking to YouTube rather than from the input
    pub fn is_upstream(&self) -> bool {
        !matches!(self, Error::InvalidUrl(_) | Error::Proxy(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
