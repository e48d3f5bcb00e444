use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, USER_AGENT as USER_AGENT_HEADER};
use serde::Deserialize;

use crate::{Error, LanguagePreference, Result, Segment, Transcript, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Heading used when the watch page has no `<title>`
pub const DEFAULT_TITLE: &str = "Transcript";

const CONSENT_FORM: &str = "action=\"https://consent.youtube.com/s\"";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern"));
static CONSENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("consent pattern"));
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#).expect("api key pattern"));
static API_KEY_FALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#).expect("api key pattern"));
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<[^>]*>").expect("markup pattern"));

/// Looks up the title of a video
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn fetch_title(&self, video: &VideoId, languages: &LanguagePreference) -> Result<String>;
}

/// Fetches the first caption track matching the preferred languages
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch_transcript(&self, video: &VideoId, languages: &LanguagePreference) -> Result<Transcript>;
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// YouTube access over a shared HTTP client: watch page titles and InnerTube captions
#[derive(Debug, Clone)]
pub struct YouTube {
    client: reqwest::Client,
}

impl YouTube {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn watch_page_request(
        &self,
        video: &VideoId,
        languages: &LanguagePreference,
        consent: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(video.watch_url())
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(ACCEPT_LANGUAGE, languages.accept_language());
        match consent {
            Some(consent) => request.header(COOKIE, format!("CONSENT=YES+{consent}")),
            None => request,
        }
    }

    async fn get_watch_page(
        &self,
        video: &VideoId,
        languages: &LanguagePreference,
        consent: Option<&str>,
    ) -> Result<String> {
        debug!("Fetching watch page: {}", video.watch_url());
        let response = self.watch_page_request(video, languages, consent).send().await?;
        check_status(video, "watch page", response.status())?;
        Ok(response.text().await?)
    }

    /// Watch page HTML, accepting the cookie consent interstitial once if YouTube shows it
    async fn fetch_video_html(&self, video: &VideoId, languages: &LanguagePreference) -> Result<String> {
        let html = self.get_watch_page(video, languages, None).await?;
        if !html.contains(CONSENT_FORM) {
            return Ok(html);
        }

        debug!("Consent page returned for {video}, retrying with consent cookie");
        let consent = extract_consent_value(&html).ok_or_else(|| Error::ConsentCookie(video.to_string()))?;
        let html = self.get_watch_page(video, languages, Some(&consent)).await?;
        if html.contains(CONSENT_FORM) {
            return Err(Error::ConsentCookie(video.to_string()));
        }
        Ok(html)
    }

    async fn fetch_player(&self, video: &VideoId, api_key: &str) -> Result<InnerTubePlayerResponse> {
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video.as_str()
        });

        let response = self.client.post(&player_url).json(&body).send().await?;
        check_status(video, "player", response.status())?;
        response
            .json()
            .await
            .map_err(|_| Error::DataUnparsable(video.to_string()))
    }
}

#[async_trait]
impl TitleSource for YouTube {
    async fn fetch_title(&self, video: &VideoId, languages: &LanguagePreference) -> Result<String> {
        let html = self.get_watch_page(video, languages, None).await?;
        Ok(page_title(&html))
    }
}

#[async_trait]
impl CaptionSource for YouTube {
    async fn fetch_transcript(&self, video: &VideoId, languages: &LanguagePreference) -> Result<Transcript> {
        let html = self.fetch_video_html(video, languages).await?;
        let api_key = extract_api_key(video, &html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        let player = self.fetch_player(video, &api_key).await?;
        let tracks = caption_tracks(video, player)?;
        let track = select_track(video, &tracks, languages)?;
        debug!(
            "Using caption track: lang={} generated={}",
            track.language_code,
            track.is_generated()
        );

        let track_url = track.base_url.replace("&fmt=srv3", "");
        if track_url.contains("&exp=xpe") {
            return Err(Error::PoTokenRequired(video.to_string()));
        }

        let response = self.client.get(&track_url).send().await?;
        check_status(video, "caption track", response.status())?;
        let caption_xml = response.text().await?;
        let segments = parse_caption_xml(&caption_xml)?;

        Ok(Transcript {
            video_id: video.to_string(),
            language: track.language_code.clone(),
            is_generated: track.is_generated(),
            segments,
        })
    }
}

/// 429 means YouTube is throttling this IP; any other non-success status is a plain failure
fn check_status(video: &VideoId, what: &'static str, status: StatusCode) -> Result<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::IpBlocked(video.to_string()));
    }
    if !status.is_success() {
        return Err(Error::HttpStatus {
            video_id: video.to_string(),
            what,
            status,
        });
    }
    Ok(())
}

/// Text of the first `<title>` element, if the page has one
pub fn extract_title(html: &str) -> Option<String> {
    let caps = TITLE_RE.captures(html)?;
    Some(html_escape::decode_html_entities(caps[1].trim()).to_string())
}

/// Heading for the transcript: the page title, or [`DEFAULT_TITLE`] when there is no `<title>`
pub fn page_title(html: &str) -> String {
    extract_title(html).unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

fn extract_consent_value(html: &str) -> Option<String> {
    CONSENT_RE.captures(html).map(|caps| caps[1].to_string())
}

fn extract_api_key(video: &VideoId, html: &str) -> Result<String> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(Error::IpBlocked(video.to_string()));
    }

    if let Some(caps) = API_KEY_RE.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    if let Some(caps) = API_KEY_FALLBACK_RE.captures(html) {
        return Ok(caps[1].to_string());
    }

    Err(Error::DataUnparsable(video.to_string()))
}

fn assert_playable(video: &VideoId, status: Option<&PlayabilityStatus>) -> Result<()> {
    let Some(status) = status else {
        return Ok(());
    };
    let state = status.status.as_deref().unwrap_or("");
    if state == "OK" {
        return Ok(());
    }

    let reason = status.reason.as_deref().unwrap_or("");
    match state {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(Error::RequestBlocked(video.to_string())),
        "LOGIN_REQUIRED" if reason.contains("inappropriate for some users") => {
            Err(Error::AgeRestricted(video.to_string()))
        }
        "ERROR" if reason.contains("unavailable") => Err(Error::VideoUnavailable(video.to_string())),
        _ => Err(Error::VideoUnplayable {
            video_id: video.to_string(),
            reason: reason.to_string(),
        }),
    }
}

fn caption_tracks(video: &VideoId, player: InnerTubePlayerResponse) -> Result<Vec<CaptionTrack>> {
    assert_playable(video, player.playability_status.as_ref())?;

    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(Error::TranscriptsDisabled(video.to_string()));
    }
    Ok(tracks)
}

/// First track in preference order; a manual track beats a generated one of the same language
fn select_track<'a>(
    video: &VideoId,
    tracks: &'a [CaptionTrack],
    languages: &LanguagePreference,
) -> Result<&'a CaptionTrack> {
    for lang in languages.languages() {
        let matching = move || tracks.iter().filter(move |t| &t.language_code == lang);
        if let Some(track) = matching().find(|t| !t.is_generated()).or_else(|| matching().next()) {
            return Ok(track);
        }
    }

    Err(Error::NoTranscriptFound {
        video_id: video.to_string(),
        requested: languages.languages().to_vec(),
        available: tracks.iter().map(|t| t.language_code.clone()).collect(),
    })
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = 0.0;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().unwrap_or(0.0);
                        }
                        _ => {}
                    }
                }
                current = start.map(|start| (start, dur));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                current = None;
            }
            Ok(Event::Text(ref e)) => {
                if let Some((start, duration)) = current.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let decoded = html_escape::decode_html_entities(&raw_text);
                    if !decoded.is_empty() {
                        let text = MARKUP_RE.replace_all(&decoded, "").into_owned();
                        segments.push(Segment { text, start, duration });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::CaptionXml(e.to_string())),
            _ => {}
        }
    }

    Ok(segments)
}
