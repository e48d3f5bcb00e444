use std::sync::Arc;

use log::{debug, info};

use crate::cache::TranscriptCache;
use crate::output::render_markdown;
use crate::proxy::ProxyConfig;
use crate::youtube::{CaptionSource, TitleSource, YouTube};
use crate::{LanguagePreference, Result, VideoId};

/// Shared state for every tool call: one HTTP client, its proxy and the transcript memo
pub struct Session {
    titles: Arc<dyn TitleSource>,
    captions: Arc<dyn CaptionSource>,
    proxy: Option<ProxyConfig>,
    cache: TranscriptCache,
}

impl Session {
    /// Build the HTTP client once, routed through the proxy if one is configured
    pub fn new(proxy: Option<ProxyConfig>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &proxy {
            info!("Using proxy: {proxy:?}");
            builder = proxy.apply(builder)?;
        }
        let youtube = Arc::new(YouTube::new(builder.build()?));
        Ok(Self::with_sources(youtube.clone(), youtube, proxy))
    }

    pub fn with_sources(
        titles: Arc<dyn TitleSource>,
        captions: Arc<dyn CaptionSource>,
        proxy: Option<ProxyConfig>,
    ) -> Self {
        Self {
            titles,
            captions,
            proxy,
            cache: TranscriptCache::new(),
        }
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn cache(&self) -> &TranscriptCache {
        &self.cache
    }

    /// Title heading plus transcript text, fetched at most once per (video, lang)
    pub async fn fetch(&self, video: &VideoId, lang: &str) -> Result<String> {
        self.cache
            .get_or_fetch(video.as_str(), lang, || self.fetch_uncached(video, lang))
            .await
    }

    async fn fetch_uncached(&self, video: &VideoId, lang: &str) -> Result<String> {
        let languages = LanguagePreference::from_requested(lang);
        debug!("Fetching transcript for {video} with languages {:?}", languages.languages());

        let title = self.titles.fetch_title(video, &languages).await?;
        let transcript = self.captions.fetch_transcript(video, &languages).await?;
        debug!(
            "Fetched {} segments for {video} (lang={}, generated={})",
            transcript.segments.len(),
            transcript.language,
            transcript.is_generated
        );

        Ok(render_markdown(&title, &transcript))
    }
}
