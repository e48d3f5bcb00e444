use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use tokio::sync::OnceCell;

use crate::Result;

type CacheKey = (String, String);

/// In-memory transcript memo keyed by (video id, language).
///
/// Entries live as long as the cache. Concurrent lookups of the same key share
/// one fetch; a failed fetch drops the key so only stored transcripts take up room.
#[derive(Debug, Default)]
pub struct TranscriptCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<String>>>>,
}

impl TranscriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for the key, running `fetch` only if nobody has stored one yet
    pub async fn get_or_fetch<F, Fut>(&self, video_id: &str, lang: &str, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let cell = self.cell(video_id, lang);
        if let Some(hit) = cell.get() {
            debug!("Cache hit: {video_id} ({lang})");
            return Ok(hit.clone());
        }

        match cell.get_or_try_init(fetch).await {
            Ok(value) => Ok(value.clone()),
            Err(e) => {
                self.discard_empty(video_id, lang, &cell);
                Err(e)
            }
        }
    }

    /// Number of keys holding a transcript
    pub fn len(&self) -> usize {
        self.lock().values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, video_id: &str, lang: &str) -> Arc<OnceCell<String>> {
        self.lock()
            .entry((video_id.to_string(), lang.to_string()))
            .or_default()
            .clone()
    }

    /// Remove a key whose fetch failed, unless another caller is still waiting on it
    fn discard_empty(&self, video_id: &str, lang: &str, cell: &Arc<OnceCell<String>>) {
        let mut entries = self.lock();
        let key = (video_id.to_string(), lang.to_string());
        let unused = entries.get(&key).is_some_and(|held| {
            Arc::ptr_eq(held, cell) && !cell.initialized() && Arc::strong_count(cell) == 2
        });
        if unused {
            entries.remove(&key);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<OnceCell<String>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_lookup_is_cached() {
        let cache = TranscriptCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let value = cache
                .get_or_fetch("abc", "en", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok("# Title\nline".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "# Title\nline");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_include_language() {
        let cache = TranscriptCache::new();
        let en = cache.get_or_fetch("abc", "en", || async { Ok("en".to_string()) }).await.unwrap();
        let ja = cache.get_or_fetch("abc", "ja", || async { Ok("ja".to_string()) }).await.unwrap();
        assert_eq!(en, "en");
        assert_eq!(ja, "ja");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = TranscriptCache::new();
        let err = cache
            .get_or_fetch("abc", "en", || async { Err(Error::TranscriptsDisabled("abc".to_string())) })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert!(cache.lock().is_empty());

        let value = cache.get_or_fetch("abc", "en", || async { Ok("later".to_string()) }).await.unwrap();
        assert_eq!(value, "later");
    }

    #[tokio::test]
    async fn test_failed_keys_do_not_accumulate() {
        let cache = TranscriptCache::new();
        for i in 0..100 {
            let video_id = format!("missing{i}");
            let result = cache
                .get_or_fetch(&video_id, "en", || async { Err(Error::VideoUnavailable("missing".to_string())) })
                .await;
            assert!(result.is_err());
        }
        assert_eq!(cache.lock().len(), 0);

        cache.get_or_fetch("abc", "en", || async { Ok("kept".to_string()) }).await.unwrap();
        assert_eq!(cache.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = TranscriptCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("shared".to_string())
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("abc", "en", fetch),
            cache.get_or_fetch("abc", "en", fetch),
            cache.get_or_fetch("abc", "en", fetch),
        );
        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(c.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
