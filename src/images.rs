//! Avatar and custom emoji downloads, embedded as `data:` URIs.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use imagesize::ImageType;
use lru::LruCache;
use parking_lot::Mutex;

use crate::error::FetchError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.as_ref().fetch(url)
    }
}

pub struct HttpImageSource {
    agent: ureq::Agent,
}

impl HttpImageSource {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::new(url, e))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| FetchError::new(url, e))
    }
}

type Shared = Result<Arc<str>, FetchError>;

struct CacheEntry {
    data_uri: Arc<str>,
    fetched_at: Instant,
}

/// Bounded LRU cache of data URIs keyed by source URL.
///
/// Entries expire after `ttl`. Concurrent requests for the same uncached
/// URL share a single download and its result; failures are handed to
/// every waiter but are not cached.
pub struct ImageCache<S> {
    source: S,
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<OnceLock<Shared>>>>,
}

impl<S: ImageSource> ImageCache<S> {
    pub fn new(source: S, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_uri(&self, url: &str) -> Result<Arc<str>, FetchError> {
        if let Some(hit) = self.cached(url) {
            return Ok(hit);
        }

        let slot = {
            let mut in_flight = self.in_flight.lock();
            // A download may have finished since the first check.
            if let Some(hit) = self.cached(url) {
                return Ok(hit);
            }
            Arc::clone(in_flight.entry(url.to_string()).or_default())
        };

        let result = slot.get_or_init(|| self.download(url)).clone();

        // Publish before retiring the slot so late callers find one or the other.
        if let Ok(data_uri) = &result {
            self.entries.lock().put(
                url.to_string(),
                CacheEntry {
                    data_uri: Arc::clone(data_uri),
                    fetched_at: Instant::now(),
                },
            );
        }
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(url)
            .is_some_and(|current| Arc::ptr_eq(current, &slot))
        {
            in_flight.remove(url);
        }

        result
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn cached(&self, url: &str) -> Option<Arc<str>> {
        let mut entries = self.entries.lock();
        let hit = entries
            .get(url)
            .map(|entry| (entry.fetched_at.elapsed() < self.ttl, Arc::clone(&entry.data_uri)));
        match hit {
            Some((true, data_uri)) => Some(data_uri),
            Some((false, _)) => {
                entries.pop(url);
                None
            }
            None => None,
        }
    }

    fn download(&self, url: &str) -> Shared {
        tracing::debug!(url, "fetching image");
        let bytes = self.source.fetch(url)?;
        Ok(to_data_uri(&bytes).into())
    }
}

fn mime_type(bytes: &[u8]) -> &'static str {
    match imagesize::image_type(bytes) {
        Ok(ImageType::Gif) => "image/gif",
        Ok(ImageType::Jpeg) => "image/jpeg",
        Ok(ImageType::Webp) => "image/webp",
        _ => "image/png",
    }
}

pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type(bytes), STANDARD.encode(bytes))
}
