//! Artwork resolution: remote icon URIs to locally served bytes.
//!
//! Browse clients cannot always fetch arbitrary remote icons themselves, so
//! item icons are rewritten to point at this server and resolved here:
//!
//! 1. **Mapping**: each remote http(s) icon URI gets a stable local key
//!    derived from the URI (slashes folded to colons).
//! 2. **Fetch**: on first request the remote image is downloaded, bounded by
//!    a fixed timeout after which the attempt is abandoned.
//! 3. **Cache**: successful downloads are kept in memory; repeat requests
//!    are served without touching the network.
//!
//! Every failure mode (timeout, connect error, non-success status) is
//! swallowed and results in "no icon", never a propagated error.

use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;

/// Default bound on a single remote artwork download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A resolved image ready to serve.
#[derive(Debug, Clone)]
pub struct CachedArtwork {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Maps remote icon URIs to local keys and resolves them to cached bytes.
pub struct ArtworkResolver {
    client: reqwest::Client,
    /// local key → remote URI
    uri_map: DashMap<String, String>,
    /// remote URI → downloaded image
    cache: DashMap<String, CachedArtwork>,
}

impl ArtworkResolver {
    /// Creates a resolver with the default 30 second fetch bound.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Creates a resolver with a custom fetch bound (tests use a short one).
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            uri_map: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    /// Derives the local key for a remote URI: slashes fold to colons so the
    /// key is a single path segment.
    pub fn cache_key(uri: &str) -> String {
        uri.replace('/', ":")
    }

    /// Registers a remote URI and returns the local key it is served under.
    /// Registering the same URI twice yields the same key.
    pub fn register(&self, uri: &str) -> String {
        let key = Self::cache_key(uri);
        self.uri_map.insert(key.clone(), uri.to_string());
        key
    }

    /// Returns the remote URI behind a local key, if registered.
    pub fn remote_uri(&self, key: &str) -> Option<String> {
        self.uri_map.get(key).map(|entry| entry.clone())
    }

    /// Resolves a local key to image bytes: cache hit, or a bounded remote
    /// download. `None` for unregistered keys and for every fetch failure.
    pub async fn resolve(&self, key: &str) -> Option<CachedArtwork> {
        let uri = self.remote_uri(key)?;
        if let Some(cached) = self.cache.get(&uri) {
            return Some(cached.clone());
        }
        let artwork = self.fetch(&uri).await?;
        self.cache.insert(uri, artwork.clone());
        Some(artwork)
    }

    /// Number of images currently cached.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&self, uri: &str) -> Option<CachedArtwork> {
        log::debug!("[Artwork] Fetching {uri}");
        let response = match self.client.get(uri).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[Artwork] Fetch failed for {uri}: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            log::warn!(
                "[Artwork] Fetch for {uri} returned status {}",
                response.status()
            );
            return None;
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        match response.bytes().await {
            Ok(bytes) => {
                log::info!("[Artwork] Cached {uri} ({} bytes)", bytes.len());
                Some(CachedArtwork { bytes, content_type })
            }
            Err(e) => {
                log::warn!("[Artwork] Body read failed for {uri}: {e}");
                None
            }
        }
    }
}

impl Default for ArtworkResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_folds_slashes_to_colons() {
        assert_eq!(
            ArtworkResolver::cache_key("https://cdn.example.com/covers/a.jpg"),
            "https:::cdn.example.com:covers:a.jpg"
        );
    }

    #[test]
    fn register_is_idempotent_and_reversible() {
        let resolver = ArtworkResolver::new();
        let key = resolver.register("https://cdn.example.com/a.jpg");
        assert_eq!(resolver.register("https://cdn.example.com/a.jpg"), key);
        assert_eq!(
            resolver.remote_uri(&key).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[tokio::test]
    async fn resolve_of_unregistered_key_is_none() {
        let resolver = ArtworkResolver::new();
        assert!(resolver.resolve("no:such:key").await.is_none());
    }

    #[tokio::test]
    async fn resolve_serves_cache_hits_without_fetching() {
        let resolver = ArtworkResolver::new();
        // Unroutable URI; a network fetch would fail, so a successful
        // resolve proves the cache short-circuits.
        let uri = "http://192.0.2.1/never.jpg";
        let key = resolver.register(uri);
        resolver.cache.insert(
            uri.to_string(),
            CachedArtwork {
                bytes: Bytes::from_static(b"png-bytes"),
                content_type: "image/png".to_string(),
            },
        );

        let artwork = resolver.resolve(&key).await.unwrap();
        assert_eq!(artwork.bytes.as_ref(), b"png-bytes");
        assert_eq!(artwork.content_type, "image/png");
        assert_eq!(resolver.cached_count(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_swallowed() {
        let resolver = ArtworkResolver::with_timeout(Duration::from_millis(50));
        let key = resolver.register("http://127.0.0.1:1/nothing.jpg");
        assert!(resolver.resolve(&key).await.is_none());
        assert_eq!(resolver.cached_count(), 0);
    }
}
