use crate::metadata::cache::MetadataCache;
use crate::metadata::fetcher::MetadataFetcher;
use crate::metadata::types::Extraction;

/// Entry point shared by the HTTP and CLI boundaries: the fetcher, optionally
/// fronted by the cache.
pub struct MetadataService {
    fetcher: MetadataFetcher,
    cache: Option<MetadataCache>,
}

impl MetadataService {
    pub fn new(fetcher: MetadataFetcher, cache: Option<MetadataCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn uncached(fetcher: MetadataFetcher) -> Self {
        Self::new(fetcher, None)
    }

    /// Check the cache, fetch on a miss, remember live and fallback results.
    ///
    /// Concurrent misses for the same URL each fetch independently.
    pub async fn fetch(&self, url: &str) -> Extraction {
        let Some(cache) = &self.cache else {
            return self.fetcher.fetch(url).await;
        };

        if let Some(metadata) = cache.get(url) {
            return Extraction::Cached { metadata };
        }

        let extraction = self.fetcher.fetch(url).await;
        if extraction.is_cacheable() {
            cache.put(url, extraction.metadata().clone());
        }

        extraction
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map(MetadataCache::len).unwrap_or(0)
    }
}
