//! Embedding provider trait and the caching client the pipeline calls.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::analyzer::QueryAnalysis;
use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (OpenAI, local models,
/// test doubles) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Short name used in logs and errors.
    fn name(&self) -> &str;
}

/// Caching front for an [`EmbeddingProvider`] that never fails.
///
/// Results are cached by exact input text in a bounded LRU. Provider errors
/// are logged and reported as an empty vector, which callers treat as "no
/// embedding". Failures are not cached, so the next request retries.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingClient {
    /// Wrap `provider` with a cache holding at most `capacity` embeddings.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { provider, cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Embed `text`, returning an empty vector on any failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if text.is_empty() {
            return Vec::new();
        }
        if let Some(hit) = self.cache.lock().await.get(text) {
            debug!(text_len = text.len(), "embedding cache hit");
            return hit.clone();
        }

        match self.provider.embed(text).await {
            Ok(embedding) if !embedding.is_empty() => {
                self.cache.lock().await.put(text.to_string(), embedding.clone());
                embedding
            }
            Ok(_) => {
                error!(provider = self.provider.name(), "provider returned an empty embedding");
                Vec::new()
            }
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "embedding failed");
                Vec::new()
            }
        }
    }

    /// Embed the query with the analysis keywords and hints appended.
    ///
    /// Embeds the bare query when there is nothing to append.
    pub async fn enhance_and_embed(&self, query: &str, analysis: &QueryAnalysis) -> Vec<f32> {
        let terms = analysis.expansion_terms();
        if terms.is_empty() {
            self.embed(query).await
        } else {
            self.embed(&format!("{query} {}", terms.join(" "))).await
        }
    }

    /// Number of embeddings currently cached.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::analyzer::{QueryAnalyzer, default_roles};
    use crate::error::KnowledgeError;

    #[derive(Default)]
    struct Recording {
        seen: StdMutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for Recording {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(KnowledgeError::Embedding {
                    provider: "recording".into(),
                    message: "offline".into(),
                });
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn caches_by_exact_text() {
        let provider = Arc::new(Recording::default());
        let client = EmbeddingClient::new(provider.clone(), 8);

        let first = client.embed("Dean").await;
        let second = client.embed("Dean").await;
        let _ = client.embed("dean").await;

        assert_eq!(first, second);
        assert_eq!(*provider.seen.lock().unwrap(), vec!["Dean", "dean"]);
        assert_eq!(client.cached().await, 2);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let provider = Arc::new(Recording::default());
        let client = EmbeddingClient::new(provider.clone(), 2);
        client.embed("a1").await;
        client.embed("b2").await;
        client.embed("c3").await;
        client.embed("a1").await;

        assert_eq!(client.cached().await, 2);
        assert_eq!(provider.seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failures_become_empty_and_are_not_cached() {
        let provider = Arc::new(Recording { fail: true, ..Default::default() });
        let client = EmbeddingClient::new(provider.clone(), 8);

        assert!(client.embed("registrar").await.is_empty());
        assert!(client.embed("registrar").await.is_empty());
        assert!(client.embed("").await.is_empty());
        assert_eq!(provider.seen.lock().unwrap().len(), 2);
        assert_eq!(client.cached().await, 0);
    }

    #[tokio::test]
    async fn enhancement_appends_keywords() {
        let provider = Arc::new(Recording::default());
        let client = EmbeddingClient::new(provider.clone(), 8);
        let analyzer = QueryAnalyzer::new(&default_roles()).unwrap();

        let role = analyzer.analyze("who is the dean");
        client.enhance_and_embed("who is the dean", &role).await;
        let general = analyzer.analyze("when does registration open");
        client.enhance_and_embed("when does registration open", &general).await;

        assert_eq!(
            *provider.seen.lock().unwrap(),
            vec!["who is the dean dean", "when does registration open"]
        );
    }
}
