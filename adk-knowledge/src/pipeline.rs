//! Retrieval pipeline orchestrator.
//!
//! The [`KnowledgePipeline`] runs one question through the fixed stage
//! sequence: cache check, question embedding, candidate fetch, concurrent
//! ranking, section extraction and rendering. Rendered contexts are cached
//! per question.
//!
//! # Example
//!
//! ```rust,ignore
//! use adk_knowledge::{InMemoryKnowledgeStore, KnowledgeConfig, KnowledgePipeline};
//!
//! let pipeline = KnowledgePipeline::builder()
//!     .config(KnowledgeConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .knowledge_store(Arc::new(InMemoryKnowledgeStore::new()))
//!     .build()?;
//!
//! let analysis = pipeline.analyze("Who is the chair of Physics?");
//! let context = pipeline.retrieve("Who is the chair of Physics?", &analysis).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};

use crate::analyzer::{QueryAnalysis, QueryAnalyzer};
use crate::cache::{Clock, ContextCache, SystemClock};
use crate::config::KnowledgeConfig;
use crate::document::ContextEntry;
use crate::embedding::{EmbeddingClient, EmbeddingProvider};
use crate::error::{KnowledgeError, Result};
use crate::extractor::ContextExtractor;
use crate::ranker::SimilarityRanker;
use crate::store::KnowledgeStore;

/// The retrieval pipeline.
///
/// Holds the shared embedding cache and context cache for its whole
/// lifetime; build one per process and share it by reference. Construct one
/// via [`KnowledgePipeline::builder()`].
pub struct KnowledgePipeline {
    config: Arc<KnowledgeConfig>,
    analyzer: QueryAnalyzer,
    embedder: Arc<EmbeddingClient>,
    store: Arc<dyn KnowledgeStore>,
    ranker: SimilarityRanker,
    extractor: ContextExtractor,
    cache: ContextCache,
}

impl KnowledgePipeline {
    /// Create a new [`KnowledgePipelineBuilder`].
    pub fn builder() -> KnowledgePipelineBuilder {
        KnowledgePipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Return the caching embedding client.
    pub fn embedder(&self) -> &Arc<EmbeddingClient> {
        &self.embedder
    }

    /// Return the context cache.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Classify a question.
    pub fn analyze(&self, question: &str) -> QueryAnalysis {
        self.analyzer.analyze(question)
    }

    /// Return the rendered context for `question`, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the retrieval signals of [`collect_context`](Self::collect_context).
    /// Failed retrievals are not cached.
    pub async fn retrieve(&self, question: &str, analysis: &QueryAnalysis) -> Result<String> {
        let span = info_span!("kb.retrieve", intent = %analysis.intent);
        self.cache
            .get_or_build(question, || async {
                let entries = self.collect_context(question, analysis).await?;
                let context = self.extractor.render(&entries);
                let context_chars = context.chars().count();
                info!(entries = entries.len(), context_chars, "context built");
                Ok(context)
            })
            .instrument(span)
            .await
    }

    /// Embed, fetch, rank and extract without touching the context cache.
    ///
    /// # Errors
    ///
    /// - [`KnowledgeError::EmbeddingUnavailable`] if the question cannot be embedded.
    /// - [`KnowledgeError::Store`] if the knowledge base cannot be read.
    /// - [`KnowledgeError::EmptyKnowledgeBase`] if it holds no documents.
    /// - [`KnowledgeError::ScoringTimeout`] if ranking misses its deadline.
    /// - [`KnowledgeError::NoRelevantInformation`] if no document could be scored.
    pub async fn collect_context(
        &self,
        question: &str,
        analysis: &QueryAnalysis,
    ) -> Result<Vec<ContextEntry>> {
        let query_embedding = self.embedder.enhance_and_embed(question, analysis).await;
        if query_embedding.is_empty() {
            warn!("question embedding unavailable");
            return Err(KnowledgeError::EmbeddingUnavailable);
        }

        let candidates = self.store.fetch(self.config.candidate_pool).await.map_err(|e| {
            error!(error = %e, "knowledge store fetch failed");
            e
        })?;
        if candidates.is_empty() {
            warn!("knowledge base is empty");
            return Err(KnowledgeError::EmptyKnowledgeBase);
        }

        let candidate_count = candidates.len();
        let ranked = self
            .ranker
            .rank(&query_embedding, candidates, analysis)
            .instrument(info_span!("kb.rank", candidates = candidate_count))
            .await?;
        if ranked.is_empty() {
            warn!(candidates = candidate_count, "no document could be scored");
            return Err(KnowledgeError::NoRelevantInformation);
        }

        let _extract = info_span!("kb.extract", documents = ranked.len()).entered();
        Ok(self.extractor.extract(analysis, &ranked))
    }
}

/// Builder for constructing a [`KnowledgePipeline`].
///
/// `embedding_provider` and `knowledge_store` are required. The config
/// defaults to [`KnowledgeConfig::default()`] and the clock to the system
/// clock.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = KnowledgePipeline::builder()
///     .config(KnowledgeConfig::builder().top_k(3).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .knowledge_store(Arc::new(store))
///     .clock(Arc::new(ManualClock::new(0)))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct KnowledgePipelineBuilder {
    config: Option<KnowledgeConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    knowledge_store: Option<Arc<dyn KnowledgeStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl KnowledgePipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: KnowledgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the knowledge store.
    pub fn knowledge_store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge_store = Some(store);
        self
    }

    /// Set the clock the context cache reads.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the [`KnowledgePipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if a required field is missing, the
    /// config is invalid, or a role pattern does not compile.
    pub fn build(self) -> Result<KnowledgePipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| KnowledgeError::Config("embedding_provider is required".to_string()))?;
        let store = self
            .knowledge_store
            .ok_or_else(|| KnowledgeError::Config("knowledge_store is required".to_string()))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let config = Arc::new(config);
        let analyzer = QueryAnalyzer::new(&config.roles)?;
        let embedder =
            Arc::new(EmbeddingClient::new(embedding_provider, config.embedding_cache_capacity));
        let ranker = SimilarityRanker::new(Arc::clone(&embedder), Arc::clone(&config));
        let extractor = ContextExtractor::new(Arc::clone(&config));
        let cache = ContextCache::new(
            Duration::from_millis(config.context_ttl_ms),
            config.cache_key_chars,
            config.context_cache_capacity,
            clock,
        );

        Ok(KnowledgePipeline { config, analyzer, embedder, store, ranker, extractor, cache })
    }
}
