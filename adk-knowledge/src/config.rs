//! Configuration for the knowledge retrieval pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analyzer::{RoleDefinition, default_roles};
use crate::error::{KnowledgeError, Result};

/// Configuration parameters for retrieval, ranking, extraction and caching.
///
/// Every field has a default, so partial configurations deserialize cleanly:
///
/// ```rust,ignore
/// let config: KnowledgeConfig = serde_json::from_str(r#"{ "top_k": 2 }"#)?;
/// assert_eq!(config.candidate_pool, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Number of documents fetched from the knowledge base per request.
    pub candidate_pool: usize,
    /// Number of ranked documents kept for context extraction.
    pub top_k: usize,
    /// Characters of rendered document text sent to the embedding provider.
    pub embed_text_chars: usize,
    /// Characters taken verbatim from a document for general questions.
    pub snippet_chars: usize,
    /// Characters taken from a top document that produced no section.
    pub fallback_snippet_chars: usize,
    /// Ceiling on the rendered context handed to the generator.
    pub max_context_chars: usize,
    /// Additive score boost when a document mentions the requested role.
    pub role_boost: f32,
    /// Additive score boost when a document fuzzily mentions the requested person.
    pub person_boost: f32,
    /// Validity window of a cached context, in milliseconds.
    pub context_ttl_ms: u64,
    /// Number of leading characters of the lowercased question used as cache key.
    pub cache_key_chars: usize,
    /// Deadline for scoring the candidate pool, in milliseconds.
    pub scoring_timeout_ms: u64,
    /// Maximum number of cached embeddings.
    pub embedding_cache_capacity: usize,
    /// Maximum number of cached contexts.
    pub context_cache_capacity: usize,
    /// Institution named in canned replies and prompts.
    pub institution: String,
    /// Role table, in tie-break order.
    pub roles: Vec<RoleDefinition>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            candidate_pool: 8,
            top_k: 3,
            embed_text_chars: 2000,
            snippet_chars: 2000,
            fallback_snippet_chars: 1500,
            max_context_chars: 6000,
            role_boost: 0.6,
            person_boost: 0.4,
            context_ttl_ms: 10 * 60 * 1000,
            cache_key_chars: 50,
            scoring_timeout_ms: 30_000,
            embedding_cache_capacity: 1024,
            context_cache_capacity: 256,
            institution: "the university".to_string(),
            roles: default_roles(),
        }
    }
}

impl KnowledgeConfig {
    /// Create a new builder for constructing a [`KnowledgeConfig`].
    pub fn builder() -> KnowledgeConfigBuilder {
        KnowledgeConfigBuilder::default()
    }

    /// The scoring deadline as a [`Duration`].
    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(KnowledgeError::Config("top_k must be greater than zero".to_string()));
        }
        if self.candidate_pool < self.top_k {
            return Err(KnowledgeError::Config(format!(
                "candidate_pool ({}) must be at least top_k ({})",
                self.candidate_pool, self.top_k
            )));
        }
        if self.max_context_chars == 0 {
            return Err(KnowledgeError::Config(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        if self.embed_text_chars == 0 {
            return Err(KnowledgeError::Config(
                "embed_text_chars must be greater than zero".to_string(),
            ));
        }
        if self.scoring_timeout_ms == 0 {
            return Err(KnowledgeError::Config(
                "scoring_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.cache_key_chars == 0 {
            return Err(KnowledgeError::Config(
                "cache_key_chars must be greater than zero".to_string(),
            ));
        }
        if self.embedding_cache_capacity == 0 || self.context_cache_capacity == 0 {
            return Err(KnowledgeError::Config(
                "cache capacities must be greater than zero".to_string(),
            ));
        }
        for (name, boost) in [("role_boost", self.role_boost), ("person_boost", self.person_boost)]
        {
            if !(0.0..=1.0).contains(&boost) {
                return Err(KnowledgeError::Config(format!(
                    "{name} ({boost}) must be within [0, 1]"
                )));
            }
        }
        if let Some(role) = self.roles.iter().find(|r| r.variants.is_empty()) {
            return Err(KnowledgeError::Config(format!(
                "role '{}' must list at least one variant",
                role.name
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`KnowledgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeConfigBuilder {
    config: KnowledgeConfig,
}

impl KnowledgeConfigBuilder {
    /// Set the number of documents fetched per request.
    pub fn candidate_pool(mut self, pool: usize) -> Self {
        self.config.candidate_pool = pool;
        self
    }

    /// Set the number of ranked documents kept for extraction.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the ceiling on the rendered context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the context cache validity window.
    pub fn context_ttl(mut self, ttl: Duration) -> Self {
        self.config.context_ttl_ms = ttl.as_millis() as u64;
        self
    }

    /// Set the deadline for concurrent document scoring.
    pub fn scoring_timeout(mut self, timeout: Duration) -> Self {
        self.config.scoring_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the embedding cache capacity.
    pub fn embedding_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.embedding_cache_capacity = capacity;
        self
    }

    /// Set the context cache capacity.
    pub fn context_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.context_cache_capacity = capacity;
        self
    }

    /// Set the institution named in replies and prompts.
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.config.institution = institution.into();
        self
    }

    /// Replace the role table.
    pub fn roles(mut self, roles: Vec<RoleDefinition>) -> Self {
        self.config.roles = roles;
        self
    }

    /// Build the [`KnowledgeConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if any constraint of
    /// [`KnowledgeConfig::validate`] is violated.
    pub fn build(self) -> Result<KnowledgeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
