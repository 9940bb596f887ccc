//! # adk-knowledge
//!
//! Knowledge retrieval core for campus assistants built on ADK-Rust.
//!
//! A question is classified (role lookup, person lookup or general), embedded,
//! matched against the knowledge base by cosine similarity with intent
//! boosts, and the relevant sections of the best documents are assembled into
//! a bounded context block for the system prompt.
//!
//! ## Features
//!
//! - **Intent analysis**: regex role detection and person-name extraction
//! - **Concurrent ranking**: bounded fan-out with a scoring deadline
//! - **Section extraction**: role and person sections, with fallbacks
//! - **Caching**: LRU embedding cache and a TTL context cache
//! - **OpenAI**: embeddings and chat completions (`openai` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use adk_knowledge::{Assistant, InMemoryKnowledgeStore, KnowledgePipeline};
//!
//! let pipeline = KnowledgePipeline::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .knowledge_store(Arc::new(InMemoryKnowledgeStore::with_documents(docs)))
//!     .build()?;
//! let assistant = Assistant::builder()
//!     .pipeline(Arc::new(pipeline))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! println!("{}", assistant.respond("Who is the chair of Physics?").await);
//! ```

pub mod analyzer;
pub mod assistant;
pub mod cache;
pub mod casual;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod ranker;
pub mod store;
pub mod text;

#[cfg(feature = "openai")]
pub mod openai;

pub use analyzer::{QueryAnalysis, QueryAnalyzer, QueryIntent, RoleDefinition, default_roles};
pub use assistant::{Assistant, AssistantBuilder, Turn};
pub use cache::{Clock, ContextCache, ManualClock, SystemClock};
pub use casual::SmallTalk;
pub use config::{KnowledgeConfig, KnowledgeConfigBuilder};
pub use document::{ContextEntry, KnowledgeDocument, ScoredDocument};
pub use embedding::{EmbeddingClient, EmbeddingProvider};
pub use error::{KnowledgeError, Result};
pub use extractor::ContextExtractor;
pub use generation::Generator;
pub use pipeline::{KnowledgePipeline, KnowledgePipelineBuilder};
pub use profile::{AcademicProfile, CourseRecord, ProfileSource, SemesterRecord, StaticProfile};
pub use prompt::PromptAssembler;
pub use ranker::{SimilarityRanker, boosted_score, cosine_similarity};
pub use store::{InMemoryKnowledgeStore, KnowledgeStore};
pub use text::{fuzzy_contains, levenshtein};

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatGenerator, OpenAIConfig, OpenAIEmbeddingProvider};
