//! Error types for the `adk-knowledge` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while retrieving knowledge or answering a question.
///
/// Besides transport and configuration failures, three variants are
/// retrieval *signals* rather than faults: [`EmptyKnowledgeBase`],
/// [`NoRelevantInformation`] and [`EmbeddingUnavailable`]. Callers phrase a
/// different user-facing message for each, see [`KnowledgeError::user_message`].
///
/// [`EmptyKnowledgeBase`]: KnowledgeError::EmptyKnowledgeBase
/// [`NoRelevantInformation`]: KnowledgeError::NoRelevantInformation
/// [`EmbeddingUnavailable`]: KnowledgeError::EmbeddingUnavailable
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// An error occurred while calling the embedding provider.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the knowledge-base store.
    #[error("Knowledge store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while calling the generation collaborator.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The question could not be embedded, so nothing can be ranked.
    #[error("question embedding unavailable")]
    EmbeddingUnavailable,

    /// The knowledge base returned no documents at all.
    #[error("knowledge base is empty")]
    EmptyKnowledgeBase,

    /// Documents exist but none of them could be scored against the question.
    #[error("no relevant information found")]
    NoRelevantInformation,

    /// Concurrent document scoring did not finish before the deadline.
    #[error("document scoring timed out after {0:?}")]
    ScoringTimeout(Duration),
}

impl KnowledgeError {
    /// The message shown to the end user when a request ends with this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyKnowledgeBase => {
                "The knowledge base is empty right now. Please try again later."
            }
            Self::NoRelevantInformation => {
                "No relevant information was found for your question. Try rephrasing it."
            }
            Self::EmbeddingUnavailable => "Unable to process your question. Please try again.",
            Self::ScoringTimeout(_) => {
                "Searching the knowledge base took too long. Please try again shortly."
            }
            Self::Embedding { .. } | Self::Store { .. } => {
                "A system error occurred while searching. Please try again shortly."
            }
            Self::Generation { .. } => {
                "I'm temporarily unable to answer that. Please try again in a moment."
            }
            Self::Config(_) => "The assistant is misconfigured. Please contact support.",
        }
    }

    /// Whether this error is one of the retrieval signals rather than a fault.
    pub fn is_retrieval_signal(&self) -> bool {
        matches!(
            self,
            Self::EmptyKnowledgeBase | Self::NoRelevantInformation | Self::EmbeddingUnavailable
        )
    }
}

/// A convenience result type for knowledge operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
