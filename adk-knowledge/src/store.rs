//! Knowledge-base store trait and an in-memory implementation.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::KnowledgeDocument;
use crate::error::Result;

/// Read access to the knowledge base searched by the pipeline.
///
/// The pipeline never writes through this trait; populating the knowledge
/// base is the ingestion side's job.
///
/// # Example
///
/// ```rust,ignore
/// use adk_knowledge::{InMemoryKnowledgeStore, KnowledgeStore};
///
/// let store = InMemoryKnowledgeStore::new();
/// let candidates = store.fetch(8).await?;
/// ```
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Fetch up to `limit` documents, in the store's natural order.
    async fn fetch(&self, limit: usize) -> Result<Vec<KnowledgeDocument>>;
}

/// An insertion-ordered in-memory knowledge base.
///
/// Suitable for development, tests, and small static collections.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    documents: RwLock<Vec<KnowledgeDocument>>,
}

impl InMemoryKnowledgeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `documents`.
    pub fn with_documents(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents: RwLock::new(documents) }
    }

    /// Insert documents, replacing same-id documents in place.
    pub async fn upsert(&self, documents: impl IntoIterator<Item = KnowledgeDocument>) {
        let mut stored = self.documents.write().await;
        for document in documents {
            match stored.iter_mut().find(|d| d.id == document.id) {
                Some(existing) => *existing = document,
                None => stored.push(document),
            }
        }
    }

    /// Remove documents by id.
    pub async fn remove(&self, ids: &[&str]) {
        self.documents.write().await.retain(|d| !ids.contains(&d.id.as_str()));
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn fetch(&self, limit: usize) -> Result<Vec<KnowledgeDocument>> {
        Ok(self.documents.read().await.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, body: &str) -> KnowledgeDocument {
        KnowledgeDocument::new(id, json!({ "body": body }))
    }

    #[tokio::test]
    async fn fetch_respects_limit_and_order() {
        let store = InMemoryKnowledgeStore::with_documents(
            (0..10).map(|i| doc(&format!("d{i}"), "x")).collect(),
        );
        let fetched = store.fetch(8).await.unwrap();
        assert_eq!(fetched.len(), 8);
        assert_eq!(fetched[0].id, "d0");
        assert_eq!(fetched[7].id, "d7");
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = InMemoryKnowledgeStore::new();
        store.upsert([doc("a", "1"), doc("b", "2")]).await;
        store.upsert([doc("a", "3")]).await;

        let fetched = store.fetch(8).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].render(), "body: 3\n");

        store.remove(&["a"]).await;
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }
}
