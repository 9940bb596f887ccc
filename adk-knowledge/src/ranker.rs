//! Similarity ranking: cosine similarity, intent boosts and top-K selection.
//!
//! Candidate documents are scored concurrently, each in its own task, bounded
//! by the candidate pool size and an overall deadline. A task that fails or
//! panics contributes nothing; the rest of the batch still ranks.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analyzer::{QueryAnalysis, QueryIntent};
use crate::config::KnowledgeConfig;
use crate::document::{KnowledgeDocument, ScoredDocument};
use crate::embedding::EmbeddingClient;
use crate::error::{KnowledgeError, Result};
use crate::text::{fuzzy_contains, truncate_chars};

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector is empty, when their lengths differ, or
/// when either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denominator = norm_a * norm_b;
    if denominator > 0.0 { dot / denominator } else { 0.0 }
}

/// The additive boost a document earns for the question's intent.
pub fn intent_boost(analysis: &QueryAnalysis, text: &str, config: &KnowledgeConfig) -> f32 {
    match analysis.intent {
        QueryIntent::RoleQuery if analysis.mentions_role(text) => config.role_boost,
        QueryIntent::PersonQuery => match &analysis.person_name {
            Some(name) if fuzzy_contains(text, name) => config.person_boost,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Base similarity plus boost, never above 1.0.
pub fn boosted_score(base: f32, boost: f32) -> f32 {
    (base + boost).min(1.0)
}

/// Scores candidate documents against a question embedding.
pub struct SimilarityRanker {
    embedder: Arc<EmbeddingClient>,
    config: Arc<KnowledgeConfig>,
    permits: Arc<Semaphore>,
}

impl SimilarityRanker {
    /// Create a ranker embedding documents through `embedder`.
    pub fn new(embedder: Arc<EmbeddingClient>, config: Arc<KnowledgeConfig>) -> Self {
        let permits = Arc::new(Semaphore::new(config.candidate_pool.max(1)));
        Self { embedder, config, permits }
    }

    /// Score every candidate and return the best `top_k`, highest first.
    ///
    /// Equal scores keep retrieval order. Candidates whose embedding fails
    /// are left out.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::ScoringTimeout`] if the batch does not finish
    /// within the configured deadline. Partial results are discarded.
    pub async fn rank(
        &self,
        question: &[f32],
        candidates: Vec<KnowledgeDocument>,
        analysis: &QueryAnalysis,
    ) -> Result<Vec<ScoredDocument>> {
        let question: Arc<[f32]> = Arc::from(question);
        let analysis = Arc::new(analysis.clone());

        let mut tasks = JoinSet::new();
        for (index, document) in candidates.into_iter().enumerate() {
            let embedder = Arc::clone(&self.embedder);
            let config = Arc::clone(&self.config);
            let permits = Arc::clone(&self.permits);
            let question = Arc::clone(&question);
            let analysis = Arc::clone(&analysis);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                let scored =
                    score_document(&embedder, &question, document, &analysis, &config).await?;
                Some((index, scored))
            });
        }

        let deadline = self.config.scoring_timeout();
        let collected = tokio::time::timeout(deadline, async {
            let mut scored = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Some(entry)) => scored.push(entry),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "document scoring task failed"),
                }
            }
            scored
        })
        .await;

        let mut scored = match collected {
            Ok(scored) => scored,
            Err(_) => {
                tasks.abort_all();
                warn!(timeout_ms = self.config.scoring_timeout_ms, "document scoring timed out");
                return Err(KnowledgeError::ScoringTimeout(deadline));
            }
        };

        scored.sort_by(|(ia, a), (ib, b)| b.score.total_cmp(&a.score).then(ia.cmp(ib)));
        scored.truncate(self.config.top_k);

        let top: Vec<ScoredDocument> = scored.into_iter().map(|(_, doc)| doc).collect();
        let summary: Vec<String> =
            top.iter().map(|d| format!("{}({}%)", d.doc_id, (d.score * 100.0) as i32)).collect();
        info!(top = ?summary, "ranked documents");
        Ok(top)
    }
}

/// Render, embed and score one document. `None` if it cannot be embedded.
async fn score_document(
    embedder: &EmbeddingClient,
    question: &[f32],
    document: KnowledgeDocument,
    analysis: &QueryAnalysis,
    config: &KnowledgeConfig,
) -> Option<ScoredDocument> {
    let text = document.render();
    let embedding = embedder.embed(truncate_chars(&text, config.embed_text_chars)).await;
    if embedding.is_empty() {
        warn!(doc.id = %document.id, "skipping document without embedding");
        return None;
    }

    let base = cosine_similarity(question, &embedding);
    let boost = intent_boost(analysis, &text, config);
    let score = boosted_score(base, boost);
    debug!(doc.id = %document.id, base, boost, score, "scored document");

    Some(ScoredDocument { doc_id: document.id, score, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{QueryAnalyzer, default_roles};

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn boost_is_clamped() {
        assert_eq!(boosted_score(0.9, 0.6), 1.0);
        assert!((boosted_score(0.2, 0.4) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn boost_by_intent() {
        let config = KnowledgeConfig::default();
        let analyzer = QueryAnalyzer::new(&default_roles()).unwrap();

        let chair = analyzer.analyze("who is the chair of physics");
        assert_eq!(intent_boost(&chair, "Department Head: Dr. Ada Byron", &config), 0.6);
        assert_eq!(intent_boost(&chair, "Dean: Dr. Ada Byron", &config), 0.0);

        let person = analyzer.analyze("Who is Dr. Paul Wang");
        assert_eq!(intent_boost(&person, "Faculty: Paul Wang, Room 3", &config), 0.4);
        assert_eq!(intent_boost(&person, "Faculty: Ada Byron", &config), 0.0);

        let general = analyzer.analyze("when does registration open");
        assert_eq!(intent_boost(&general, "registration opens in April", &config), 0.0);
    }
}
