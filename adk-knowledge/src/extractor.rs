//! Context extraction: carve intent-relevant sections out of ranked documents
//! and render them into one bounded context block.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::analyzer::{QueryAnalysis, QueryIntent};
use crate::config::KnowledgeConfig;
use crate::document::{ContextEntry, ScoredDocument};
use crate::text::{extract_sections, fuzzy_contains, truncate_chars};

/// Turns the top-ranked documents into ordered [`ContextEntry`] values.
#[derive(Debug, Clone)]
pub struct ContextExtractor {
    config: Arc<KnowledgeConfig>,
}

impl ContextExtractor {
    /// Create an extractor using the snippet and ceiling sizes from `config`.
    pub fn new(config: Arc<KnowledgeConfig>) -> Self {
        Self { config }
    }

    /// Extract one entry per document, highest relevance first.
    ///
    /// Role and person questions keep only the sections that mention the
    /// role or person; general questions keep a leading snippet. A document
    /// that yields no section contributes a shorter leading snippet instead,
    /// so every ranked document is represented. A document whose extraction
    /// panics is logged and left out.
    pub fn extract(&self, analysis: &QueryAnalysis, documents: &[ScoredDocument]) -> Vec<ContextEntry> {
        let mut entries = Vec::with_capacity(documents.len());
        let mut failed = HashSet::new();

        for doc in documents {
            // One malformed document must not take the batch down with it.
            match catch_unwind(AssertUnwindSafe(|| self.section_for(analysis, doc))) {
                Ok(Some(snippet)) => entries.push(ContextEntry {
                    relevance: doc.score,
                    source_id: doc.doc_id.clone(),
                    snippet,
                }),
                Ok(None) => debug!(doc.id = %doc.doc_id, intent = %analysis.intent, "no section found"),
                Err(_) => {
                    warn!(doc.id = %doc.doc_id, "section extraction failed, skipping document");
                    failed.insert(doc.doc_id.as_str());
                }
            }
        }

        for doc in documents {
            let represented = entries.iter().any(|e| e.source_id == doc.doc_id);
            if !represented && !failed.contains(doc.doc_id.as_str()) {
                entries.push(ContextEntry {
                    relevance: doc.score,
                    source_id: doc.doc_id.clone(),
                    snippet: truncate_chars(&doc.text, self.config.fallback_snippet_chars)
                        .to_string(),
                });
            }
        }

        entries.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        entries
    }

    /// Render entries under per-source headers, cut to the context ceiling.
    pub fn render(&self, entries: &[ContextEntry]) -> String {
        let mut context = String::new();
        for entry in entries {
            context.push_str(&format!(
                "\n=== From {} (Relevance: {}%) ===\n{}\n",
                entry.source_id,
                entry.percent(),
                entry.snippet
            ));
        }
        truncate_chars(&context, self.config.max_context_chars).to_string()
    }

    fn section_for(&self, analysis: &QueryAnalysis, doc: &ScoredDocument) -> Option<String> {
        let section = match analysis.intent {
            QueryIntent::RoleQuery => extract_sections(&doc.text, |line| analysis.mentions_role(line)),
            QueryIntent::PersonQuery => {
                let name = analysis.person_name.as_deref()?;
                if !fuzzy_contains(&doc.text, name) {
                    return None;
                }
                extract_sections(&doc.text, |line| fuzzy_contains(line, name))
            }
            QueryIntent::GeneralQuery => {
                truncate_chars(&doc.text, self.config.snippet_chars).to_string()
            }
        };
        (!section.is_empty()).then_some(section)
    }
}
