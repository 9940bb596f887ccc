//! Data types for knowledge-base documents, ranked documents and context entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::text::render_fields;

/// A document from the knowledge base: an id plus an ordered tree of fields.
///
/// Field values are strings, lists or nested maps; numbers and booleans are
/// accepted and printed with their `Display` form. Field order is preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeDocument {
    /// Unique identifier for the document.
    pub id: String,
    /// Structured fields, in insertion order.
    pub fields: Map<String, Value>,
}

impl KnowledgeDocument {
    /// Create a document from an id and a JSON object.
    ///
    /// Non-object values are stored under a single `content` field.
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("content".to_string(), other);
                map
            }
        };
        Self { id: id.into(), fields }
    }

    /// Flatten the fields into an indented `key: value` text block.
    pub fn render(&self) -> String {
        render_fields(&self.fields)
    }
}

/// A candidate document scored against the question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    /// The id of the source [`KnowledgeDocument`].
    pub doc_id: String,
    /// Boosted similarity, clamped to at most 1.0.
    pub score: f32,
    /// The full rendered document text.
    pub text: String,
}

/// One ranked block of the context handed to the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextEntry {
    /// Score of the document the snippet came from.
    pub relevance: f32,
    /// The id of the document the snippet came from.
    pub source_id: String,
    /// The extracted text.
    pub snippet: String,
}

impl ContextEntry {
    /// The relevance as a whole percentage, truncated.
    pub fn percent(&self) -> i32 {
        (self.relevance * 100.0) as i32
    }
}
