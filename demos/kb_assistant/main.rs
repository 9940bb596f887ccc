//! # Knowledge Assistant Example
//!
//! Answers a handful of campus questions against an in-memory knowledge base
//! and prints the captured stage spans for each request.
//!
//! Uses a deterministic word-hash `MockEmbeddingProvider` and an echoing
//! generator so it runs with **zero API keys**. Built with `--features openai`
//! and with `OPENAI_API_KEY` set, it uses OpenAI for both instead.
//!
//! Run: `cargo run --example kb_assistant`

use std::sync::Arc;

use adk_knowledge::{
    AcademicProfile, Assistant, EmbeddingProvider, Generator, InMemoryKnowledgeStore,
    KnowledgeConfig, KnowledgeDocument, KnowledgePipeline, StaticProfile, Turn,
};
use adk_telemetry::SharedTraceStorage;
use serde_json::json;

// ---------------------------------------------------------------------------
// Mock collaborators: deterministic, offline
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> adk_knowledge::Result<Vec<f32>> {
        // Bag of words: each word bumps one hashed dimension, so texts that
        // share words point in similar directions.
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let hash =
                word.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(emb)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Shows the first part of the prompt it would have sent to a model.
struct PromptPreview;

#[async_trait::async_trait]
impl Generator for PromptPreview {
    async fn generate(&self, system_prompt: &str, question: &str) -> adk_knowledge::Result<String> {
        let context =
            system_prompt.split("KNOWLEDGE BASE (ordered by relevance):").nth(1).unwrap_or("");
        let preview: String = context.trim().chars().take(240).collect();
        Ok(format!("[mock answer to \"{question}\"]\n{preview}"))
    }
}

#[cfg(feature = "openai")]
fn collaborators() -> anyhow::Result<(Arc<dyn EmbeddingProvider>, Arc<dyn Generator>)> {
    use adk_knowledge::{OpenAIChatGenerator, OpenAIConfig, OpenAIEmbeddingProvider};

    if let Ok(config) = OpenAIConfig::from_env() {
        tracing::info!("using OpenAI collaborators");
        return Ok((
            Arc::new(OpenAIEmbeddingProvider::new(config.clone())),
            Arc::new(OpenAIChatGenerator::new(config)),
        ));
    }
    Ok(mock_collaborators())
}

#[cfg(not(feature = "openai"))]
fn collaborators() -> anyhow::Result<(Arc<dyn EmbeddingProvider>, Arc<dyn Generator>)> {
    Ok(mock_collaborators())
}

fn mock_collaborators() -> (Arc<dyn EmbeddingProvider>, Arc<dyn Generator>) {
    (Arc::new(MockEmbeddingProvider { dimensions: 128 }), Arc::new(PromptPreview))
}

fn campus_documents() -> Vec<KnowledgeDocument> {
    vec![
        KnowledgeDocument::new(
            "computer_science",
            json!({
                "department": "Computer Science",
                "Chairperson": "Dr. Paul Wang, email: paul.wang@x.edu, phone: 443-555-0101",
                "office": "McMechen Hall 507",
                "faculty": ["Dr. Ada Byron", "Dr. Alan Church"]
            }),
        ),
        KnowledgeDocument::new(
            "library",
            json!({
                "name": "Earl S. Richardson Library",
                "hours": { "weekdays": "8am to 11pm", "weekends": "10am to 6pm" }
            }),
        ),
        KnowledgeDocument::new(
            "registrar",
            json!({
                "name": "Office of the Registrar",
                "director": "Ms. Dana Reed",
                "contact": "registrar@x.edu",
                "location": "Truth Hall 110"
            }),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let storage = Arc::new(SharedTraceStorage::new());
    adk_telemetry::init_with_storage("kb-assistant", storage.clone())?;

    // -- 1. Pipeline over an in-memory knowledge base ---------------------
    let (embedder, generator) = collaborators()?;
    let config = KnowledgeConfig::builder().institution("Example State University").build()?;
    let pipeline = KnowledgePipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .knowledge_store(Arc::new(InMemoryKnowledgeStore::with_documents(campus_documents())))
        .build()?;

    // -- 2. Assistant with a student profile ------------------------------
    let profile: AcademicProfile = serde_json::from_value(json!({
        "major": "Computer Science",
        "classification": "Sophomore",
        "advisor": "Dr. Ada Byron",
        "gpa": 3.21,
        "current_term": "Fall 2025",
        "current_term_credits": 15.0,
        "current_term_courses": ["COSC 220", "MATH 241"]
    }))?;
    let assistant = Assistant::builder()
        .pipeline(Arc::new(pipeline))
        .generator(generator)
        .profile_source(Arc::new(StaticProfile::new(&profile)))
        .build()?;

    // -- 3. Ask -----------------------------------------------------------
    let questions = [
        "hello",
        "Who is the chair of the Computer Science department?",
        "Who is Dr. Paul Wang",
        "What are the library hours?",
        "What are the library hours?",
    ];

    for question in questions {
        println!("\nQ: {question}");
        if let Turn::Prompt { analysis, .. } = assistant.prepare(question).await {
            println!("   intent: {}", analysis.intent);
        }
        println!("A: {}", assistant.respond(question).await);
    }

    // -- 4. Captured spans --------------------------------------------------
    println!("\nCaptured traces:");
    for request_id in storage.request_ids() {
        let spans = storage.get_trace(&request_id).unwrap_or_default();
        let names: Vec<String> = spans
            .iter()
            .map(|s| format!("{} ({}us)", s.name, s.duration_nanos() / 1_000))
            .collect();
        println!("  {request_id}: {}", names.join(", "));
    }

    Ok(())
}
