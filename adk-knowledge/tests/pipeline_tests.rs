//! End-to-end retrieval tests against in-test embedding and store doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adk_knowledge::{
    Assistant, Generator, InMemoryKnowledgeStore, KnowledgeConfig, KnowledgeDocument,
    KnowledgeError, KnowledgePipeline, KnowledgeStore, ManualClock, QueryIntent, Result, Turn,
};
use adk_knowledge::embedding::EmbeddingProvider;
use async_trait::async_trait;
use serde_json::json;

const DIM: usize = 64;

/// Bag-of-words embedder that counts its calls.
#[derive(Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
    /// Texts containing this marker fail.
    fail_on: Option<&'static str>,
    /// Texts containing this marker take a minute to embed.
    slow_on: Option<&'static str>,
}

impl CountingEmbedder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_on.is_some_and(|m| text.contains(m)) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.fail_on.is_some_and(|m| text.contains(m)) {
            return Err(KnowledgeError::Embedding {
                provider: "counting".into(),
                message: "refused".into(),
            });
        }

        let mut v = vec![0.0; DIM];
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let hash = word
                .bytes()
                .fold(2_166_136_261u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16_777_619));
            v[hash as usize % DIM] += 1.0;
        }
        Ok(v)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Embeds every text to the same vector, finishing `late` texts last.
struct StaggeredEmbedder {
    late: Vec<(&'static str, Duration)>,
}

#[async_trait]
impl EmbeddingProvider for StaggeredEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some((_, delay)) = self.late.iter().find(|(marker, _)| text.contains(marker)) {
            tokio::time::sleep(*delay).await;
        }
        Ok(vec![1.0; DIM])
    }

    fn name(&self) -> &str {
        "staggered"
    }
}

/// Store wrapper that counts fetches.
struct CountingStore {
    inner: InMemoryKnowledgeStore,
    fetches: AtomicUsize,
}

impl CountingStore {
    fn new(documents: Vec<KnowledgeDocument>) -> Self {
        Self { inner: InMemoryKnowledgeStore::with_documents(documents), fetches: AtomicUsize::new(0) }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeStore for CountingStore {
    async fn fetch(&self, limit: usize) -> Result<Vec<KnowledgeDocument>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(limit).await
    }
}

/// Generator that answers with the question it was asked.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, _system_prompt: &str, question: &str) -> Result<String> {
        Ok(format!("echo: {question}"))
    }
}

fn campus_documents() -> Vec<KnowledgeDocument> {
    vec![
        KnowledgeDocument::new(
            "computer_science",
            json!({
                "department": "Computer Science",
                "Chairperson": "Dr. Paul Wang, email: paul.wang@x.edu",
                "office": "McMechen Hall 507"
            }),
        ),
        KnowledgeDocument::new(
            "library",
            json!({ "name": "Earl S. Richardson Library", "hours": "8am to 11pm" }),
        ),
        KnowledgeDocument::new(
            "registrar",
            json!({ "name": "Office of the Registrar", "contact": "registrar@x.edu" }),
        ),
    ]
}

struct Harness {
    embedder: Arc<CountingEmbedder>,
    store: Arc<CountingStore>,
    pipeline: Arc<KnowledgePipeline>,
}

fn harness(embedder: CountingEmbedder, documents: Vec<KnowledgeDocument>) -> Harness {
    harness_with(embedder, documents, KnowledgeConfig::default(), Arc::new(ManualClock::new(0)))
}

fn harness_with(
    embedder: CountingEmbedder,
    documents: Vec<KnowledgeDocument>,
    config: KnowledgeConfig,
    clock: Arc<ManualClock>,
) -> Harness {
    let embedder = Arc::new(embedder);
    let store = Arc::new(CountingStore::new(documents));
    let pipeline = KnowledgePipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .knowledge_store(store.clone())
        .clock(clock)
        .build()
        .unwrap();
    Harness { embedder, store, pipeline: Arc::new(pipeline) }
}

fn assistant(pipeline: &Arc<KnowledgePipeline>) -> Assistant {
    Assistant::builder().pipeline(pipeline.clone()).generator(Arc::new(EchoGenerator)).build().unwrap()
}

#[tokio::test]
async fn chair_question_finds_the_chairperson_section() {
    let h = harness(CountingEmbedder::default(), campus_documents());
    let question = "Who is the chair of the Computer Science department?";

    let analysis = h.pipeline.analyze(question);
    assert_eq!(analysis.intent, QueryIntent::RoleQuery);
    assert_eq!(analysis.role_keyword.as_deref(), Some("chair"));

    let context = h.pipeline.retrieve(question, &analysis).await.unwrap();
    assert!(context.contains("Chairperson: Dr. Paul Wang, email: paul.wang@x.edu"));
    assert!(context.starts_with("\n=== From computer_science (Relevance: "));
}

#[tokio::test]
async fn small_talk_never_reaches_retrieval() {
    let h = harness(CountingEmbedder::default(), campus_documents());
    let assistant = assistant(&h.pipeline);

    assert!(matches!(assistant.prepare("hello").await, Turn::SmallTalk(_)));
    let reply = assistant.respond("hello").await;
    assert!(!reply.is_empty());

    assert_eq!(h.embedder.calls(), 0);
    assert_eq!(h.store.fetches(), 0);
    assert!(h.pipeline.cache().is_empty().await);
}

#[tokio::test]
async fn empty_knowledge_base_is_reported() {
    let h = harness(CountingEmbedder::default(), Vec::new());
    let question = "when does registration open";

    let err = h.pipeline.retrieve(question, &h.pipeline.analyze(question)).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::EmptyKnowledgeBase));

    let reply = assistant(&h.pipeline).respond(question).await;
    assert_eq!(reply, KnowledgeError::EmptyKnowledgeBase.user_message());
    assert!(h.pipeline.cache().is_empty().await);
}

#[tokio::test]
async fn general_question_keeps_top_three_bounded_snippets() {
    let documents = (0..5)
        .map(|i| KnowledgeDocument::new(format!("doc{i}"), json!({ "body": "word ".repeat(900) })))
        .collect();
    let h = harness(CountingEmbedder::default(), documents);
    let question = "tell me about campus parking";

    let analysis = h.pipeline.analyze(question);
    assert_eq!(analysis.intent, QueryIntent::GeneralQuery);

    let entries = h.pipeline.collect_context(question, &analysis).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.snippet.chars().count() <= 2000));
    assert!(entries.windows(2).all(|w| w[0].relevance >= w[1].relevance));
}

#[tokio::test(start_paused = true)]
async fn equal_scores_keep_retrieval_order() {
    let documents = ["alpha", "bravo", "charlie", "delta", "echo"]
        .iter()
        .enumerate()
        .map(|(i, tag)| KnowledgeDocument::new(format!("doc{i}"), json!({ "tag": tag })))
        .collect();
    let embedder = StaggeredEmbedder {
        late: vec![("alpha", Duration::from_millis(30)), ("bravo", Duration::from_millis(20))],
    };
    let pipeline = KnowledgePipeline::builder()
        .embedding_provider(Arc::new(embedder))
        .knowledge_store(Arc::new(InMemoryKnowledgeStore::with_documents(documents)))
        .clock(Arc::new(ManualClock::new(0)))
        .build()
        .unwrap();
    let question = "tell me about campus parking";

    let entries = pipeline.collect_context(question, &pipeline.analyze(question)).await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.source_id.as_str()).collect();
    assert_eq!(ids, ["doc0", "doc1", "doc2"]);
    assert!(entries.iter().all(|e| e.relevance == entries[0].relevance));
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let clock = Arc::new(ManualClock::new(0));
    let h = harness_with(
        CountingEmbedder::default(),
        campus_documents(),
        KnowledgeConfig::default(),
        clock.clone(),
    );
    let question = "What are the library hours?";
    let analysis = h.pipeline.analyze(question);

    let first = h.pipeline.retrieve(question, &analysis).await.unwrap();
    let (calls, fetches) = (h.embedder.calls(), h.store.fetches());

    clock.advance(Duration::from_secs(300));
    let second = h.pipeline.retrieve(question, &analysis).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.embedder.calls(), calls);
    assert_eq!(h.store.fetches(), fetches);

    clock.advance(Duration::from_secs(301));
    let third = h.pipeline.retrieve(question, &analysis).await.unwrap();
    assert_eq!(first, third);
    assert_eq!(h.store.fetches(), fetches + 1);
}

#[tokio::test]
async fn failing_document_does_not_sink_the_batch() {
    let mut documents = campus_documents();
    documents.push(KnowledgeDocument::new("broken", json!({ "note": "poison pill" })));
    let embedder = CountingEmbedder { fail_on: Some("poison"), ..Default::default() };
    let h = harness(embedder, documents);
    let question = "where is the registrar office";

    let entries = h.pipeline.collect_context(question, &h.pipeline.analyze(question)).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.source_id != "broken"));
}

#[tokio::test]
async fn no_scorable_document_is_no_relevant_information() {
    let documents = vec![
        KnowledgeDocument::new("a", json!({ "note": "poison one" })),
        KnowledgeDocument::new("b", json!({ "note": "poison two" })),
    ];
    let embedder = CountingEmbedder { fail_on: Some("poison"), ..Default::default() };
    let h = harness(embedder, documents);
    let question = "what is on the menu today";

    let err = h.pipeline.retrieve(question, &h.pipeline.analyze(question)).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::NoRelevantInformation));
}

#[tokio::test(start_paused = true)]
async fn slow_scoring_times_out_without_partial_results() {
    let mut documents = campus_documents();
    documents.push(KnowledgeDocument::new("slow", json!({ "note": "sluggish entry" })));
    let embedder = CountingEmbedder { slow_on: Some("sluggish"), ..Default::default() };
    let config = KnowledgeConfig::builder().scoring_timeout(Duration::from_secs(5)).build().unwrap();
    let h = harness_with(embedder, documents, config, Arc::new(ManualClock::new(0)));
    let question = "where is the library";

    let err = h.pipeline.retrieve(question, &h.pipeline.analyze(question)).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::ScoringTimeout(d) if d == Duration::from_secs(5)));
    assert!(h.pipeline.cache().is_empty().await);

    let reply = assistant(&h.pipeline).respond(question).await;
    assert_eq!(reply, err.user_message());
}

#[tokio::test]
async fn answered_question_goes_through_generator() {
    let h = harness(CountingEmbedder::default(), campus_documents());
    let assistant = assistant(&h.pipeline);

    match assistant.prepare("Who is Dr. Paul Wang").await {
        Turn::Prompt { analysis, system_prompt } => {
            assert_eq!(analysis.person_name.as_deref(), Some("paul wang"));
            assert!(system_prompt.contains("Dr. Paul Wang"));
        }
        other => panic!("expected a prompt, got {other:?}"),
    }
    assert_eq!(assistant.respond("Who is Dr. Paul Wang").await, "echo: Who is Dr. Paul Wang");
}
