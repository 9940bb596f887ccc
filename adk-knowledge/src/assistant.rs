//! The question-answering front door.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::analyzer::QueryAnalysis;
use crate::casual::SmallTalk;
use crate::error::{KnowledgeError, Result};
use crate::generation::Generator;
use crate::pipeline::KnowledgePipeline;
use crate::profile::ProfileSource;
use crate::prompt::PromptAssembler;

/// What the assistant decided to do with a question.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Small talk, answered without retrieval.
    SmallTalk(String),
    /// A retrieval-backed prompt ready for the generator.
    Prompt { analysis: QueryAnalysis, system_prompt: String },
    /// Retrieval failed; the message is meant for the user.
    Unavailable(String),
}

/// Composes small talk, retrieval, the profile and generation.
///
/// [`respond`](Assistant::respond) never fails: every error ends up as a
/// user-facing message.
pub struct Assistant {
    pipeline: Arc<KnowledgePipeline>,
    generator: Arc<dyn Generator>,
    profile: Option<Arc<dyn ProfileSource>>,
    small_talk: SmallTalk,
    prompts: PromptAssembler,
}

impl Assistant {
    /// Create a new [`AssistantBuilder`].
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// Return the retrieval pipeline.
    pub fn pipeline(&self) -> &Arc<KnowledgePipeline> {
        &self.pipeline
    }

    /// Decide how to answer `question` without calling the generator.
    pub async fn prepare(&self, question: &str) -> Turn {
        if let Some(reply) = self.small_talk.reply(question) {
            info!("answered as small talk");
            return Turn::SmallTalk(reply);
        }

        let analysis = self.pipeline.analyze(question);
        let context = match self.pipeline.retrieve(question, &analysis).await {
            Ok(context) => context,
            Err(e) => {
                if e.is_retrieval_signal() {
                    info!(signal = %e, "retrieval produced no context");
                } else {
                    error!(error = %e, "retrieval failed");
                }
                return Turn::Unavailable(e.user_message().to_string());
            }
        };

        let profile = self.profile_summary().await;
        let system_prompt = self.prompts.build(&context, &analysis, profile.as_deref());
        Turn::Prompt { analysis, system_prompt }
    }

    /// Answer `question`.
    pub async fn respond(&self, question: &str) -> String {
        let request_id = Uuid::new_v4();
        let span = info_span!("assistant.respond", request.id = %request_id);
        async {
            match self.prepare(question).await {
                Turn::SmallTalk(reply) | Turn::Unavailable(reply) => reply,
                Turn::Prompt { analysis, system_prompt } => {
                    match self.generator.generate(&system_prompt, question).await {
                        Ok(answer) => {
                            info!(intent = %analysis.intent, answer_chars = answer.len(), "answered");
                            answer
                        }
                        Err(e) => {
                            error!(error = %e, "generation failed");
                            e.user_message().to_string()
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn profile_summary(&self) -> Option<String> {
        let source = self.profile.as_ref()?;
        match source.profile_summary().await {
            Ok(summary) => summary.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "profile unavailable, continuing without it");
                None
            }
        }
    }
}

/// Builder for constructing an [`Assistant`].
///
/// `pipeline` and `generator` are required; the profile source is optional.
#[derive(Default)]
pub struct AssistantBuilder {
    pipeline: Option<Arc<KnowledgePipeline>>,
    generator: Option<Arc<dyn Generator>>,
    profile: Option<Arc<dyn ProfileSource>>,
}

impl AssistantBuilder {
    /// Set the retrieval pipeline.
    pub fn pipeline(mut self, pipeline: Arc<KnowledgePipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the source of the asking user's academic profile.
    pub fn profile_source(mut self, profile: Arc<dyn ProfileSource>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Build the [`Assistant`].
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if a required field is missing.
    pub fn build(self) -> Result<Assistant> {
        let pipeline = self
            .pipeline
            .ok_or_else(|| KnowledgeError::Config("pipeline is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| KnowledgeError::Config("generator is required".to_string()))?;
        let institution = pipeline.config().institution.clone();

        Ok(Assistant {
            pipeline,
            generator,
            profile: self.profile,
            small_talk: SmallTalk::new(institution.clone()),
            prompts: PromptAssembler::new(institution),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::document::KnowledgeDocument;
    use crate::embedding::EmbeddingProvider;
    use crate::profile::StaticProfile;
    use crate::store::InMemoryKnowledgeStore;

    struct Letters;

    #[async_trait]
    impl EmbeddingProvider for Letters {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; 26];
            for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                v[usize::from(c - b'a')] += 1.0;
            }
            Ok(v)
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    struct Failing;

    #[async_trait]
    impl Generator for Failing {
        async fn generate(&self, _: &str, _: &str) -> Result<String> {
            Err(KnowledgeError::Generation { provider: "test".into(), message: "down".into() })
        }
    }

    struct EchoPrompt;

    #[async_trait]
    impl Generator for EchoPrompt {
        async fn generate(&self, system_prompt: &str, _: &str) -> Result<String> {
            Ok(system_prompt.to_string())
        }
    }

    fn pipeline() -> Arc<KnowledgePipeline> {
        let store = InMemoryKnowledgeStore::with_documents(vec![KnowledgeDocument::new(
            "library",
            json!({ "name": "Main Library", "hours": "8am to 10pm" }),
        )]);
        Arc::new(
            KnowledgePipeline::builder()
                .embedding_provider(Arc::new(Letters))
                .knowledge_store(Arc::new(store))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn generation_failure_becomes_message() {
        let assistant =
            Assistant::builder().pipeline(pipeline()).generator(Arc::new(Failing)).build().unwrap();
        let answer = assistant.respond("what are the library hours").await;
        assert_eq!(answer, KnowledgeError::Generation {
            provider: String::new(),
            message: String::new()
        }
        .user_message());
    }

    #[tokio::test]
    async fn profile_flows_into_prompt() {
        let assistant = Assistant::builder()
            .pipeline(pipeline())
            .generator(Arc::new(EchoPrompt))
            .profile_source(Arc::new(StaticProfile::from_text("You are a Biology major.")))
            .build()
            .unwrap();
        let prompt = assistant.respond("what are the library hours").await;
        assert!(prompt.contains("You are a Biology major."));
        assert!(prompt.contains("=== From library"));
    }

    #[test]
    fn builder_requires_generator() {
        assert!(matches!(
            Assistant::builder().pipeline(pipeline()).build(),
            Err(KnowledgeError::Config(_))
        ));
    }
}
