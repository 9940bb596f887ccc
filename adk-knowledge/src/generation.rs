//! Generation collaborator trait.

use async_trait::async_trait;

use crate::error::Result;

/// A text generator that answers a question under a system instruction.
///
/// The assistant hands over the assembled prompt as the system turn and the
/// user's raw question as the second turn; everything about the model itself
/// is up to the implementation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer to `question` following `system_prompt`.
    async fn generate(&self, system_prompt: &str, question: &str) -> Result<String>;
}
