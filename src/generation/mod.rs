// Generation module
// The generation gateway and the prompt/answer plumbing around it

pub mod prompt;

use async_trait::async_trait;

use crate::Result;

pub use prompt::{build_context, build_prompt, clean_answer};

/// Maps a prompt to generated text
///
/// Any failure, including a timeout or a malformed response, is reported as
/// [`crate::RagError::Gateway`].
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}
