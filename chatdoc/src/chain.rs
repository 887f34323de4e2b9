//! Question-answering chain.
//!
//! A [`QaChain`] runs three typed stages in order, each callable on its own:
//!
//! 1. [`retrieve`](QaChain::retrieve): `&str` → [`RetrievalResult`]
//! 2. [`compose`](QaChain::compose): `(&str, &RetrievalResult)` → [`Prompt`]
//! 3. [`generate`](QaChain::generate): `&Prompt` → answer text

use tracing::info;

use crate::composer::{AnswerComposer, Prompt};
use crate::document::RetrievalResult;
use crate::error::Result;
use crate::retriever::Retriever;

/// Retriever and composer bound to one ingested document.
#[derive(Debug, Clone)]
pub struct QaChain {
    retriever: Retriever,
    composer: AnswerComposer,
}

impl QaChain {
    /// Create a chain from its retrieval and composition stages.
    pub fn new(retriever: Retriever, composer: AnswerComposer) -> Self {
        Self { retriever, composer }
    }

    /// The retrieval stage.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The prompt-and-generate stage.
    pub fn composer(&self) -> &AnswerComposer {
        &self.composer
    }

    /// Stage 1: find the chunks relevant to `question`.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        self.retriever.search(question).await
    }

    /// Stage 2: render the prompt.
    pub fn compose(&self, question: &str, retrieval: &RetrievalResult) -> Prompt {
        self.composer.compose(question, retrieval)
    }

    /// Stage 3: ask the language model.
    pub async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.composer.generate(prompt).await
    }

    /// Run all three stages for `question`.
    pub async fn invoke(&self, question: &str) -> Result<String> {
        let retrieval = self.retrieve(question).await?;
        let context_chunks = retrieval.len();
        let prompt = self.compose(question, &retrieval);
        let answer = self.generate(&prompt).await?;
        info!(context_chunks, answer_len = answer.len(), "answered question");
        Ok(answer)
    }
}
