//! Prompt construction and answer generation.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::error::{ChatError, Result};
use crate::llm::LanguageModel;

const QUESTION: &str = "{question}";
const CONTEXT: &str = "{context}";

/// Instruction used when no custom template is configured.
pub const DEFAULT_TEMPLATE: &str = "<s> [Instruction] You are an assistant tasked with answering \
questions based on the provided document. Utilize the context from the document to formulate \
your response. If the answer is not available within the document, indicate that the \
information is not available. Aim for responses that are direct, informative, and no longer \
than three sentences. [/Instruction] </s>
[Instruction] Question: {question}
Context: {context}
Answer: [/Instruction]";

/// Separator placed between retrieved chunks in the context section.
const CHUNK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Question,
    Context,
}

/// A prompt template with `{question}` and `{context}` placeholders.
///
/// The template is split into segments once, so text inside the question or
/// the context is never interpreted as a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] unless both placeholders appear.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let source = template.into();
        let segments = parse_segments(&source);

        for (placeholder, segment) in [(QUESTION, Segment::Question), (CONTEXT, Segment::Context)] {
            if !segments.contains(&segment) {
                return Err(ChatError::Config(format!(
                    "prompt template must contain the {placeholder} placeholder"
                )));
            }
        }

        Ok(Self { source, segments })
    }

    /// The template text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute the placeholders.
    pub fn render(&self, question: &str, context: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + question.len() + context.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Question => out.push_str(question),
                Segment::Context => out.push_str(context),
            }
        }
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { source: DEFAULT_TEMPLATE.to_string(), segments: parse_segments(DEFAULT_TEMPLATE) }
    }
}

fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;

    loop {
        let next = [(QUESTION, Segment::Question), (CONTEXT, Segment::Context)]
            .into_iter()
            .filter_map(|(placeholder, segment)| rest.find(placeholder).map(|pos| (pos, placeholder, segment)))
            .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, placeholder, segment)) => {
                if pos > 0 {
                    segments.push(Segment::Literal(rest[..pos].to_string()));
                }
                segments.push(segment);
                rest = &rest[pos + placeholder.len()..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                return segments;
            }
        }
    }
}

/// A fully rendered prompt, ready for the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// The rendered prompt text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the prompt, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the prompt from retrieved chunks and asks the language model.
///
/// An empty [`RetrievalResult`] produces an empty context section; telling the
/// user that the document does not contain the answer is left to the model.
#[derive(Clone)]
pub struct AnswerComposer {
    template: PromptTemplate,
    model: Arc<dyn LanguageModel>,
}

impl AnswerComposer {
    /// Create a composer using [`DEFAULT_TEMPLATE`].
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { template: PromptTemplate::default(), model }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// The template used by [`compose`](Self::compose).
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Render the prompt: instruction, the question verbatim, and the retrieved
    /// chunks in ranked order as context.
    pub fn compose(&self, question: &str, retrieval: &RetrievalResult) -> Prompt {
        let context =
            retrieval.chunks().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>().join(CHUNK_SEPARATOR);
        Prompt(self.template.render(question, &context))
    }

    /// Send a rendered prompt to the language model and return its response unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Generation`] wrapping any model or transport failure.
    pub async fn generate(&self, prompt: &Prompt) -> Result<String> {
        debug!(model = self.model.name(), prompt_len = prompt.as_str().len(), "generating answer");
        self.model.generate(prompt.as_str()).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "generation failed");
            match e {
                ChatError::Generation { .. } => e,
                other => ChatError::generation(self.model.name(), other.to_string()),
            }
        })
    }

    /// [`compose`](Self::compose) then [`generate`](Self::generate).
    pub async fn answer(&self, question: &str, retrieval: &RetrievalResult) -> Result<String> {
        let prompt = self.compose(question, retrieval);
        self.generate(&prompt).await
    }
}

impl fmt::Debug for AnswerComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("template", &self.template.as_str())
            .field("model", &self.model.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::document::{Chunk, ScoredChunk};

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("  echo: {prompt}\n"))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl LanguageModel for BrokenModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(ChatError::Config("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn hit(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                index: 0,
                start: 0,
                document_id: "doc".to_string(),
                metadata: HashMap::new(),
            },
            score,
        }
    }

    #[test]
    fn default_template_has_both_placeholders() {
        assert!(PromptTemplate::new(DEFAULT_TEMPLATE).is_ok());
        assert_eq!(PromptTemplate::default(), PromptTemplate::new(DEFAULT_TEMPLATE).unwrap());
    }

    #[test]
    fn template_without_placeholders_is_rejected() {
        let err = PromptTemplate::new("Context: {context}").unwrap_err();
        assert!(matches!(err, ChatError::Config(msg) if msg.contains("{question}")));
        assert!(PromptTemplate::new("Q: {question}").is_err());
    }

    #[test]
    fn compose_places_chunks_in_rank_order() {
        let composer = AnswerComposer::new(Arc::new(EchoModel))
            .with_template(PromptTemplate::new("Q={question}|C={context}|").unwrap());
        let retrieval = RetrievalResult::new(vec![hit("first", 0.9), hit("second", 0.5)]);

        let prompt = composer.compose("What is it?", &retrieval);
        assert_eq!(prompt.as_str(), "Q=What is it?|C=first\n\nsecond|");
    }

    #[test]
    fn empty_retrieval_leaves_context_section_empty() {
        let composer = AnswerComposer::new(Arc::new(EchoModel));
        let prompt = composer.compose("unrelated question", &RetrievalResult::default());

        assert!(prompt.as_str().contains("Question: unrelated question\n"));
        assert!(prompt.as_str().contains("Context: \nAnswer:"));
    }

    #[test]
    fn placeholders_inside_the_question_are_not_expanded() {
        let composer = AnswerComposer::new(Arc::new(EchoModel))
            .with_template(PromptTemplate::new("{question}/{context}").unwrap());
        let retrieval = RetrievalResult::new(vec![hit("ctx", 1.0)]);

        let prompt = composer.compose("what is {context}?", &retrieval);
        assert_eq!(prompt.as_str(), "what is {context}?/ctx");
    }

    #[tokio::test]
    async fn answer_returns_model_output_unmodified() {
        let composer = AnswerComposer::new(Arc::new(EchoModel))
            .with_template(PromptTemplate::new("{question}{context}").unwrap());
        let answer = composer.answer("hi", &RetrievalResult::default()).await.unwrap();
        assert_eq!(answer, "  echo: hi\n");
    }

    #[tokio::test]
    async fn model_failures_become_generation_errors() {
        let composer = AnswerComposer::new(Arc::new(BrokenModel));
        let err = composer.answer("hi", &RetrievalResult::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Generation { ref service, ref message }
                if service == "broken" && message.contains("connection refused")
        ));
    }
}
