//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chatdoc::{ChatConfig, ChatError, ChatSession, EmbeddingProvider, LanguageModel};

/// Embeds text as keyword counts over a fixed vocabulary.
///
/// Text mentioning none of the keywords maps to the zero vector, which scores
/// 0.0 against everything.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self { vocabulary: vocabulary.to_vec(), calls: AtomicUsize::new(0), fail: AtomicBool::new(false) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> chatdoc::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::generation("keywords", "embedding service unavailable"));
        }
        let lower = text.to_lowercase();
        Ok(self.vocabulary.iter().map(|word| lower.matches(word).count() as f32).collect())
    }

    fn name(&self) -> &str {
        "keywords"
    }
}

/// Records every prompt and answers with a fixed string.
pub struct RecordingModel {
    prompts: Mutex<Vec<String>>,
    fail: AtomicBool,
}

pub const STUB_ANSWER: &str = "The information is not available in the document.";

impl RecordingModel {
    pub fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, prompt: &str) -> chatdoc::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::generation("recording", "model is overloaded"));
        }
        Ok(STUB_ANSWER.to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub const VOCABULARY: &[&str] = &["rust", "python", "cooking"];

/// Three short paragraphs, each about one vocabulary word.
pub const LANGUAGES_DOC: &str = "Rust guarantees memory safety without a garbage collector.\n\n\
Python is popular for data science and quick scripting work.\n\n\
Cooking pasta needs salted boiling water and some patience.";

pub struct Harness {
    pub embedder: Arc<KeywordEmbedder>,
    pub model: Arc<RecordingModel>,
    pub session: ChatSession,
}

pub fn harness(config: ChatConfig) -> Harness {
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let model = Arc::new(RecordingModel::new());
    let session = ChatSession::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .language_model(model.clone())
        .build()
        .unwrap();
    Harness { embedder, model, session }
}

/// Small chunks so each paragraph lands in its own chunk.
pub fn small_chunk_config() -> ChatConfig {
    ChatConfig::builder().chunk_size(80).chunk_overlap(10).build().unwrap()
}
