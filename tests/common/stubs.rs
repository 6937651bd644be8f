//! Deterministic stand-ins for the embedding and generation providers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use narrascope::embedding::EmbeddingService;
use narrascope::generation::{GenerationRequest, GenerationService};
use narrascope::ScopeError;

/// Exact text -> vector table with a fallback for unknown texts.
pub struct FixedEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    pub batch_calls: AtomicUsize,
    pub texts_embedded: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            table: HashMap::new(),
            fallback,
            batch_calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.table
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl EmbeddingService for FixedEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError> {
        self.texts_embedded.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.fallback.len()
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Bag-of-bytes embedding: component `b % 8` counts byte `b`. Never negative,
/// so every similarity it produces is in `[0, 1]`.
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub const DIMS: usize = 8;

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; Self::DIMS];
        for b in text.bytes() {
            v[b as usize % Self::DIMS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        Self::DIMS
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ScopeError> {
        Err(ScopeError::provider("embedding backend offline"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        Err(ScopeError::provider("embedding backend offline"))
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// What a scripted generation call does.
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

/// Replays scripted responses in order, then repeats `default`.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Script>>,
    default: String,
    pub prompts: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn always(response: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: response.to_string(),
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn then(self, step: Script) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ScopeError> {
        self.prompts.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Fail) => Err(ScopeError::provider("model overloaded")),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            None => Ok(self.default.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }
}
