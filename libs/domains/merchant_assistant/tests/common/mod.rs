#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use domain_merchant_assistant::{
    AssistantConfig, AssistantError, AssistantResult, CompletionProvider,
    ConversationRepository, EmbeddingProvider, EmbeddingRecord, InMemoryConversationRepository,
    InMemoryVectorIndex, Interaction, InteractionFilter, MerchantAssistant, UpdateInteraction,
    UpstreamService, VectorIndex, VectorMatch,
};
use uuid::Uuid;

const VOCABULARY: [&str; 8] = [
    "sales",
    "marketing",
    "cost",
    "inventory",
    "price",
    "customer",
    "staff",
    "delivery",
];

/// One slot per vocabulary word plus a constant bias slot
pub const DIMENSION: u32 = VOCABULARY.len() as u32 + 1;

/// Deterministic bag-of-words embedder
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(1.0);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn dimension(&self) -> u32 {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(AssistantError::InvalidInput(
                "text to embed must not be empty".to_string(),
            ));
        }
        Ok(Self::vector_for(text))
    }
}

/// Answers every prompt with a fixed text and remembers what it was asked
pub struct RecordingCompleter {
    answer: String,
    delay: Option<Duration>,
    failure: Option<StatusCode>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingCompleter {
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            delay: None,
            failure: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Provider that rejects every request with `status`
    pub fn failing(status: StatusCode) -> Self {
        Self {
            failure: Some(status),
            ..Self::answering("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts().pop().expect("completer was never called")
    }
}

#[async_trait]
impl CompletionProvider for RecordingCompleter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn complete(&self, prompt: &str, _max_tokens: u32) -> AssistantResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failure {
            Some(status) => Err(AssistantError::upstream(
                UpstreamService::Completion,
                status,
                "provider unavailable",
            )),
            None => Ok(self.answer.clone()),
        }
    }
}

/// In-memory index whose reads or writes can be switched off
#[derive(Default)]
pub struct FlakyIndex {
    pub inner: InMemoryVectorIndex,
    fail_queries: AtomicBool,
    fail_upserts: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self {
            inner: InMemoryVectorIndex::with_dimension(DIMENSION),
            ..Default::default()
        }
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::SeqCst);
    }

    fn outage() -> AssistantError {
        AssistantError::upstream(
            UpstreamService::VectorIndex,
            StatusCode::BAD_GATEWAY,
            "connection refused",
        )
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn ensure_ready(&self) -> AssistantResult<()> {
        self.inner.ensure_ready().await
    }

    async fn is_ready(&self) -> bool {
        !self.fail_queries.load(Ordering::SeqCst)
    }

    async fn upsert(&self, record: EmbeddingRecord) -> AssistantResult<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.upsert(record).await
    }

    async fn query(
        &self,
        vector: &[f32],
        merchant_id: &str,
        top_k: usize,
    ) -> AssistantResult<Vec<VectorMatch>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.query(vector, merchant_id, top_k).await
    }
}

/// Store whose writes commit and then stall before acknowledging
pub struct StallingStore {
    pub inner: InMemoryConversationRepository,
    stall: Duration,
}

impl StallingStore {
    pub fn new(stall: Duration) -> Self {
        Self {
            inner: InMemoryConversationRepository::new(),
            stall,
        }
    }
}

#[async_trait]
impl ConversationRepository for StallingStore {
    async fn create(
        &self,
        merchant_id: &str,
        query: &str,
        response: &str,
    ) -> AssistantResult<Interaction> {
        let interaction = self.inner.create(merchant_id, query, response).await?;
        tokio::time::sleep(self.stall).await;
        Ok(interaction)
    }

    async fn get_by_id(&self, id: Uuid) -> AssistantResult<Option<Interaction>> {
        self.inner.get_by_id(id).await
    }

    async fn list(&self, filter: InteractionFilter) -> AssistantResult<Vec<Interaction>> {
        self.inner.list(filter).await
    }

    async fn find_by_ids(
        &self,
        merchant_id: &str,
        ids: Vec<Uuid>,
    ) -> AssistantResult<Vec<Interaction>> {
        self.inner.find_by_ids(merchant_id, ids).await
    }

    async fn update(&self, id: Uuid, input: UpdateInteraction) -> AssistantResult<Interaction> {
        self.inner.update(id, input).await
    }

    async fn delete(&self, id: Uuid) -> AssistantResult<bool> {
        self.inner.delete(id).await
    }

    async fn ping(&self) -> AssistantResult<()> {
        self.inner.ping().await
    }
}

/// A pipeline wired to in-memory collaborators, with handles to inspect them
pub struct Harness {
    pub repository: Arc<InMemoryConversationRepository>,
    pub embedder: Arc<KeywordEmbedder>,
    pub completer: Arc<RecordingCompleter>,
    pub index: Arc<FlakyIndex>,
    pub assistant: MerchantAssistant<InMemoryConversationRepository>,
}

impl Harness {
    pub fn new(completer: RecordingCompleter) -> Self {
        Self::with_config(completer, AssistantConfig::default())
    }

    pub fn with_config(completer: RecordingCompleter, config: AssistantConfig) -> Self {
        let repository = Arc::new(InMemoryConversationRepository::new());
        let embedder = Arc::new(KeywordEmbedder::default());
        let completer = Arc::new(completer);
        let index = Arc::new(FlakyIndex::new());

        let assistant = MerchantAssistant::new(
            Arc::clone(&repository),
            embedder.clone(),
            completer.clone(),
            index.clone(),
            config,
        );

        Self {
            repository,
            embedder,
            completer,
            index,
            assistant,
        }
    }
}
