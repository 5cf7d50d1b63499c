use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_config::{env_duration_secs, env_parse};
use observability::{AssistantMetrics, StageTimer};
use tracing::{Span, field, instrument};
use uuid::Uuid;
use validator::Validate;

use super::prompts::build_prompt;
use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::index::VectorIndex;
use crate::models::{
    ContextPair, CreateInteraction, EmbeddingKind, EmbeddingRecord, Interaction,
    RetrievedContext,
};
use crate::repository::ConversationRepository;

/// Each turn is indexed twice (query and response), so this many records
/// per wanted turn are requested to still find `top_k` distinct turns.
const RECORDS_PER_TURN: usize = 2;

/// Upper bound on index hits requested while skipping deleted turns
const MAX_CONTEXT_FETCH: usize = 256;

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Prior turns rendered into the prompt
    pub top_k: usize,
    /// Completion token budget
    pub max_tokens: u32,
    pub embedding_timeout: Duration,
    pub vector_timeout: Duration,
    pub completion_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_tokens: 500,
            embedding_timeout: Duration::from_secs(10),
            vector_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> AssistantResult<Self> {
        let max_tokens: u32 = env_parse("ASSISTANT_MAX_TOKENS", 500)?;
        if max_tokens == 0 {
            return Err(AssistantError::Config(
                "ASSISTANT_MAX_TOKENS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            top_k: env_parse("ASSISTANT_TOP_K", 3)?,
            max_tokens,
            embedding_timeout: env_duration_secs("ASSISTANT_EMBEDDING_TIMEOUT_SECS", 10)?,
            vector_timeout: env_duration_secs("ASSISTANT_VECTOR_TIMEOUT_SECS", 10)?,
            completion_timeout: env_duration_secs("ASSISTANT_COMPLETION_TIMEOUT_SECS", 30)?,
            store_timeout: env_duration_secs("ASSISTANT_STORE_TIMEOUT_SECS", 10)?,
        })
    }
}

/// Retrieval-augmented conversation pipeline.
///
/// One attempt per request. Embedding, completion and persistence failures
/// abort the request; retrieval failures degrade to an empty context;
/// embedding storage failures after persistence are logged and counted only.
pub struct MerchantAssistant<R: ConversationRepository> {
    repository: Arc<R>,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    index: Arc<dyn VectorIndex>,
    config: AssistantConfig,
}

impl<R: ConversationRepository> MerchantAssistant<R> {
    pub fn new(
        repository: Arc<R>,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        index: Arc<dyn VectorIndex>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            repository,
            embedder,
            completer,
            index,
            config,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Answer a merchant query and record the turn
    #[instrument(
        skip(self, input),
        fields(merchant_id = %input.merchant_id, interaction_id = field::Empty)
    )]
    pub async fn create_interaction(
        &self,
        input: CreateInteraction,
    ) -> AssistantResult<Interaction> {
        let started = Instant::now();
        let result = self.run(input).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => outcome_label(err),
        };
        AssistantMetrics::record_interaction(outcome, started.elapsed().as_secs_f64());

        if let Err(err) = &result {
            tracing::warn!(error = %err, "Interaction failed");
        }
        result
    }

    async fn run(&self, input: CreateInteraction) -> AssistantResult<Interaction> {
        input
            .validate()
            .map_err(|e| AssistantError::InvalidInput(e.to_string()))?;

        let CreateInteraction {
            merchant_id,
            query,
            profile,
        } = input;

        let query_vector = self
            .stage(
                "embed_query",
                self.config.embedding_timeout,
                || AssistantError::timeout(UpstreamService::Embedding),
                self.embedder.embed(&query),
            )
            .await?;

        let context = self.retrieve_context(&merchant_id, &query_vector).await;
        AssistantMetrics::record_context_size(context.len());

        let prompt = build_prompt(&query, &merchant_id, profile.as_ref(), &context);

        let response = self
            .stage(
                "complete",
                self.config.completion_timeout,
                || AssistantError::timeout(UpstreamService::Completion),
                self.completer.complete(&prompt, self.config.max_tokens),
            )
            .await?;

        // A timeout here cannot tell whether the insert committed; such a
        // turn stays stored but is never indexed.
        let interaction = self
            .stage(
                "persist",
                self.config.store_timeout,
                || AssistantError::Persistence("conversation store timed out".to_string()),
                self.repository.create(&merchant_id, &query, &response),
            )
            .await?;

        Span::current().record("interaction_id", field::display(interaction.id));
        tracing::info!(
            context_pairs = context.len(),
            "Interaction persisted"
        );

        self.persist_embeddings(&interaction, query_vector).await;

        Ok(interaction)
    }

    /// Prior turns most similar to the query. Never fails; any error yields
    /// an empty context.
    async fn retrieve_context(&self, merchant_id: &str, vector: &[f32]) -> RetrievedContext {
        match self.try_retrieve_context(merchant_id, vector).await {
            Ok(context) => context,
            Err(err) => {
                let reason = match err {
                    AssistantError::Persistence(_) => "conversation_store",
                    _ => "vector_index",
                };
                tracing::warn!(
                    merchant_id,
                    reason,
                    error = %err,
                    "Context retrieval failed, continuing without history"
                );
                AssistantMetrics::record_retrieval_degraded(reason);
                RetrievedContext::empty()
            }
        }
    }

    async fn try_retrieve_context(
        &self,
        merchant_id: &str,
        vector: &[f32],
    ) -> AssistantResult<RetrievedContext> {
        let top_k = self.config.top_k;
        if top_k == 0 {
            return Ok(RetrievedContext::empty());
        }

        let mut limit = top_k.saturating_mul(RECORDS_PER_TURN);
        let mut checked: HashSet<Uuid> = HashSet::new();
        let mut live: HashMap<Uuid, Interaction> = HashMap::new();

        // Vectors of deleted turns stay in the index, so widen the search
        // until top_k live turns resolve or the index has nothing more.
        loop {
            let matches = self
                .stage(
                    "retrieve",
                    self.config.vector_timeout,
                    || AssistantError::timeout(UpstreamService::VectorIndex),
                    self.index.query(vector, merchant_id, limit),
                )
                .await?;
            let exhausted = matches.len() < limit;

            // best-ranked occurrence of each turn wins
            let mut ranked_ids: Vec<Uuid> = Vec::with_capacity(matches.len());
            for m in matches {
                if m.metadata.merchant_id != merchant_id {
                    continue;
                }
                if !ranked_ids.contains(&m.ref_id) {
                    ranked_ids.push(m.ref_id);
                }
            }

            let unchecked: Vec<Uuid> = ranked_ids
                .iter()
                .filter(|id| !checked.contains(*id))
                .copied()
                .collect();
            if !unchecked.is_empty() {
                checked.extend(unchecked.iter().copied());
                let turns = self
                    .stage(
                        "resolve_context",
                        self.config.store_timeout,
                        || AssistantError::Persistence("conversation store timed out".to_string()),
                        self.repository.find_by_ids(merchant_id, unchecked),
                    )
                    .await?;
                live.extend(
                    turns
                        .into_iter()
                        .filter(|t| t.merchant_id == merchant_id)
                        .map(|t| (t.id, t)),
                );
            }

            let resolved = ranked_ids.iter().filter(|id| live.contains_key(*id)).count();
            if resolved >= top_k || exhausted || limit >= MAX_CONTEXT_FETCH {
                let pairs: Vec<ContextPair> = ranked_ids
                    .iter()
                    .filter_map(|id| live.remove(id))
                    .take(top_k)
                    .map(|turn| ContextPair {
                        query: turn.query,
                        response: turn.response,
                    })
                    .collect();
                return Ok(RetrievedContext { pairs });
            }

            tracing::debug!(limit, resolved, "Stale index hits, widening context search");
            limit = limit.saturating_mul(2).min(MAX_CONTEXT_FETCH);
        }
    }

    /// Store the query and response embeddings concurrently. Failures leave
    /// the turn durable but less retrievable.
    async fn persist_embeddings(&self, interaction: &Interaction, query_vector: Vec<f32>) {
        let query_record =
            EmbeddingRecord::for_interaction(interaction, EmbeddingKind::Query, query_vector);

        let query_side = self.upsert(query_record);
        let response_side = async {
            let vector = self
                .stage(
                    "embed_response",
                    self.config.embedding_timeout,
                    || AssistantError::timeout(UpstreamService::Embedding),
                    self.embedder.embed(&interaction.response),
                )
                .await?;

            self.upsert(EmbeddingRecord::for_interaction(
                interaction,
                EmbeddingKind::Response,
                vector,
            ))
            .await
        };

        let (query_result, response_result) = tokio::join!(query_side, response_side);

        for (kind, result) in [
            (EmbeddingKind::Query, query_result),
            (EmbeddingKind::Response, response_result),
        ] {
            if let Err(err) = result {
                tracing::warn!(
                    kind = %kind,
                    error = %err,
                    "Embedding not stored; turn will be missing from retrieval"
                );
                AssistantMetrics::record_embedding_upsert_failed(&kind.to_string());
            }
        }
    }

    async fn upsert(&self, record: EmbeddingRecord) -> AssistantResult<()> {
        self.stage(
            "upsert",
            self.config.vector_timeout,
            || AssistantError::timeout(UpstreamService::VectorIndex),
            self.index.upsert(record),
        )
        .await
    }

    /// Run one external call under its deadline, recording duration and outcome
    async fn stage<T, F>(
        &self,
        stage: &'static str,
        limit: Duration,
        on_timeout: impl FnOnce() -> AssistantError,
        call: F,
    ) -> AssistantResult<T>
    where
        F: Future<Output = AssistantResult<T>>,
    {
        let timer = StageTimer::start(stage);

        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => {
                timer.finish("ok");
                Ok(value)
            }
            Ok(Err(err)) => {
                timer.finish(outcome_label(&err));
                Err(err)
            }
            Err(_) => {
                timer.finish("timeout");
                tracing::debug!(stage, timeout_ms = limit.as_millis() as u64, "Stage timed out");
                Err(on_timeout())
            }
        }
    }
}

fn outcome_label(err: &AssistantError) -> &'static str {
    match err {
        AssistantError::Upstream { status, .. }
            if *status == axum::http::StatusCode::GATEWAY_TIMEOUT =>
        {
            "timeout"
        }
        AssistantError::InvalidInput(_) => "invalid",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockCompletionProvider;
    use crate::embedding::MockEmbeddingProvider;
    use crate::index::MockVectorIndex;
    use crate::models::{VectorMatch, VectorMetadata};
    use crate::repository::MockConversationRepository;
    use axum::http::StatusCode;

    fn turn(merchant_id: &str, query: &str, response: &str) -> Interaction {
        Interaction::new(
            merchant_id.to_string(),
            query.to_string(),
            response.to_string(),
        )
    }

    fn hit(interaction: &Interaction, kind: EmbeddingKind, score: f32) -> VectorMatch {
        VectorMatch {
            ref_id: interaction.id,
            score,
            metadata: VectorMetadata {
                merchant_id: interaction.merchant_id.clone(),
                kind,
                created_at: interaction.created_at,
            },
        }
    }

    fn assistant(
        repo: MockConversationRepository,
        embedder: MockEmbeddingProvider,
        completer: MockCompletionProvider,
        index: MockVectorIndex,
    ) -> MerchantAssistant<MockConversationRepository> {
        MerchantAssistant::new(
            Arc::new(repo),
            Arc::new(embedder),
            Arc::new(completer),
            Arc::new(index),
            AssistantConfig::default(),
        )
    }

    fn embedder_ok() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.1, 0.2, 0.3]));
        embedder
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_any_call() {
        let assistant = assistant(
            MockConversationRepository::new(),
            MockEmbeddingProvider::new(),
            MockCompletionProvider::new(),
            MockVectorIndex::new(),
        );

        let err = assistant
            .create_interaction(CreateInteraction::new("m1", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput(_)));

        let err = assistant
            .create_interaction(CreateInteraction::new("", "How do I grow?"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_before_completion() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().times(1).returning(|_| {
            Err(AssistantError::upstream(
                UpstreamService::Embedding,
                StatusCode::UNAUTHORIZED,
                "bad key",
            ))
        });

        let assistant = assistant(
            MockConversationRepository::new(),
            embedder,
            MockCompletionProvider::new(),
            MockVectorIndex::new(),
        );

        let err = assistant
            .create_interaction(CreateInteraction::new("m1", "q"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Upstream {
                service: UpstreamService::Embedding,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_completion_failure_persists_nothing() {
        let mut index = MockVectorIndex::new();
        index.expect_query().returning(|_, _, _| Ok(vec![]));

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(AssistantError::timeout(UpstreamService::Completion)));

        // no create expectation: any persistence attempt panics
        let assistant = assistant(
            MockConversationRepository::new(),
            embedder_ok(),
            completer,
            index,
        );

        let err = assistant
            .create_interaction(CreateInteraction::new("m1", "q"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_persistence_failure_skips_embeddings() {
        let mut index = MockVectorIndex::new();
        index.expect_query().returning(|_, _, _| Ok(vec![]));
        index.expect_upsert().never();

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .returning(|_, _| Ok("Run a weekday promotion.".to_string()));

        let mut repo = MockConversationRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|_, _, _| Err(AssistantError::Persistence("disk full".to_string())));

        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .times(1)
            .returning(|_| Ok(vec![0.1, 0.2, 0.3]));

        let assistant = assistant(repo, embedder, completer, index);

        let err = assistant
            .create_interaction(CreateInteraction::new("m1", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_retrieval_outage_degrades_to_empty_context() {
        let mut index = MockVectorIndex::new();
        index.expect_query().returning(|_, _, _| {
            Err(AssistantError::upstream(
                UpstreamService::VectorIndex,
                StatusCode::BAD_GATEWAY,
                "connection refused",
            ))
        });
        index.expect_upsert().times(2).returning(|_| Ok(()));

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .withf(|prompt, max_tokens| !prompt.contains("Previous Query") && *max_tokens == 500)
            .times(1)
            .returning(|_, _| Ok("Try bundling products.".to_string()));

        let mut repo = MockConversationRepository::new();
        repo.expect_create()
            .returning(|m, q, r| Ok(turn(m, q, r)));

        let assistant = assistant(repo, embedder_ok(), completer, index);

        let created = assistant
            .create_interaction(CreateInteraction::new("m1", "How do I raise basket size?"))
            .await
            .unwrap();
        assert_eq!(created.response, "Try bundling products.");
    }

    #[tokio::test]
    async fn test_context_deduplicated_by_turn_and_capped() {
        let turns: Vec<Interaction> = (0..4)
            .map(|i| turn("m1", &format!("q{i}"), &format!("r{i}")))
            .collect();

        let matches = vec![
            hit(&turns[0], EmbeddingKind::Query, 0.99),
            hit(&turns[0], EmbeddingKind::Response, 0.98),
            hit(&turns[1], EmbeddingKind::Response, 0.90),
            hit(&turns[2], EmbeddingKind::Query, 0.80),
            hit(&turns[3], EmbeddingKind::Query, 0.70),
        ];

        let mut index = MockVectorIndex::new();
        index
            .expect_query()
            .withf(|_, merchant_id, top_k| merchant_id.to_string() == "m1" && *top_k == 6)
            .returning(move |_, _, _| Ok(matches.clone()));
        index.expect_upsert().returning(|_| Ok(()));

        let stored = turns.clone();
        let mut repo = MockConversationRepository::new();
        repo.expect_find_by_ids()
            .returning(move |_, ids| {
                Ok(stored
                    .iter()
                    .filter(|t| ids.contains(&t.id))
                    .cloned()
                    .collect())
            });
        repo.expect_create().returning(|m, q, r| Ok(turn(m, q, r)));

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .withf(|prompt, _| {
                prompt.matches("Previous Query:").count() == 3
                    && prompt.contains("Previous Query: q0")
                    && prompt.contains("Previous Query: q2")
                    && !prompt.contains("Previous Query: q3")
                    && prompt.find("q0").unwrap() < prompt.find("q1").unwrap()
            })
            .returning(|_, _| Ok("answer".to_string()));

        let assistant = assistant(repo, embedder_ok(), completer, index);

        assistant
            .create_interaction(CreateInteraction::new("m1", "new question"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_failure_does_not_change_result() {
        let mut index = MockVectorIndex::new();
        index.expect_query().returning(|_, _, _| Ok(vec![]));
        index.expect_upsert().times(2).returning(|record| {
            if record.kind == EmbeddingKind::Response {
                Err(AssistantError::timeout(UpstreamService::VectorIndex))
            } else {
                Ok(())
            }
        });

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .returning(|_, _| Ok("answer".to_string()));

        let mut repo = MockConversationRepository::new();
        repo.expect_create().returning(|m, q, r| Ok(turn(m, q, r)));

        let assistant = assistant(repo, embedder_ok(), completer, index);

        let created = assistant
            .create_interaction(CreateInteraction::new("m1", "q"))
            .await
            .unwrap();
        assert_eq!(created.merchant_id, "m1");
        assert_eq!(created.response, "answer");
    }

    #[tokio::test]
    async fn test_query_vector_reused_and_records_tagged() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .withf(|text| text.to_string() == "q")
            .times(1)
            .returning(|_| Ok(vec![1.0, 0.0, 0.0]));
        embedder
            .expect_embed()
            .withf(|text| text.to_string() == "answer")
            .times(1)
            .returning(|_| Ok(vec![0.0, 1.0, 0.0]));

        let mut index = MockVectorIndex::new();
        index.expect_query().returning(|_, _, _| Ok(vec![]));
        index
            .expect_upsert()
            .withf(|record| {
                record.merchant_id == "m1"
                    && match record.kind {
                        EmbeddingKind::Query => record.vector == vec![1.0, 0.0, 0.0],
                        EmbeddingKind::Response => record.vector == vec![0.0, 1.0, 0.0],
                    }
            })
            .times(2)
            .returning(|_| Ok(()));

        let mut completer = MockCompletionProvider::new();
        completer
            .expect_complete()
            .returning(|_, _| Ok("answer".to_string()));

        let mut repo = MockConversationRepository::new();
        repo.expect_create().returning(|m, q, r| Ok(turn(m, q, r)));

        let assistant = assistant(repo, embedder, completer, index);
        assistant
            .create_interaction(CreateInteraction::new("m1", "q"))
            .await
            .unwrap();
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("ASSISTANT_TOP_K", Some("5")),
                ("ASSISTANT_MAX_TOKENS", None),
                ("ASSISTANT_COMPLETION_TIMEOUT_SECS", Some("45")),
            ],
            || {
                let config = AssistantConfig::from_env().unwrap();
                assert_eq!(config.top_k, 5);
                assert_eq!(config.max_tokens, 500);
                assert_eq!(config.completion_timeout, Duration::from_secs(45));
                assert_eq!(config.embedding_timeout, Duration::from_secs(10));
            },
        );
    }

    #[test]
    fn test_config_rejects_zero_budget() {
        temp_env::with_var("ASSISTANT_MAX_TOKENS", Some("0"), || {
            assert!(matches!(
                AssistantConfig::from_env(),
                Err(AssistantError::Config(_))
            ));
        });
    }
}
