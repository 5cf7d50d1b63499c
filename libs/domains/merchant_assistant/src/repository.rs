use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AssistantError, AssistantResult};
use crate::models::{Interaction, InteractionFilter, UpdateInteraction};

/// Durable record of each query/response turn
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Persist a new turn; the id and timestamps are assigned here
    async fn create(
        &self,
        merchant_id: &str,
        query: &str,
        response: &str,
    ) -> AssistantResult<Interaction>;

    /// Get a turn by ID
    async fn get_by_id(&self, id: Uuid) -> AssistantResult<Option<Interaction>>;

    /// List turns newest first
    async fn list(&self, filter: InteractionFilter) -> AssistantResult<Vec<Interaction>>;

    /// Fetch the given turns owned by `merchant_id`; unknown ids and ids of
    /// other merchants are silently skipped. Order is unspecified.
    async fn find_by_ids(
        &self,
        merchant_id: &str,
        ids: Vec<Uuid>,
    ) -> AssistantResult<Vec<Interaction>>;

    /// Edit a turn's text
    async fn update(&self, id: Uuid, input: UpdateInteraction) -> AssistantResult<Interaction>;

    /// Delete a turn, returning whether it existed
    async fn delete(&self, id: Uuid) -> AssistantResult<bool>;

    /// Cheap connectivity probe used by readiness checks
    async fn ping(&self) -> AssistantResult<()>;
}

/// In-memory implementation of ConversationRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryConversationRepository {
    interactions: Arc<RwLock<HashMap<Uuid, Interaction>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self {
            interactions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed a turn with caller-chosen fields, e.g. fixed timestamps in tests
    pub async fn insert(&self, interaction: Interaction) {
        let mut interactions = self.interactions.write().await;
        interactions.insert(interaction.id, interaction);
    }

    pub async fn count(&self) -> usize {
        self.interactions.read().await.len()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(
        &self,
        merchant_id: &str,
        query: &str,
        response: &str,
    ) -> AssistantResult<Interaction> {
        let interaction = Interaction::new(
            merchant_id.to_string(),
            query.to_string(),
            response.to_string(),
        );

        let mut interactions = self.interactions.write().await;
        interactions.insert(interaction.id, interaction.clone());

        tracing::debug!(interaction_id = %interaction.id, merchant_id, "Created interaction");
        Ok(interaction)
    }

    async fn get_by_id(&self, id: Uuid) -> AssistantResult<Option<Interaction>> {
        let interactions = self.interactions.read().await;
        Ok(interactions.get(&id).cloned())
    }

    async fn list(&self, filter: InteractionFilter) -> AssistantResult<Vec<Interaction>> {
        let interactions = self.interactions.read().await;

        let mut result: Vec<Interaction> = interactions
            .values()
            .filter(|i| match &filter.merchant_id {
                Some(merchant_id) => &i.merchant_id == merchant_id,
                None => true,
            })
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn find_by_ids(
        &self,
        merchant_id: &str,
        ids: Vec<Uuid>,
    ) -> AssistantResult<Vec<Interaction>> {
        let interactions = self.interactions.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| interactions.get(id))
            .filter(|i| i.merchant_id == merchant_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, input: UpdateInteraction) -> AssistantResult<Interaction> {
        let mut interactions = self.interactions.write().await;

        let interaction = interactions
            .get_mut(&id)
            .ok_or(AssistantError::NotFound(id))?;

        interaction.apply_update(input);
        Ok(interaction.clone())
    }

    async fn delete(&self, id: Uuid) -> AssistantResult<bool> {
        let mut interactions = self.interactions.write().await;
        Ok(interactions.remove(&id).is_some())
    }

    async fn ping(&self) -> AssistantResult<()> {
        Ok(())
    }
}
