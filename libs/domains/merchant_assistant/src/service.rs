use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AssistantError, AssistantResult};
use crate::models::{Interaction, InteractionFilter, UpdateInteraction};
use crate::repository::ConversationRepository;

/// Largest page a list call may request
const MAX_PAGE_SIZE: usize = 200;

/// CRUD edit flow over stored turns. Creation goes through the assistant
/// pipeline; edits here never touch the vector index.
pub struct InteractionService<R: ConversationRepository> {
    repository: Arc<R>,
}

impl<R: ConversationRepository> Clone for InteractionService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ConversationRepository> InteractionService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Get a turn by ID
    pub async fn get_interaction(&self, id: Uuid) -> AssistantResult<Interaction> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(AssistantError::NotFound(id))
    }

    /// List turns newest first
    pub async fn list_interactions(
        &self,
        mut filter: InteractionFilter,
    ) -> AssistantResult<Vec<Interaction>> {
        if filter.limit == 0 || filter.limit > MAX_PAGE_SIZE {
            return Err(AssistantError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        filter.merchant_id = filter.merchant_id.filter(|m| !m.trim().is_empty());

        self.repository.list(filter).await
    }

    /// Edit a turn's query or response
    pub async fn update_interaction(
        &self,
        id: Uuid,
        input: UpdateInteraction,
    ) -> AssistantResult<Interaction> {
        input
            .validate()
            .map_err(|e| AssistantError::InvalidInput(e.to_string()))?;

        let updated = self.repository.update(id, input).await?;
        tracing::info!(interaction_id = %id, "Interaction edited");
        Ok(updated)
    }

    /// Delete a turn. Its embeddings stay in the index and are skipped at
    /// retrieval time since the turn no longer resolves.
    pub async fn delete_interaction(&self, id: Uuid) -> AssistantResult<()> {
        if !self.repository.delete(id).await? {
            return Err(AssistantError::NotFound(id));
        }
        tracing::info!(interaction_id = %id, "Interaction deleted");
        Ok(())
    }
}
