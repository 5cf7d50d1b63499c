use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{AssistantError, AssistantResult},
    models::{Interaction, InteractionFilter, UpdateInteraction},
    repository::ConversationRepository,
};

/// PostgreSQL conversation store backed by SeaORM
#[derive(Clone)]
pub struct PgConversationRepository {
    db: DatabaseConnection,
}

impl PgConversationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
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

        let active_model: entity::ActiveModel = (&interaction).into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(interaction_id = %model.id, merchant_id, "Created interaction");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> AssistantResult<Option<Interaction>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: InteractionFilter) -> AssistantResult<Vec<Interaction>> {
        let mut query = entity::Entity::find();

        if let Some(merchant_id) = filter.merchant_id {
            query = query.filter(entity::Column::MerchantId.eq(merchant_id));
        }

        let models = query
            .order_by_desc(entity::Column::CreatedAt)
            .order_by_desc(entity::Column::Id)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(
        &self,
        merchant_id: &str,
        ids: Vec<Uuid>,
    ) -> AssistantResult<Vec<Interaction>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let models = entity::Entity::find()
            .filter(entity::Column::MerchantId.eq(merchant_id))
            .filter(entity::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, input: UpdateInteraction) -> AssistantResult<Interaction> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AssistantError::NotFound(id))?;

        let mut interaction: Interaction = model.into();
        interaction.apply_update(input);

        let active_model: entity::ActiveModel = (&interaction).into();
        let updated = active_model.update(&self.db).await?;

        tracing::info!(interaction_id = %id, "Updated interaction");
        Ok(updated.into())
    }

    async fn delete(&self, id: Uuid) -> AssistantResult<bool> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn ping(&self) -> AssistantResult<()> {
        self.db.ping().await?;
        Ok(())
    }
}
