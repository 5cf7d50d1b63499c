use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the merchant_interactions table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchant_interactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub merchant_id: String,
    #[sea_orm(column_type = "Text")]
    pub query: String,
    #[sea_orm(column_type = "Text")]
    pub response: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Interaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            merchant_id: model.merchant_id,
            query: model.query,
            response: model.response,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::Interaction> for ActiveModel {
    fn from(interaction: &crate::models::Interaction) -> Self {
        ActiveModel {
            id: Set(interaction.id),
            merchant_id: Set(interaction.merchant_id.clone()),
            query: Set(interaction.query.clone()),
            response: Set(interaction.response.clone()),
            created_at: Set(interaction.created_at.into()),
            updated_at: Set(interaction.updated_at.into()),
        }
    }
}
