use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MerchantInteractions::Table)
                    .if_not_exists()
                    .col(pk_uuid(MerchantInteractions::Id))
                    .col(
                        ColumnDef::new(MerchantInteractions::MerchantId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MerchantInteractions::Query).text().not_null())
                    .col(
                        ColumnDef::new(MerchantInteractions::Response)
                            .text()
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(MerchantInteractions::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(MerchantInteractions::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing and context resolution are always per merchant, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_merchant_interactions_merchant_created")
                    .table(MerchantInteractions::Table)
                    .col(MerchantInteractions::MerchantId)
                    .col(MerchantInteractions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(MerchantInteractions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum MerchantInteractions {
    Table,
    Id,
    MerchantId,
    Query,
    Response,
    CreatedAt,
    UpdatedAt,
}
