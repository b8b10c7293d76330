//! Wallet schema: balance aggregates, lots and history.
//!
//! Built with the schema builder so the same migration runs on PostgreSQL
//! and SQLite.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    TotalGive,
    TotalUse,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ItemDetails {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    InitialAmount,
    CreatedAt,
    UpdatedAt,
    Expired,
}

#[derive(DeriveIden)]
enum ItemHistories {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    Data,
    Comment,
    CreatedAt,
}

/// SQLite caps decimal precision at 16 digits.
fn amount_column(backend: DbBackend, column: impl IntoIden) -> ColumnDef {
    let (precision, scale) = if backend == DbBackend::Sqlite {
        (16, 6)
    } else {
        (28, 10)
    };
    ColumnDef::new(column)
        .decimal_len(precision, scale)
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Items::UserId).string().not_null())
                    .col(ColumnDef::new(Items::Kind).string().not_null())
                    .col(amount_column(backend, Items::Amount))
                    .col(amount_column(backend, Items::TotalGive))
                    .col(amount_column(backend, Items::TotalUse))
                    .col(ColumnDef::new(Items::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Items::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_items_owner")
                    .table(Items::Table)
                    .col(Items::UserId)
                    .col(Items::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItemDetails::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ItemDetails::UserId).string().not_null())
                    .col(ColumnDef::new(ItemDetails::Kind).string().not_null())
                    .col(amount_column(backend, ItemDetails::Amount))
                    .col(amount_column(backend, ItemDetails::InitialAmount))
                    .col(
                        ColumnDef::new(ItemDetails::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ItemDetails::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ItemDetails::Expired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // FIFO scan: oldest lots of one owner and kind first
        manager
            .create_index(
                Index::create()
                    .name("idx_item_details_fifo")
                    .table(ItemDetails::Table)
                    .col(ItemDetails::UserId)
                    .col(ItemDetails::Kind)
                    .col(ItemDetails::CreatedAt)
                    .col(ItemDetails::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItemHistories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ItemHistories::UserId).string().not_null())
                    .col(ColumnDef::new(ItemHistories::Kind).string().not_null())
                    .col(amount_column(backend, ItemHistories::Amount))
                    .col(ColumnDef::new(ItemHistories::Data).json().not_null())
                    .col(ColumnDef::new(ItemHistories::Comment).text().not_null())
                    .col(
                        ColumnDef::new(ItemHistories::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Newest-first history pages per owner
        manager
            .create_index(
                Index::create()
                    .name("idx_item_histories_timeline")
                    .table(ItemHistories::Table)
                    .col(ItemHistories::UserId)
                    .col(ItemHistories::CreatedAt)
                    .col(ItemHistories::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ItemHistories::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ItemDetails::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
