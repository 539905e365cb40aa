//! Migration: Create rentals table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;
use super::m20240101_000002_create_products_table::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rentals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rentals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rentals::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Rentals::RenterId).uuid().not_null())
                    .col(ColumnDef::new(Rentals::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Rentals::StartDate).date().not_null())
                    .col(ColumnDef::new(Rentals::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Rentals::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Rentals::TotalPrice).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Rentals::Message).text().null())
                    .col(
                        ColumnDef::new(Rentals::Reviewed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Rentals::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rentals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Rentals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rentals_product")
                            .from(Rentals::Table, Rentals::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rentals_renter")
                            .from(Rentals::Table, Rentals::RenterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rentals_owner")
                            .from(Rentals::Table, Rentals::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .check(Expr::col(Rentals::EndDate).gt(Expr::col(Rentals::StartDate)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rentals_product_status")
                    .table(Rentals::Table)
                    .col(Rentals::ProductId)
                    .col(Rentals::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rentals_renter_id")
                    .table(Rentals::Table)
                    .col(Rentals::RenterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rentals_owner_id")
                    .table(Rentals::Table)
                    .col(Rentals::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rentals::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Rentals {
    Table,
    Id,
    ProductId,
    RenterId,
    OwnerId,
    StartDate,
    EndDate,
    Status,
    TotalPrice,
    Message,
    Reviewed,
    Version,
    CreatedAt,
    UpdatedAt,
}
