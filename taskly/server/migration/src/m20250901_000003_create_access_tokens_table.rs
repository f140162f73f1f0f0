use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

use crate::m20250901_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

const FK_ACCESS_TOKENS_TO_USERS: &str = "fk-access_tokens-user_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessTokens::Table)
                    .if_not_exists()
                    // The JWT `jti` claim.
                    .col(string_len(AccessTokens::Id, 36).primary_key())
                    .col(integer(AccessTokens::UserId))
                    .col(timestamp_with_time_zone(AccessTokens::CreatedAt))
                    .col(timestamp_with_time_zone(AccessTokens::ExpiresAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_ACCESS_TOKENS_TO_USERS)
                            .from(AccessTokens::Table, AccessTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccessTokens {
    Table,
    Id,
    UserId,
    CreatedAt,
    ExpiresAt,
}
