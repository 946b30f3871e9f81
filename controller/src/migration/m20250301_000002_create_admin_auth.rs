use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 admin_user 表
        manager
            .create_table(
                Table::create()
                    .table(AdminUser::Table)
                    .if_not_exists()
                    .col(big_integer(AdminUser::Id).auto_increment().primary_key())
                    .col(string(AdminUser::Username).unique_key())
                    .col(string(AdminUser::PasswordHash))
                    .col(string_null(AdminUser::FullName))
                    .col(boolean(AdminUser::IsActive).default(true))
                    .col(timestamp_null(AdminUser::LastLogin))
                    .col(timestamp(AdminUser::CreatedAt))
                    .col(timestamp(AdminUser::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // 创建 auth_session 表（服务端会话）
        manager
            .create_table(
                Table::create()
                    .table(AuthSession::Table)
                    .if_not_exists()
                    .col(big_integer(AuthSession::Id).auto_increment().primary_key())
                    .col(string(AuthSession::Token).unique_key())
                    .col(big_integer(AuthSession::AdminUserId))
                    .col(timestamp(AuthSession::ExpiresAt))
                    .col(timestamp(AuthSession::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_session_admin_user")
                            .from(AuthSession::Table, AuthSession::AdminUserId)
                            .to(AdminUser::Table, AdminUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_session_admin_user_id")
                    .table(AuthSession::Table)
                    .col(AuthSession::AdminUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthSession::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminUser::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum AdminUser {
    Table,
    Id,
    Username,
    PasswordHash,
    FullName,
    IsActive,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AuthSession {
    Table,
    Id,
    Token,
    AdminUserId,
    ExpiresAt,
    CreatedAt,
}
