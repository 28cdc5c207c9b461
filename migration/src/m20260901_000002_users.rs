use sea_orm_migration::prelude::*;

use super::m20260901_000001_organizations::Organization;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 组织用户（邮箱 + 密码登录）
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Email).string().not_null())
                    .col(ColumnDef::new(User::FirstName).string().not_null())
                    .col(ColumnDef::new(User::LastName).string().not_null())
                    .col(ColumnDef::new(User::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_users_email")
                    .table(User::Table)
                    .col(User::Email)
                    .to_owned(),
            )
            .await?;

        // 内部员工（仅 OAuth）
        manager
            .create_table(
                Table::create()
                    .table(InternalUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InternalUser::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InternalUser::Provider).string_len(16).not_null())
                    .col(ColumnDef::new(InternalUser::Uid).string().not_null())
                    .col(ColumnDef::new(InternalUser::Email).string().not_null())
                    .col(ColumnDef::new(InternalUser::Name).string().null())
                    .col(
                        ColumnDef::new(InternalUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InternalUser::LastSignInAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_internal_users_provider_uid")
                    .table(InternalUser::Table)
                    .col(InternalUser::Provider)
                    .col(InternalUser::Uid)
                    .to_owned(),
            )
            .await?;

        // 组织 <-> 用户
        manager
            .create_table(
                Table::create()
                    .table(OrganizationUserAssignment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrganizationUserAssignment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrganizationUserAssignment::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationUserAssignment::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationUserAssignment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_organization")
                            .from(
                                OrganizationUserAssignment::Table,
                                OrganizationUserAssignment::OrganizationId,
                            )
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_user")
                            .from(
                                OrganizationUserAssignment::Table,
                                OrganizationUserAssignment::UserId,
                            )
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_assignments_organization_user")
                    .table(OrganizationUserAssignment::Table)
                    .col(OrganizationUserAssignment::OrganizationId)
                    .col(OrganizationUserAssignment::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(OrganizationUserAssignment::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(InternalUser::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InternalUser {
    #[sea_orm(iden = "internal_users")]
    Table,
    Id,
    Provider,
    Uid,
    Email,
    Name,
    CreatedAt,
    LastSignInAt,
}

#[derive(DeriveIden)]
enum OrganizationUserAssignment {
    #[sea_orm(iden = "organization_user_assignments")]
    Table,
    Id,
    OrganizationId,
    UserId,
    CreatedAt,
}
