use sea_orm_migration::prelude::*;

use super::m20260901_000001_organizations::Organization;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RegisteredOrganization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RegisteredOrganization::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::ApiEnv)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RegisteredOrganization::ApiId).string().not_null())
                    .col(
                        ColumnDef::new(RegisteredOrganization::FhirEndpointName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::FhirEndpointStatus)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::FhirEndpointUri)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredOrganization::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registered_organizations_organization")
                            .from(
                                RegisteredOrganization::Table,
                                RegisteredOrganization::OrganizationId,
                            )
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个组织在每个 API 环境中最多注册一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_registered_organizations_org_env")
                    .table(RegisteredOrganization::Table)
                    .col(RegisteredOrganization::OrganizationId)
                    .col(RegisteredOrganization::ApiEnv)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_registered_organizations_org_env")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(RegisteredOrganization::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RegisteredOrganization {
    #[sea_orm(iden = "registered_organizations")]
    Table,
    Id,
    OrganizationId,
    ApiEnv,
    ApiId,
    FhirEndpointName,
    FhirEndpointStatus,
    FhirEndpointUri,
    CreatedAt,
    UpdatedAt,
}
