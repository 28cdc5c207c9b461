use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // organizations
        manager
            .create_table(
                Table::create()
                    .table(Organization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organization::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organization::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organization::OrganizationType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Organization::Npi).string_len(32).null())
                    .col(ColumnDef::new(Organization::SandboxId).string_len(16).null())
                    .col(
                        ColumnDef::new(Organization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organization::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // NULL npi / sandbox_id 不参与唯一约束
        for (name, column) in [
            ("idx_organizations_name", Organization::Name),
            ("idx_organizations_npi", Organization::Npi),
            ("idx_organizations_sandbox_id", Organization::SandboxId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name(name)
                        .table(Organization::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // addresses（一对一，随 organization 级联删除）
        manager
            .create_table(
                Table::create()
                    .table(Address::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Address::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Address::OrganizationId).integer().not_null())
                    .col(ColumnDef::new(Address::Street).string().not_null())
                    .col(ColumnDef::new(Address::Street2).string().null())
                    .col(ColumnDef::new(Address::City).string().not_null())
                    .col(ColumnDef::new(Address::State).string_len(8).not_null())
                    .col(ColumnDef::new(Address::Zip).string_len(16).not_null())
                    .col(ColumnDef::new(Address::AddressType).string_len(16).not_null())
                    .col(ColumnDef::new(Address::AddressUse).string_len(16).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_addresses_organization")
                            .from(Address::Table, Address::OrganizationId)
                            .to(Organization::Table, Organization::Id)
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
                    .name("idx_addresses_organization_id")
                    .table(Address::Table)
                    .col(Address::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Address::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Organization::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Organization {
    #[sea_orm(iden = "organizations")]
    Table,
    Id,
    Name,
    OrganizationType,
    Npi,
    SandboxId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Address {
    #[sea_orm(iden = "addresses")]
    Table,
    Id,
    OrganizationId,
    Street,
    #[sea_orm(iden = "street_2")]
    Street2,
    City,
    State,
    Zip,
    AddressType,
    AddressUse,
}
