use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub organization_type: String,
    #[sea_orm(unique, nullable)]
    pub npi: Option<String>,
    #[sea_orm(unique, nullable)]
    pub sandbox_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::address::Entity")]
    Address,
    #[sea_orm(has_many = "super::registered_organization::Entity")]
    RegisteredOrganization,
    #[sea_orm(has_many = "super::organization_user_assignment::Entity")]
    OrganizationUserAssignment,
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Address.def()
    }
}

impl Related<super::registered_organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RegisteredOrganization.def()
    }
}

impl Related<super::organization_user_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrganizationUserAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
