use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::organization_user_assignment::Entity")]
    OrganizationUserAssignment,
}

impl Related<super::organization_user_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrganizationUserAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
