pub mod address;
pub mod internal_user;
pub mod organization;
pub mod organization_user_assignment;
pub mod registered_organization;
pub mod user;

pub use address::Entity as AddressEntity;
pub use internal_user::Entity as InternalUserEntity;
pub use organization::Entity as OrganizationEntity;
pub use organization_user_assignment::Entity as OrganizationUserAssignmentEntity;
pub use registered_organization::Entity as RegisteredOrganizationEntity;
pub use user::Entity as UserEntity;
