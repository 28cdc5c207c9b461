//! Service layer for business logic
//!
//! Handlers stay thin: validation, persistence pipelines and calls to the
//! outbound clients live here.

mod client_token_service;
pub mod internal_auth;
mod organization_service;
mod registered_org_service;
pub mod sandbox_id;
mod user_service;

pub use client_token_service::*;
pub use internal_auth::{AuthFailure, InternalAuthService, ProviderProfile};
pub use organization_service::*;
pub use registered_org_service::*;
pub use user_service::*;
