//! Outbound HTTP clients
//!
//! Every client is a trait object so handlers and services can be tested
//! against in-process fakes. The `Ureq*` implementations issue blocking
//! requests on the tokio blocking pool.

pub mod dpc_api;
pub mod github;
mod http;
pub mod okta;

pub use dpc_api::{
    ApiOrganization, ClientTokenMetadata, CreatedClientToken, DpcApi, UreqDpcApi,
};
pub use github::{GithubApi, GithubTeam, GithubUser, UreqGithubApi};
pub use okta::{OktaApi, OktaUserInfo, UreqOktaApi};
