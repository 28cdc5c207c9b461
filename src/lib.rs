//! DPC portal - administrative web portal for the DPC API
//!
//! Staff sign in through GitHub or Okta to manage organizations and register
//! them in the API environments; organization users sign in with a password
//! to create client tokens.
//!
//! # Architecture
//! - `api`: HTTP handlers, views, sessions and middleware
//! - `services`: business logic (organizations, registrations, tokens, sign-in)
//! - `clients`: outbound HTTP clients (DPC API, GitHub, Okta)
//! - `storage`: SeaORM persistence
//! - `config`: configuration management
//! - `runtime`: application lifecycle and server mode
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
