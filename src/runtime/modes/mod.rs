//! Mode routing
//!
//! The HTTP server is the only long-running mode; `migrate` and
//! `config generate` are one-shot commands handled in `main`.

pub mod server;

pub use server::run_server;
