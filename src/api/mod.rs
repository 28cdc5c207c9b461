pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
pub mod session;
pub mod views;
