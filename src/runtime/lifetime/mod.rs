pub mod shutdown;
pub mod startup;

pub use startup::{OutboundClients, StartupContext, prepare_server_startup};
