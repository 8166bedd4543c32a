mod scenario;
mod server;

pub use self::{scenario::Scenario, server::ServerConfig};
