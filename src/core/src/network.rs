//! SSH front end.
//!
//! - `ssh_server`: russh server configuration and the per-connection handler
//!   that routes password authentication through the auth gate.
//! - `network_listener`: TCP accept loop, one task per connection.

pub mod network_listener;
pub mod ssh_server;

pub use network_listener::NetworkListener;
pub use ssh_server::{load_host_key, server_config, HoneypotHandler};
