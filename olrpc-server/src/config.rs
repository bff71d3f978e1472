//! Server identity and protocol settings

/// Settings reported at handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The only protocol version a handshake may request
    pub protocol_version: String,
    pub server_name: String,
    pub server_version: String,
}

impl ServerConfig {
    pub const DEFAULT_PROTOCOL_VERSION: &'static str = "2024-11-05";
    pub const DEFAULT_SERVER_NAME: &'static str = "olrpc";
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol_version: Self::DEFAULT_PROTOCOL_VERSION.to_string(),
            server_name: Self::DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
