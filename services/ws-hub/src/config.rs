//! Hub-local settings. The recognized environment (`corsOrigins`,
//! `wsTicketTtlSec`) lives on `config::IndexerConfig`; `bin/indexer`
//! projects the fields this crate needs into a [`HubSettings`] rather than
//! this crate re-parsing TOML/env on its own.

#[derive(Debug, Clone)]
pub struct HubSettings {
    pub bind_address: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub ticket_ttl_sec: u64,
    pub max_connections: usize,
    pub client_buffer_size: usize,
    pub snapshot_limit_default: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8090,
            cors_origins: Vec::new(),
            ticket_ttl_sec: 60,
            max_connections: 1000,
            client_buffer_size: 1000,
            snapshot_limit_default: 50,
        }
    }
}
