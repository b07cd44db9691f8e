use std::{fs, net::SocketAddr, path::Path};

use anyhow::Context as _;
use graphql_ws::SessionConfig;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Server bind settings
    pub network: NetworkConfig,
    /// Where the GraphQL endpoint is served
    pub graph: GraphConfig,
    /// Settings for every websocket session
    pub websocket: SessionConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub listen_address: Option<SocketAddr>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub websocket_path: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            websocket_path: "/ws".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("error loading config {}", path.display()))?;

        let config: Config = toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))?;
        config.websocket.validate()?;

        Ok(config)
    }
}
