use crate::{ConfigError, FromEnv, env_or_default, env_parse};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Listen address for the HTTP API
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// HOST (0.0.0.0) must be an IP literal; PORT defaults to 8080
    fn from_env() -> Result<Self, ConfigError> {
        let raw_host = env_or_default("HOST", "0.0.0.0");
        let host = raw_host
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::ParseError {
                key: "HOST".to_string(),
                details: format!("'{}': {}", raw_host, e),
            })?;

        Ok(Self {
            host,
            port: env_parse("PORT", 8080)?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
    }
}
