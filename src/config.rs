use crate::connection::{Endpoint, ExchangeLimits};
use crate::error::{AnthemError, Result};
use crate::protocol::DEFAULT_PORT;
use crate::sources::SourceMap;
use crate::types::{Model, VolumeRange, Zone};
use serde::Deserialize;
use std::time::Duration;

/// Connection and conversion settings for an [`AnthemClient`](crate::AnthemClient)
///
/// Can be built in code or deserialized; timeouts are given in milliseconds
/// when deserialized.
///
/// ```
/// use anthemav::{ClientConfig, Model, Zone};
/// use std::time::Duration;
///
/// let config = ClientConfig::new("192.168.1.50", Model::X00)
///     .zone(Zone::ZONE2)
///     .volume_range(-70, -20)
///     .io_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub model: Model,

    /// Zone used when no zone is given
    #[serde(default)]
    pub zone: Zone,

    #[serde(default = "default_min_volume")]
    pub min_volume: i32,

    #[serde(default = "default_max_volume")]
    pub max_volume: i32,

    #[serde(default = "default_timeout", rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    #[serde(default = "default_timeout", rename = "io_timeout_ms", with = "millis")]
    pub io_timeout: Duration,

    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Replaces the model's factory source list
    #[serde(default)]
    pub sources: Option<SourceMap>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_min_volume() -> i32 {
    VolumeRange::default().min
}

fn default_max_volume() -> i32 {
    VolumeRange::default().max
}

fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_max_response_bytes() -> usize {
    1024
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, model: Model) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            model,
            zone: Zone::default(),
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            connect_timeout: default_timeout(),
            io_timeout: default_timeout(),
            max_response_bytes: default_max_response_bytes(),
            sources: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Device volume units mapped to 0.0 and 1.0
    pub fn volume_range(mut self, min: i32, max: i32) -> Self {
        self.min_volume = min;
        self.max_volume = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    pub fn sources(mut self, sources: SourceMap) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(AnthemError::InvalidConfig("host is empty".to_string()));
        }
        if self.min_volume >= self.max_volume {
            return Err(AnthemError::InvalidConfig(format!(
                "min_volume ({}) must be below max_volume ({})",
                self.min_volume, self.max_volume
            )));
        }
        if self.max_response_bytes == 0 {
            return Err(AnthemError::InvalidConfig(
                "max_response_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn volume(&self) -> VolumeRange {
        VolumeRange::new(self.min_volume, self.max_volume)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn limits(&self) -> ExchangeLimits {
        ExchangeLimits {
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            max_response_bytes: self.max_response_bytes,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("receiver.local", Model::X00);
        assert_eq!(config.port, 4999);
        assert_eq!(config.zone, Zone::MAIN);
        assert_eq!(config.volume(), VolumeRange::new(-60, -30));
        assert_eq!(config.io_timeout, Duration::from_secs(2));
        assert_eq!(config.max_response_bytes, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_volume_range() {
        let config = ClientConfig::new("receiver.local", Model::X00).volume_range(-30, -60);
        assert!(matches!(config.validate(), Err(AnthemError::InvalidConfig(_))));
        let config = ClientConfig::new("receiver.local", Model::X00).volume_range(-30, -30);
        assert!(matches!(config.validate(), Err(AnthemError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_host_and_zero_buffer() {
        assert!(ClientConfig::new("", Model::X00).validate().is_err());
        assert!(ClientConfig::new("receiver.local", Model::X00)
            .max_response_bytes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "host": "10.0.0.20",
                "model": "x10",
                "zone": 2,
                "io_timeout_ms": 500,
                "sources": { "1": "Blu-ray" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.host, "10.0.0.20");
        assert_eq!(config.port, 4999);
        assert_eq!(config.model, Model::X10);
        assert_eq!(config.zone, Zone::ZONE2);
        assert_eq!(config.io_timeout, Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.min_volume, -60);
        assert_eq!(
            config.sources.as_ref().and_then(|s| s.code("Blu-ray")),
            Some("1")
        );
    }
}
