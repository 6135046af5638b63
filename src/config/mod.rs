use crate::request::{HttpVersion, Method};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub clients: usize,
    pub time_seconds: u64,
    pub io_timeout_ms: u64,
    /// Don't wait for the server's reply.
    pub force: bool,
    pub reload: bool,
    pub protocol: HttpVersion,
    pub method: Method,
    pub proxy: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clients: 1,
            time_seconds: 30,
            io_timeout_ms: 3000,
            force: false,
            reload: false,
            protocol: HttpVersion::Http10,
            method: Method::Get,
            proxy: None,
        }
    }
}

impl RunConfig {
    /// Zero clients or zero seconds mean "use the default".
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.clients == 0 {
            self.clients = defaults.clients;
        }
        if self.time_seconds == 0 {
            self.time_seconds = defaults.time_seconds;
        }
        if self.io_timeout_ms == 0 {
            self.io_timeout_ms = defaults.io_timeout_ms;
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.run.clients, 1);
        assert_eq!(config.run.time_seconds, 30);
        assert_eq!(config.run.io_timeout_ms, 3000);
        assert_eq!(config.run.protocol, HttpVersion::Http10);
        assert_eq!(config.run.method, Method::Get);
        assert!(config.run.proxy.is_none());
    }

    #[test]
    fn parses_run_table() {
        let config: Config = toml::from_str(
            r#"
            [run]
            clients = 64
            time_seconds = 10
            force = true
            protocol = "1.1"
            method = "head"
            proxy = "cache.local:3128"
            "#,
        )
        .unwrap();
        assert_eq!(config.run.clients, 64);
        assert_eq!(config.run.time_seconds, 10);
        assert_eq!(config.run.io_timeout_ms, 3000);
        assert!(config.run.force);
        assert!(!config.run.reload);
        assert_eq!(config.run.protocol, HttpVersion::Http11);
        assert_eq!(config.run.method, Method::Head);
        assert_eq!(config.run.proxy.as_deref(), Some("cache.local:3128"));
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let mut run = RunConfig {
            clients: 0,
            time_seconds: 0,
            io_timeout_ms: 0,
            ..Default::default()
        };
        run.sanitize();
        assert_eq!(run.clients, 1);
        assert_eq!(run.time_seconds, 30);
        assert_eq!(run.io_timeout_ms, 3000);
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!(toml::from_str::<Config>("[run]\nprotocol = \"2\"").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("webbench-{}.toml", std::process::id()));
        std::fs::write(&path, "[run]\nclients = 8\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.run.clients, 8);
        assert!(Config::from_file(&path).is_err());
    }
}
