//! Server configuration read from the process environment and an optional `.env` file.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Upper bound on handling a single request.
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Read configuration from the process environment, falling back to the
    /// variables defined in `env_file`. A missing file is not an error; the
    /// process environment wins over the file.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let file_vars = read_env_file(env_file)?;
        if file_vars.is_empty() {
            tracing::debug!(path = %env_file.display(), "no env file variables loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Read `PORT` (required), `HOST`, `REQUEST_TIMEOUT_SECS` and
    /// `MAX_BODY_BYTES` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT").ok_or(ConfigError::Missing("PORT"))?;
        let port = parse_var("PORT", &port)?;

        let host = match lookup("HOST") {
            Some(h) => parse_var("HOST", &h)?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(v) => parse_var("REQUEST_TIMEOUT_SECS", &v)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => parse_var("MAX_BODY_BYTES", &v)?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            host,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Variables defined in a dotenv-style file. A missing file yields none.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter
            .map(|item| item.map_err(|e| ConfigError::EnvFile(e.to_string())))
            .collect(),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(ConfigError::EnvFile(e.to_string())),
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_port_only() {
        let c = ServerConfig::from_lookup(lookup(&[("PORT", "8080")])).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(c.request_timeout, Duration::from_secs(10));
        assert_eq!(c.max_body_bytes, 1024 * 1024);
        assert_eq!(c.bind_addr(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn port_is_required() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PORT"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));

        let err =
            ServerConfig::from_lookup(lookup(&[("PORT", "80"), ("HOST", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "HOST", .. }));
    }

    #[test]
    fn env_file_supplies_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# deployment\nPORT=4000\nHOST=127.0.0.1\n").unwrap();

        let vars = read_env_file(&path).unwrap();
        assert_eq!(vars.get("PORT").map(String::as_str), Some("4000"));

        let c = ServerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(c.bind_addr(), "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn missing_env_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&dir.path().join(".env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn overrides() {
        let c = ServerConfig::from_lookup(lookup(&[
            ("PORT", "3000"),
            ("HOST", "127.0.0.1"),
            ("REQUEST_TIMEOUT_SECS", "30"),
            ("MAX_BODY_BYTES", "4096"),
        ]))
        .unwrap();
        assert_eq!(c.bind_addr(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.request_timeout, Duration::from_secs(30));
        assert_eq!(c.max_body_bytes, 4096);
    }
}
