//! Server configuration, read once at startup from flags and environment.

use crate::{DEFAULT_DATABASES, DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

/// multikv - a multi-database in-memory key-value server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "multikv")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(short = 'a', long = "addr", env = "MULTIKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MULTIKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of databases (0 uses the default)
    #[arg(long, env = "MULTIKV_DATABASES", default_value_t = DEFAULT_DATABASES)]
    pub databases: usize,

    /// Password clients must send with AUTH (empty disables authentication)
    #[arg(long, env = "MULTIKV_AUTH", hide_env_values = true)]
    pub auth: Option<String>,

    /// Log every request and reply frame
    #[arg(long, env = "MULTIKV_TRACE_PROTOCOL")]
    pub trace_protocol: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "MULTIKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            databases: DEFAULT_DATABASES,
            auth: None,
            trace_protocol: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Replaces empty or zero settings with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.databases == 0 {
            self.databases = DEFAULT_DATABASES;
        }
        if self.auth.as_deref().is_some_and(str::is_empty) {
            self.auth = None;
        }
        self
    }

    /// `host:port`, ready for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn requires_auth(&self) -> bool {
        self.auth.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["multikv"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.databases, DEFAULT_DATABASES);
        assert_eq!(config.bind_address(), format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT));
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "multikv",
            "-a",
            "127.0.0.1",
            "-p",
            "7000",
            "--databases",
            "4",
            "--auth",
            "pw",
            "--trace-protocol",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:7000");
        assert_eq!(config.databases, 4);
        assert_eq!(config.auth.as_deref(), Some("pw"));
        assert!(config.trace_protocol);
    }

    #[test]
    fn test_normalized() {
        let config = Config {
            host: String::new(),
            databases: 0,
            auth: Some(String::new()),
            ..Config::default()
        }
        .normalized();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.databases, DEFAULT_DATABASES);
        assert!(!config.requires_auth());
    }
}
