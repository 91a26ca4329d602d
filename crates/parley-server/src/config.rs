use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `PARLEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub require_auth: bool,
    pub allowed_origins: Vec<String>,
    /// Any origin ending with one of these is also allowed (e.g. a hosting domain).
    pub allowed_origin_suffixes: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PARLEY_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("PARLEY_PORT is not a port number: {:?}", port))?;

        Ok(Self {
            host: var("PARLEY_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("PARLEY_DB_PATH", "parley.db")),
            jwt_secret: var("PARLEY_JWT_SECRET", DEV_JWT_SECRET),
            require_auth: parse_flag("PARLEY_REQUIRE_AUTH", &var("PARLEY_REQUIRE_AUTH", "false"))?,
            allowed_origins: split_list(&var(
                "PARLEY_ALLOWED_ORIGINS",
                "http://localhost:5173,http://localhost:3000",
            )),
            allowed_origin_suffixes: split_list(&var("PARLEY_ALLOWED_ORIGIN_SUFFIXES", "")),
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
            || self
                .allowed_origin_suffixes
                .iter()
                .any(|suffix| origin.ends_with(suffix.as_str()))
    }
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be true or false, got {:?}", key, other),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
