//! Process configuration from environment variables
//!
//! Every setting is optional; the binary runs with no flags and no
//! environment against a local Ollama.

use crate::llm::OllamaConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8501;
const DEFAULT_IDLE_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub ollama: OllamaConfig,
    pub session_idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            ollama: OllamaConfig::default(),
            session_idle_timeout: Duration::from_secs(DEFAULT_IDLE_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let ollama = OllamaConfig {
            base_url: lookup("OLLAMA_HOST")
                .filter(|s| !s.trim().is_empty())
                .map_or(defaults.ollama.base_url, |s| normalize_base_url(&s)),
            model: lookup("GAZZI_MODEL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.ollama.model),
            temperature: parse_temperature(&lookup, defaults.ollama.temperature),
        };

        Self {
            bind: parse_or(&lookup, "GAZZI_BIND", defaults.bind),
            port: parse_or(&lookup, "GAZZI_PORT", defaults.port),
            ollama,
            session_idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "GAZZI_SESSION_IDLE_SECS",
                DEFAULT_IDLE_SECS,
            )),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring invalid value, using default");
            default
        }),
    }
}

// Infinity and NaN would serialize as null on the wire
fn parse_temperature(lookup: &impl Fn(&str) -> Option<String>, default: f64) -> f64 {
    let temperature = parse_or(lookup, "GAZZI_TEMPERATURE", default);
    if temperature.is_finite() {
        temperature.max(0.0)
    } else {
        tracing::warn!(value = temperature, "Ignoring non-finite temperature, using default");
        default
    }
}

// Ollama's own OLLAMA_HOST may be a bare host:port
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
