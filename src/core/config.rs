//! Configuration management for the MCP server.
//!
//! Values come from defaults, then `MCP_*` environment variables (a `.env`
//! file is honoured), then command-line overrides applied in `main`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::dispatch::DispatchPolicy;
use super::transport::TransportConfig;
use super::transport::config::parse_env;
use crate::domains::tools::definitions::SeasonCalendar;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Request dispatch configuration.
    pub dispatch: DispatchConfig,

    /// Locations of the inventory tables.
    pub data: DataConfig,

    /// Season lookup configuration.
    pub season: SeasonConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// How requests from one session are executed.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchConfig {
    pub policy: DispatchPolicy,

    /// Upper bound on a single tool invocation.
    pub tool_timeout_secs: u64,
}

impl DispatchConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.max(1))
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: DispatchPolicy::default(),
            tool_timeout_secs: 30,
        }
    }
}

/// CSV tables backing the inventory tools.
#[derive(Debug, Clone, Serialize)]
pub struct DataConfig {
    pub products_path: PathBuf,
    pub sales_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            products_path: PathBuf::from("products.csv"),
            sales_path: PathBuf::from("sales_data.csv"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonConfig {
    pub calendar: SeasonCalendar,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "inventory-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            dispatch: DispatchConfig::default(),
            data: DataConfig::default(),
            season: SeasonConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Invalid values are logged and the default is kept.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        if let Ok(mode) = std::env::var("MCP_DISPATCH_MODE") {
            let max_in_flight = parse_env("MCP_MAX_IN_FLIGHT")
                .unwrap_or(DispatchPolicy::DEFAULT_MAX_IN_FLIGHT);
            match DispatchPolicy::from_mode(&mode, max_in_flight) {
                Some(policy) => config.dispatch.policy = policy,
                None => warn!("Ignoring unknown MCP_DISPATCH_MODE: {}", mode),
            }
        }
        if let Some(secs) = parse_env("MCP_TOOL_TIMEOUT_SECS") {
            config.dispatch.tool_timeout_secs = secs;
        }

        if let Ok(path) = std::env::var("MCP_PRODUCTS_CSV") {
            config.data.products_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("MCP_SALES_CSV") {
            config.data.sales_path = PathBuf::from(path);
        }

        if let Ok(spec) = std::env::var("MCP_SEASON_CALENDAR") {
            match spec.parse::<SeasonCalendar>() {
                Ok(calendar) => {
                    info!("Season calendar: {}", calendar);
                    config.season.calendar = calendar;
                }
                Err(e) => warn!("Ignoring MCP_SEASON_CALENDAR: {}", e),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MCP_DISPATCH_MODE",
        "MCP_MAX_IN_FLIGHT",
        "MCP_PRODUCTS_CSV",
        "MCP_SEASON_CALENDAR",
        "MCP_TOOL_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data.products_path, PathBuf::from("products.csv"));
        assert_eq!(config.data.sales_path, PathBuf::from("sales_data.csv"));
        assert_eq!(config.dispatch.policy, DispatchPolicy::Sequential);
        assert_eq!(config.dispatch.tool_timeout(), Duration::from_secs(30));
        assert_eq!(config.season.calendar, SeasonCalendar::default());
    }

    #[test]
    fn test_serializes_for_startup_log() {
        let value = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(value["dispatch"]["policy"]["mode"], "sequential");
        assert_eq!(value["season"]["calendar"], SeasonCalendar::default().to_string());
        assert_eq!(value["transport"]["port"], 8080);
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_DISPATCH_MODE", "concurrent");
            std::env::set_var("MCP_MAX_IN_FLIGHT", "4");
            std::env::set_var("MCP_PRODUCTS_CSV", "/data/items.csv");
            std::env::set_var("MCP_TOOL_TIMEOUT_SECS", "5");
        }

        let config = Config::from_env();
        assert_eq!(
            config.dispatch.policy,
            DispatchPolicy::Concurrent { max_in_flight: 4 }
        );
        assert_eq!(config.dispatch.tool_timeout_secs, 5);
        assert_eq!(config.data.products_path, PathBuf::from("/data/items.csv"));

        clear_env();
    }

    #[test]
    fn test_invalid_calendar_keeps_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_SEASON_CALENDAR", "1,2,3=winter");
        }

        let config = Config::from_env();
        assert_eq!(config.season.calendar, SeasonCalendar::default());

        clear_env();
    }

    #[test]
    fn test_custom_calendar_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var(
                "MCP_SEASON_CALENDAR",
                "12,1,2=winter;3,4,5=spring;6,7,8=summer;9,10,11=rainy",
            );
        }

        let config = Config::from_env();
        assert_eq!(config.season.calendar.season_for(10), "rainy");

        clear_env();
    }
}
