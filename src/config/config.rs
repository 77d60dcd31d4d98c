use std::collections::BTreeMap;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LoggingConfig;

pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CHAIN_EXPORTER_CONFIG";
/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "CHAIN_EXPORTER_";
/// Legacy variable that sets the neo collector's endpoint.
pub const NEO_RPC_ENV: &str = "NEORPC_URL";

const CONFIG_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Deadline for a single RPC exchange, in milliseconds.
    #[serde(default = "default_rpc_timeout_in_ms")]
    pub rpc_timeout_in_ms: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

/// Per-collector overrides keyed by collector name.
pub type CollectorsConfig = BTreeMap<String, CollectorSettings>;

/// Operator overrides for a single collector. Anything left unset falls
/// back to the collector's own defaults.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct CollectorSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub rpc: Option<String>,
}

impl ConfigV1 {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_in_ms)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.rpc_timeout_in_ms == 0 {
            return Err(ConfigError::Invalid(
                "rpc_timeout_in_ms must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for ConfigV1 {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            rpc_timeout_in_ms: default_rpc_timeout_in_ms(),
            logging: LoggingConfig::default(),
            collectors: CollectorsConfig::new(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_rpc_timeout_in_ms() -> u64 {
    3000
}

/// Layers, lowest precedence first: the config version, the YAML file at
/// `path` (optional), `CHAIN_EXPORTER_*` variables and `NEORPC_URL`.
pub fn figment(path: &str) -> Figment {
    Figment::new()
        .merge(Serialized::default("version", CONFIG_VERSION))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
        .merge(
            Env::raw()
                .only(&[NEO_RPC_ENV])
                .map(|_| "collectors.neo.rpc".into()),
        )
}

/// Load config from the file named by `CHAIN_EXPORTER_CONFIG`, or
/// "config.yaml" in the current directory.
pub fn load_config() -> Result<ConfigV1, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(&path)
}

pub fn load_config_from(path: &str) -> Result<ConfigV1, ConfigError> {
    match figment(path).extract::<Config>()? {
        Config::ConfigV1(c) => c.validate(),
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = load_config_from("missing.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.bind_address, "0.0.0.0:9100");
            assert_eq!(config.rpc_timeout(), Duration::from_secs(3));
            assert_eq!(config.logging.level, "info");
            assert!(config.collectors.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
version: "1.0.0"
bind_address: 127.0.0.1:9200
rpc_timeout_in_ms: 1500
logging:
  level: debug
  format: json
collectors:
  ontology:
    enabled: false
    rpc: http://10.0.0.2:40336
"#,
            )?;
            jail.set_env("CHAIN_EXPORTER_BIND_ADDRESS", "127.0.0.1:9300");
            jail.set_env("NEORPC_URL", "http://10.0.0.1:10332");

            let config = load_config_from("config.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.bind_address, "127.0.0.1:9300");
            assert_eq!(config.rpc_timeout(), Duration::from_millis(1500));
            assert_eq!(config.logging.format, "json");
            assert_eq!(
                config.collectors.get("ontology"),
                Some(&CollectorSettings {
                    enabled: Some(false),
                    rpc: Some("http://10.0.0.2:40336".to_string()),
                })
            );
            assert_eq!(
                config.collectors["neo"].rpc.as_deref(),
                Some("http://10.0.0.1:10332")
            );
            Ok(())
        });
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "rpc_timeout_in_ms: 0\n")?;
            let result = load_config_from("config.yaml");
            assert!(matches!(result, Err(ConfigError::Invalid(_))));
            Ok(())
        });
    }
}
