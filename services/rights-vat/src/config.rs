//! Vat configuration
//!
//! Loaded from an optional file, then `config/default` and `config/local`,
//! then `RIGHTS__`-prefixed environment variables
//! (`RIGHTS__BARTER__ALICE_WANTS=5`).

use rights_issuer::{IssuerConfig, MathHelpersName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VatConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub barter: BarterConfig,
}

impl VatConfig {
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RIGHTS")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Two parties and what they bring to the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarterConfig {
    #[serde(default = "default_moola")]
    pub moola: IssuerConfig,

    #[serde(default = "default_simoleans")]
    pub simoleans: IssuerConfig,

    /// Moola Alice escrows
    #[serde(default = "default_alice_gives")]
    pub alice_gives: u64,

    /// Least simoleans Alice accepts
    #[serde(default = "default_alice_wants")]
    pub alice_wants: u64,

    /// Simoleans Bob escrows
    #[serde(default = "default_bob_gives")]
    pub bob_gives: u64,

    /// Moola Bob asks for
    #[serde(default = "default_bob_wants")]
    pub bob_wants: u64,
}

impl Default for BarterConfig {
    fn default() -> Self {
        Self {
            moola: default_moola(),
            simoleans: default_simoleans(),
            alice_gives: default_alice_gives(),
            alice_wants: default_alice_wants(),
            bob_gives: default_bob_gives(),
            bob_wants: default_bob_wants(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_moola() -> IssuerConfig {
    IssuerConfig::new("moola", MathHelpersName::Nat)
}

fn default_simoleans() -> IssuerConfig {
    IssuerConfig::new("simoleans", MathHelpersName::Nat)
}

fn default_alice_gives() -> u64 {
    3
}

fn default_alice_wants() -> u64 {
    4
}

fn default_bob_gives() -> u64 {
    7
}

fn default_bob_wants() -> u64 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VatConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.barter.moola.alleged_name, "moola");
        assert_eq!(config.barter.alice_gives, 3);
        assert_eq!(config.barter.bob_gives, 7);
    }

    #[test]
    fn test_partial_override() {
        let source = config::Config::builder()
            .set_override("barter.alice_wants", 5)
            .unwrap()
            .build()
            .unwrap();
        let config: VatConfig = source.try_deserialize().unwrap();
        assert_eq!(config.barter.alice_wants, 5);
        assert_eq!(config.barter.bob_wants, 3);
        assert_eq!(config.logging.format, "pretty");
    }
}
