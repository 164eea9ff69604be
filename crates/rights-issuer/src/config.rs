//! Issuer configuration

use rights_types::MathHelpersName;
use serde::{Deserialize, Serialize};

/// Configuration for one issuer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Display name carried by the brand
    #[serde(default = "default_alleged_name")]
    pub alleged_name: String,
    /// Extent arithmetic for the brand
    #[serde(default)]
    pub math_helpers: MathHelpersName,
}

impl IssuerConfig {
    pub fn new(alleged_name: impl Into<String>, math_helpers: MathHelpersName) -> Self {
        Self {
            alleged_name: alleged_name.into(),
            math_helpers,
        }
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            alleged_name: default_alleged_name(),
            math_helpers: MathHelpersName::Nat,
        }
    }
}

fn default_alleged_name() -> String {
    "fungible".to_string()
}
