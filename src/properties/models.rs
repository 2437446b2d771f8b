use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// External PMS providers the orchestrator can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderName {
    LegacyXml,
    ModernRest,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::LegacyXml => "LegacyXML",
            ProviderName::ModernRest => "ModernREST",
        }
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacyxml" => Ok(ProviderName::LegacyXml),
            "modernrest" => Ok(ProviderName::ModernRest),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection details for an external PMS
///
/// The provider is kept as the raw configured name so an unknown provider
/// surfaces as a routing error instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPmsConfig {
    pub provider: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Which integration owns a property's reservations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DataSource {
    Internal,
    ChannelManager {
        #[serde(default)]
        provider: Option<String>,
    },
    #[serde(rename = "ExternalPMS")]
    ExternalPms(ExternalPmsConfig),
}

/// Property record as owned by property management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub data_source: Option<DataSource>,
}

/// Resolved PMS configuration for one property
#[derive(Debug, Clone, PartialEq)]
pub struct PmsConfig {
    pub property_id: Uuid,
    pub property_code: String,
    pub property_name: String,
    /// `None` for properties migrated before multi-provider support
    pub data_source: Option<DataSource>,
}

impl From<Property> for PmsConfig {
    fn from(property: Property) -> Self {
        Self {
            property_id: property.id,
            property_code: property.code,
            property_name: property.name,
            data_source: property.data_source,
        }
    }
}
