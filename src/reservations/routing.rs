// Provider routing
//
// Decides which integration owns a property's reservations.

use uuid::Uuid;

use crate::properties::{DataSource, PmsConfig, ProviderName};

/// Integration selected for one orchestration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Internal,
    LegacyXml {
        endpoint: Option<String>,
        /// Chosen because the property has no data source at all
        compatibility_default: bool,
    },
    ModernRest {
        endpoint: Option<String>,
    },
}

impl Route {
    /// Provider name recorded in the operation log
    pub fn provider_name(&self) -> &'static str {
        match self {
            Route::Internal => "internal",
            Route::LegacyXml { .. } => ProviderName::LegacyXml.as_str(),
            Route::ModernRest { .. } => ProviderName::ModernRest.as_str(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Route::Internal => None,
            Route::LegacyXml { endpoint, .. } | Route::ModernRest { endpoint } => {
                endpoint.as_deref()
            }
        }
    }
}

/// Error types for provider selection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("Property not found: {0}")]
    PropertyNotFound(Uuid),

    #[error("{0} integration is not implemented")]
    NotImplemented(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider {0} is not active for this property")]
    ProviderInactive(String),
}

impl RoutingError {
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
            RoutingError::NotImplemented(_) => "NOT_IMPLEMENTED",
            RoutingError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            RoutingError::ProviderInactive(_) => "PROVIDER_INACTIVE",
        }
    }
}

/// Select the integration for a property
///
/// Properties without a data source predate multi-provider support and keep
/// going to the legacy XML provider at `legacy_default_endpoint`.
pub fn route(
    config: &PmsConfig,
    legacy_default_endpoint: Option<&str>,
) -> Result<Route, RoutingError> {
    let data_source = match &config.data_source {
        None => {
            return Ok(Route::LegacyXml {
                endpoint: legacy_default_endpoint.map(str::to_string),
                compatibility_default: true,
            })
        }
        Some(data_source) => data_source,
    };

    match data_source {
        DataSource::Internal => Ok(Route::Internal),
        DataSource::ChannelManager { .. } => {
            Err(RoutingError::NotImplemented("ChannelManager".to_string()))
        }
        DataSource::ExternalPms(external) => {
            let provider: ProviderName = external
                .provider
                .parse()
                .map_err(|_| RoutingError::UnsupportedProvider(external.provider.clone()))?;
            if !external.is_active {
                return Err(RoutingError::ProviderInactive(provider.to_string()));
            }

            let endpoint = external
                .api_endpoint
                .clone()
                .filter(|endpoint| !endpoint.trim().is_empty());
            Ok(match provider {
                ProviderName::LegacyXml => Route::LegacyXml {
                    endpoint: endpoint.or_else(|| legacy_default_endpoint.map(str::to_string)),
                    compatibility_default: false,
                },
                ProviderName::ModernRest => Route::ModernRest { endpoint },
            })
        }
    }
}
