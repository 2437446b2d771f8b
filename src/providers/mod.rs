// Provider adapters
//
// One adapter per integration kind. Each takes an already-transformed payload
// and reports the provider's answer or a typed failure.

pub mod error;
pub mod internal;
pub mod legacy_xml;
pub mod modern_rest;
pub mod retry;

pub use error::*;
pub use internal::InternalAdapter;
pub use legacy_xml::LegacyXmlAdapter;
pub use modern_rest::ModernRestAdapter;
pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::reservations::OperationKind;

/// Transformed body of a provider call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderBody {
    Json(Value),
    Xml(String),
    Empty,
}

impl ProviderBody {
    /// Audit representation of the outgoing payload
    pub fn to_audit_value(&self) -> Option<Value> {
        match self {
            ProviderBody::Json(value) => Some(value.clone()),
            ProviderBody::Xml(xml) => Some(Value::String(xml.clone())),
            ProviderBody::Empty => None,
        }
    }
}

/// One call to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub operation: OperationKind,
    /// Base endpoint from the property's data source, if any
    pub endpoint: Option<String>,
    pub property_code: String,
    pub body: ProviderBody,
}

/// Successful provider answer
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Provider-side reservation id, when the provider issues one
    pub external_id: Option<String>,
    /// Raw answer kept for the audit log
    pub raw: Value,
}

/// Common contract of every provider integration
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Name recorded in the operation log
    fn name(&self) -> &'static str;

    /// Perform the call described by `request`
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// The configured adapter instance for each integration kind
#[derive(Clone)]
pub struct ProviderAdapters {
    pub internal: Arc<dyn ProviderAdapter>,
    pub legacy_xml: Arc<dyn ProviderAdapter>,
    pub modern_rest: Arc<dyn ProviderAdapter>,
}

impl ProviderAdapters {
    /// Build the HTTP-backed adapters sharing one client
    pub fn from_settings(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(Self {
            internal: Arc::new(InternalAdapter),
            legacy_xml: Arc::new(LegacyXmlAdapter::new(
                client.clone(),
                settings.legacy_username,
                settings.legacy_password,
                settings.retry.clone(),
            )),
            modern_rest: Arc::new(ModernRestAdapter::new(
                client,
                settings.partner_token,
                settings.retry,
            )),
        })
    }
}

/// Adapter construction inputs taken from the application config
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub partner_token: Option<String>,
    pub legacy_username: Option<String>,
    pub legacy_password: Option<String>,
}

impl From<&crate::config::AppConfig> for ProviderSettings {
    fn from(config: &crate::config::AppConfig) -> Self {
        Self {
            timeout: config.provider_timeout,
            retry: config.retry.clone(),
            partner_token: config.modern_rest_partner_token.clone(),
            legacy_username: config.legacy_xml.username.clone(),
            legacy_password: config.legacy_xml.password.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::net::SocketAddr;

    use axum::Router;

    /// Serve `router` on an ephemeral local port
    pub async fn spawn_server(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}
