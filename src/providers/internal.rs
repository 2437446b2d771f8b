use async_trait::async_trait;
use serde_json::json;

use crate::providers::{ProviderAdapter, ProviderError, ProviderRequest, ProviderResponse};

/// Adapter for properties whose reservations live only in this system
///
/// No network call is made; every operation is confirmed immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalAdapter;

#[async_trait]
impl ProviderAdapter for InternalAdapter {
    fn name(&self) -> &'static str {
        "internal"
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tracing::debug!(
            operation = %request.operation,
            property_code = %request.property_code,
            "Internal provider confirming operation"
        );
        Ok(ProviderResponse {
            external_id: None,
            raw: json!({
                "status": "confirmed",
                "operation": request.operation.as_str(),
            }),
        })
    }
}
