use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::providers::{
    ProviderAdapter, ProviderBody, ProviderError, ProviderRequest, ProviderResponse, RetryPolicy,
};
use crate::reservations::OperationKind;

pub const PARTNER_TOKEN_HEADER: &str = "x-partner-access-token";

/// Fields that may carry the provider's booking code, in order of preference
const BOOKING_CODE_FIELDS: [&str; 3] = ["bookingCode", "reservationId", "id"];

/// JSON REST PMS adapter
///
/// Create: `POST {endpoint}{propertyCode}`; amend: `PUT {endpoint}amend`;
/// cancel: `POST {endpoint}cancel`.
#[derive(Clone)]
pub struct ModernRestAdapter {
    client: Client,
    partner_token: Option<String>,
    retry: RetryPolicy,
}

impl ModernRestAdapter {
    pub fn new(client: Client, partner_token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            partner_token,
            retry,
        }
    }

    fn target(request: &ProviderRequest) -> Result<(Method, String), ProviderError> {
        let endpoint = request
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProviderError::Request("no API endpoint configured".to_string()))?;

        Ok(match request.operation {
            OperationKind::Reservation => {
                (Method::POST, format!("{}{}", endpoint, request.property_code))
            }
            OperationKind::Amend => (Method::PUT, format!("{}amend", endpoint)),
            OperationKind::Cancel => (Method::POST, format!("{}cancel", endpoint)),
        })
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        token: &str,
        operation: OperationKind,
        body: &Value,
    ) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .request(method, url)
            .header(PARTNER_TOKEN_HEADER, token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        match operation {
            OperationKind::Reservation => {
                let raw: Value = serde_json::from_str(&text)
                    .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
                let external_id = extract_booking_code(&raw).ok_or_else(|| {
                    ProviderError::MalformedResponse(
                        "response carries no bookingCode, reservationId or id".to_string(),
                    )
                })?;
                Ok(ProviderResponse {
                    external_id: Some(external_id),
                    raw,
                })
            }
            OperationKind::Amend | OperationKind::Cancel => Ok(ProviderResponse {
                external_id: None,
                raw: parse_lenient(&text),
            }),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ModernRestAdapter {
    fn name(&self) -> &'static str {
        "ModernREST"
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let token = self
            .partner_token
            .as_deref()
            .ok_or_else(|| ProviderError::Request("partner access token not configured".to_string()))?;
        let body = match &request.body {
            ProviderBody::Json(body) => body,
            _ => {
                return Err(ProviderError::Request(
                    "Modern REST provider requires a JSON body".to_string(),
                ))
            }
        };
        let (method, url) = Self::target(request)?;

        tracing::info!(
            operation = %request.operation,
            property_code = %request.property_code,
            %url,
            "Calling Modern REST provider"
        );

        self.retry
            .run(self.name(), request.operation, || {
                self.call(method.clone(), &url, token, request.operation, body)
            })
            .await
    }
}

fn extract_booking_code(raw: &Value) -> Option<String> {
    let candidates = [raw, &raw["data"]];
    candidates.iter().find_map(|object| {
        BOOKING_CODE_FIELDS
            .iter()
            .find_map(|field| match &object[*field] {
                Value::String(code) if !code.trim().is_empty() => Some(code.clone()),
                Value::Number(code) => Some(code.to_string()),
                _ => None,
            })
    })
}

fn parse_lenient(text: &str) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}
