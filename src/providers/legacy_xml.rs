use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::providers::{
    ProviderAdapter, ProviderBody, ProviderError, ProviderRequest, ProviderResponse, RetryPolicy,
};

const SUCCESS_STATUS: &str = "Success";

/// Reply document of the legacy PMS
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename = "ReservationResponse", rename_all = "PascalCase")]
pub struct LegacyXmlResponse {
    pub status: String,
    pub confirmation_number: Option<String>,
    pub error: Option<String>,
}

/// SOAP-like XML PMS adapter
///
/// Every operation is an XML document posted to the property's endpoint; the
/// envelope's `Action` attribute tells the PMS what to do.
#[derive(Clone)]
pub struct LegacyXmlAdapter {
    client: Client,
    username: Option<String>,
    password: Option<String>,
    retry: RetryPolicy,
}

impl LegacyXmlAdapter {
    pub fn new(
        client: Client,
        username: Option<String>,
        password: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            username,
            password,
            retry,
        }
    }

    async fn call(&self, url: &str, document: &str) -> Result<ProviderResponse, ProviderError> {
        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(document.to_string());
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: LegacyXmlResponse = quick_xml::de::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        let raw = json!({
            "status": parsed.status,
            "confirmationNumber": parsed.confirmation_number,
            "error": parsed.error,
            "document": text,
        });

        if parsed.status.trim() != SUCCESS_STATUS {
            let reason = parsed
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| format!("status {}", parsed.status));
            return Err(ProviderError::Rejected(reason));
        }

        Ok(ProviderResponse {
            external_id: parsed
                .confirmation_number
                .filter(|number| !number.trim().is_empty()),
            raw,
        })
    }
}

#[async_trait]
impl ProviderAdapter for LegacyXmlAdapter {
    fn name(&self) -> &'static str {
        "LegacyXML"
    }

    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = request
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProviderError::Request("no XML endpoint configured".to_string()))?;
        let document = match &request.body {
            ProviderBody::Xml(document) => document,
            _ => {
                return Err(ProviderError::Request(
                    "Legacy XML provider requires an XML body".to_string(),
                ))
            }
        };

        tracing::info!(
            operation = %request.operation,
            property_code = %request.property_code,
            url,
            "Calling Legacy XML provider"
        );

        self.retry
            .run(self.name(), request.operation, || self.call(url, document))
            .await
    }
}
