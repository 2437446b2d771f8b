use crate::reservations::OperationKind;

/// Failures of a provider call
///
/// `Status`, `Unreachable`, `NoResponse` and `Request` are the transport failure
/// shapes; `MalformedResponse` and `Rejected` cover replies the adapter could
/// not accept. `Unreachable` means the request never left this host, while
/// `NoResponse` means it may have been processed without us seeing the answer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider could not be reached: {0}")]
    Unreachable(String),

    #[error("No response received from provider: {0}")]
    NoResponse(String),

    #[error("Provider request could not be constructed: {0}")]
    Request(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider rejected the operation: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Only transport failures where the provider may recover are retried.
    ///
    /// Create and cancel are not idempotent upstream, so an outcome that may
    /// have been applied (timeout, dropped body, 500, 504) is retried for
    /// `Amend` only. Refused connections, 502 and 503 never reached the
    /// booking engine and are retried for every operation.
    pub fn is_retryable(&self, operation: OperationKind) -> bool {
        let idempotent = operation == OperationKind::Amend;
        match self {
            ProviderError::Unreachable(_) => true,
            ProviderError::NoResponse(_) => idempotent,
            ProviderError::Status { status: 502 | 503, .. } => true,
            ProviderError::Status { status, .. } => *status >= 500 && idempotent,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Status { .. } => "PROVIDER_ERROR_STATUS",
            ProviderError::Unreachable(_) => "PROVIDER_UNREACHABLE",
            ProviderError::NoResponse(_) => "PROVIDER_NO_RESPONSE",
            ProviderError::Request(_) => "PROVIDER_REQUEST_ERROR",
            ProviderError::MalformedResponse(_) => "PROVIDER_MALFORMED_RESPONSE",
            ProviderError::Rejected(_) => "PROVIDER_REJECTED",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ProviderError::Request(err.to_string())
        } else if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else if err.is_connect() {
            ProviderError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            // timeout and body transfer failures
            ProviderError::NoResponse(err.to_string())
        }
    }
}
