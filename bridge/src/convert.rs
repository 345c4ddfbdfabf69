//! Native failure → [`ErrorInfo`].

use latchkey_types::{ErrorCode, ErrorDetail, ErrorInfo};
use thiserror::Error;

/// Failure shape accepted from capability providers.
pub type NativeFailure = Box<dyn std::error::Error + Send + Sync>;

/// Structured failure raised by a provider.
///
/// Unlike [`ErrorInfo`], the detail is not checked against the code here;
/// the converter drops a detail whose governing code does not match.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {description}")]
pub struct ProviderError {
    pub code: ErrorCode,
    pub description: String,
    pub detail: Option<ErrorDetail>,
}

impl ProviderError {
    #[must_use]
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Normalize any provider failure. Never fails.
#[must_use]
pub fn convert_failure(failure: NativeFailure) -> ErrorInfo {
    let failure = match failure.downcast::<ErrorInfo>() {
        Ok(info) => return *info,
        Err(other) => other,
    };
    match failure.downcast::<ProviderError>() {
        Ok(err) => {
            let ProviderError {
                code,
                description,
                detail,
            } = *err;
            let info = ErrorInfo::new(code, description);
            match detail {
                Some(detail) if detail.governing_code() == code => info.with_detail(detail),
                Some(detail) => {
                    tracing::warn!(
                        %code,
                        detail_code = %detail.governing_code(),
                        "dropping error detail that does not match its code"
                    );
                    info
                }
                None => info,
            }
        }
        Err(other) => ErrorInfo::internal(format!("unexpected native failure: {other}")),
    }
}
