use crate::domain::payment::PaymentState;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorClass {
    /// Network failures, timeouts, 5xx — worth retrying.
    Transient,
    /// 4xx from the gateway — retrying will not help.
    Client,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("gateway call failed: {message}")]
    Gateway {
        class: GatewayErrorClass,
        message: String,
    },

    #[error("not allowed from {state:?}: {reason}")]
    StateConflict { state: PaymentState, reason: String },

    #[error("webhook signature rejected")]
    Signature,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn state_conflict(state: PaymentState, reason: impl Into<String>) -> Self {
        CoreError::StateConflict {
            state,
            reason: reason.into(),
        }
    }

    pub fn gateway_transient(msg: impl Into<String>) -> Self {
        CoreError::Gateway {
            class: GatewayErrorClass::Transient,
            message: msg.into(),
        }
    }

    pub fn gateway_client(msg: impl Into<String>) -> Self {
        CoreError::Gateway {
            class: GatewayErrorClass::Client,
            message: msg.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Gateway {
                class: GatewayErrorClass::Transient,
                ..
            }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Gateway { .. } => "GATEWAY_ERROR",
            CoreError::StateConflict { .. } => "STATE_CONFLICT",
            CoreError::Signature => "INVALID_SIGNATURE",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            CoreError::StateConflict { .. } => StatusCode::CONFLICT,
            CoreError::Signature => StatusCode::BAD_REQUEST,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            CoreError::StateConflict { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Internal(e.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
