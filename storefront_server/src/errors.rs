use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use storefront_engine::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
}

impl ServerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => ledger_status_code(e),
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity => StatusCode::UNAUTHORIZED,
                AuthError::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string(), "retryable": self.is_retryable() }).to_string())
    }
}

fn ledger_status_code(e: &LedgerError) -> StatusCode {
    use LedgerError::*;
    match e {
        ValidationError(_) | NoValidItems | InvalidAddress(_) => StatusCode::BAD_REQUEST,
        InsufficientCoins { .. } | InvalidSignature | AmountMismatch { .. } => StatusCode::BAD_REQUEST,
        ReturnWindowExpired(_) => StatusCode::BAD_REQUEST,
        InvalidStateTransition(_) | AlreadyRequested => StatusCode::CONFLICT,
        InsufficientCoinsConcurrent | ConcurrencyConflict(_) => StatusCode::CONFLICT,
        OrderNotFound(_) | PaymentNotFound(_) => StatusCode::NOT_FOUND,
        Unauthorized(_) => StatusCode::FORBIDDEN,
        GatewayError(_) => StatusCode::BAD_GATEWAY,
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No user identity was supplied with the request.")]
    MissingIdentity,
    #[error("The user identity is invalid. {0}")]
    InvalidIdentity(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
