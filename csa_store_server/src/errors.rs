use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use csa_store_engine::{
    traits::{CartError, CatalogError, DiscountError, LedgerError, MemberError, OrderError, PaymentError},
    ReportError,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Cannot modify the cart. {0}")]
    CartRejection(String),
    #[error("Discount code rejected. {0}")]
    DiscountRejection(String),
    #[error("Payment gateway error. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::CartRejection(_) => StatusCode::BAD_REQUEST,
            Self::DiscountRejection(_) => StatusCode::BAD_REQUEST,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token has expired.")]
    TokenExpired,
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            CartError::ItemNotFound(_) | CartError::ProfileNotFound(_) => Self::NoRecordFound(e.to_string()),
            other => Self::CartRejection(other.to_string()),
        }
    }
}

impl From<DiscountError> for ServerError {
    fn from(e: DiscountError) -> Self {
        match e {
            DiscountError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            other => Self::DiscountRejection(other.to_string()),
        }
    }
}

impl From<MemberError> for ServerError {
    fn from(e: MemberError) -> Self {
        match e {
            MemberError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            MemberError::NotFound(_) | MemberError::EmailNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<PaymentError> for ServerError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            PaymentError::UnknownCustomer(c) => Self::NoRecordFound(format!("gateway customer {c}")),
            PaymentError::DuplicatePayment { .. } => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            CatalogError::ProductNotFound(_) | CatalogError::VendorNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogError::InvalidOptions(o) => Self::InvalidRequestBody(o),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<OrderError> for ServerError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            OrderError::CartEmpty(_) | OrderError::ProfileNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<ReportError> for ServerError {
    fn from(e: ReportError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<stripe_tools::StripeApiError> for ServerError {
    fn from(e: stripe_tools::StripeApiError) -> Self {
        match e {
            stripe_tools::StripeApiError::CardError(msg) => Self::InvalidRequestBody(msg),
            other => Self::GatewayError(other.to_string()),
        }
    }
}

impl From<signrequest_tools::SignRequestApiError> for ServerError {
    fn from(e: signrequest_tools::SignRequestApiError) -> Self {
        Self::GatewayError(e.to_string())
    }
}
