use crate::domain::payment_request::PaymentRequestState;
use crate::domain::state_machine::Transition;
use serde::Serialize;
use thiserror::Error;

/// A single field-level (or resource-level, with an empty path) constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub property_path: String,
    pub message: String,
}

impl Violation {
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentRequestError {
    #[error("{resource} \"{id}\" not found")]
    NotFound { resource: &'static str, id: String },
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Validation failed: {0:?}")]
    ValidationError(Vec<Violation>),
    #[error(
        "The payment request (method code: {method_code} and payment id: {payment_id}) has no handler. Please choose another payment method."
    )]
    NoHandlerAvailable { method_code: String, payment_id: u64 },
    #[error("No \"pay response provider\" available for order (id {order_id}).")]
    NoPayResponseProvider { order_id: u64 },
    #[error("No \"after pay response provider\" available.")]
    NoAfterPayResponseProvider,
    #[error("Gateway error: {0}")]
    GatewayFailure(String),
    #[error("Version conflict on payment request {hash} (expected version {expected})")]
    Conflict { hash: String, expected: u64 },
    #[error("Cannot apply {transition:?} to a payment request in state {from}")]
    InvalidTransition {
        from: PaymentRequestState,
        transition: Transition,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentRequestError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentRequestError>;
