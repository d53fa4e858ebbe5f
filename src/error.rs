use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Membership request is not approved for payment yet")]
    NotApproved,
    #[error("Could not start payment: {0}")]
    GatewayInitiation(String),
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// Text safe to show to the person who triggered the operation.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::NotApproved => "Your membership request has not been approved yet".into(),
            PaymentError::GatewayInitiation(reason) | PaymentError::Validation(reason) => {
                reason.clone()
            }
            PaymentError::NotFound(_) => "The requested payment could not be found".into(),
            _ => "Payment could not be processed, please try again later".into(),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        PaymentError::Storage(e.into_string())
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
