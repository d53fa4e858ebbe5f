use super::membership::{MembershipId, UserId};
use super::money::Amount;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// One payment attempt for a membership request.
///
/// `Pending` moves to either `Success` or `Failed` exactly once. A failed
/// attempt is never reopened; paying again creates a new transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub user: UserId,
    pub membership: MembershipId,
    pub price: Amount,
    /// Assigned by the gateway once a purchase has been started.
    pub gateway_transaction_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn pending(user: UserId, membership: MembershipId, price: Amount) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            user,
            membership,
            price,
            gateway_transaction_id: None,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assign_gateway_id(&mut self, gateway_transaction_id: String) -> Result<(), PaymentError> {
        if self.status != TransactionStatus::Pending {
            return Err(PaymentError::Validation(format!(
                "Transaction {} is {:?} and cannot be restarted",
                self.id, self.status
            )));
        }
        self.gateway_transaction_id = Some(gateway_transaction_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Settles the attempt. Settling twice is a no-op.
    pub fn mark_success(&mut self) -> Result<(), PaymentError> {
        match self.status {
            TransactionStatus::Pending => {
                self.status = TransactionStatus::Success;
                self.updated_at = Utc::now();
                Ok(())
            }
            TransactionStatus::Success => Ok(()),
            TransactionStatus::Failed => Err(PaymentError::Validation(format!(
                "Transaction {} already failed",
                self.id
            ))),
        }
    }

    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        match self.status {
            TransactionStatus::Pending => {
                self.status = TransactionStatus::Failed;
                self.updated_at = Utc::now();
                Ok(())
            }
            TransactionStatus::Failed => Ok(()),
            TransactionStatus::Success => Err(PaymentError::Validation(format!(
                "Transaction {} already succeeded",
                self.id
            ))),
        }
    }
}
