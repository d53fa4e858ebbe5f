use super::money::Amount;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the membership module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(pub u64);

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the authenticated user acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    AwaitingApproval,
    WaitingForPayment,
    Paid,
    Rejected,
}

/// A user's request to join, owned by the membership module.
///
/// Only the payment verifier mutates it here, and only from
/// `WaitingForPayment` to `Paid`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MembershipRequest {
    pub id: MembershipId,
    pub user: UserId,
    pub price: Amount,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipRequest {
    pub fn new(id: MembershipId, user: UserId, price: Amount) -> Self {
        let now = Utc::now();
        Self {
            id,
            user,
            price,
            status: MembershipStatus::AwaitingApproval,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_payable(&self) -> bool {
        self.status == MembershipStatus::WaitingForPayment
    }

    /// Approval happens in the membership module; exposed for seeding.
    pub fn approve(&mut self) -> Result<(), PaymentError> {
        match self.status {
            MembershipStatus::AwaitingApproval => {
                self.status = MembershipStatus::WaitingForPayment;
                self.updated_at = Utc::now();
                Ok(())
            }
            MembershipStatus::WaitingForPayment => Ok(()),
            other => Err(PaymentError::Validation(format!(
                "Membership {} cannot be approved from {:?}",
                self.id, other
            ))),
        }
    }

    pub fn mark_paid(&mut self) -> Result<(), PaymentError> {
        match self.status {
            MembershipStatus::WaitingForPayment => {
                self.status = MembershipStatus::Paid;
                self.updated_at = Utc::now();
                Ok(())
            }
            MembershipStatus::Paid => Ok(()),
            other => Err(PaymentError::Validation(format!(
                "Membership {} cannot be paid from {:?}",
                self.id, other
            ))),
        }
    }
}
