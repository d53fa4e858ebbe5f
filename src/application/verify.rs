use crate::domain::gateway::{Receipt, Verification};
use crate::domain::membership::MembershipRequest;
use crate::domain::ports::{
    PaymentGatewayRef, TransactionStoreRef, UnitOfWork, UnitOfWorkFactoryRef,
};
use crate::domain::transaction::{Transaction, TransactionId, TransactionStatus};
use crate::error::{PaymentError, Result};
use serde::Serialize;
use tracing::{info, warn};

pub const PAID_MESSAGE: &str = "Your payment was recorded successfully";
pub const ALREADY_PAID_MESSAGE: &str = "This transaction has already been paid";
pub const ALREADY_FAILED_MESSAGE: &str = "This transaction has already failed, please start a new payment";
pub const NOT_STARTED_MESSAGE: &str = "Payment for this transaction was never started";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// What the presentation layer renders after a callback.
///
/// `membership` is attached for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub status: ResultStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
}

impl VerificationResult {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            membership: None,
            receipt: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Failed,
            message: message.into(),
            membership: None,
            receipt: None,
        }
    }

    fn with_membership(mut self, membership: MembershipRequest) -> Self {
        self.membership = Some(membership);
        self
    }
}

/// Second phase of the payment workflow: settles a transaction after the
/// gateway calls back.
pub struct PaymentVerifier {
    transactions: TransactionStoreRef,
    units: UnitOfWorkFactoryRef,
    gateway: PaymentGatewayRef,
}

impl PaymentVerifier {
    pub fn new(
        transactions: TransactionStoreRef,
        units: UnitOfWorkFactoryRef,
        gateway: PaymentGatewayRef,
    ) -> Self {
        Self {
            transactions,
            units,
            gateway,
        }
    }

    /// Entry point for the gateway callback, which carries only the id.
    pub async fn verify_by_id(&self, id: TransactionId) -> Result<VerificationResult> {
        let tx = self
            .transactions
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", id)))?;
        self.verify(tx).await
    }

    /// Confirms the payment with the gateway and records the outcome.
    ///
    /// On success the transaction and the membership are written in one unit.
    /// On an invalid payment the unit is rolled back and the `Failed` status is
    /// written on its own afterwards, so the failed attempt stays on record.
    /// Any other error rolls the unit back and propagates.
    pub async fn verify(&self, mut tx: Transaction) -> Result<VerificationResult> {
        match tx.status {
            TransactionStatus::Success => return Ok(VerificationResult::success(ALREADY_PAID_MESSAGE)),
            TransactionStatus::Failed => return Ok(VerificationResult::failed(ALREADY_FAILED_MESSAGE)),
            TransactionStatus::Pending => {}
        }
        let Some(gateway_transaction_id) = tx.gateway_transaction_id.clone() else {
            warn!(transaction = %tx.id, "Callback for a purchase that never reached the gateway");
            return Ok(VerificationResult::failed(NOT_STARTED_MESSAGE));
        };

        let mut unit = self.units.begin().await?;
        let checked = self
            .check_with_gateway(unit.as_mut(), &tx, &gateway_transaction_id)
            .await;
        let (mut membership, verification) = match checked {
            Ok(checked) => checked,
            Err(e) => {
                unit.rollback().await?;
                return Err(e);
            }
        };

        match verification {
            Verification::Verified(receipt) => {
                if let Err(e) = tx.mark_success().and_then(|_| membership.mark_paid()) {
                    unit.rollback().await?;
                    return Err(e);
                }
                unit.stage_transaction(tx.clone());
                unit.stage_membership(membership.clone());
                unit.commit().await?;
                info!(transaction = %tx.id, membership = %membership.id, reference = %receipt.reference_id, "Payment settled");

                let mut result = VerificationResult::success(PAID_MESSAGE).with_membership(membership);
                result.receipt = Some(receipt);
                Ok(result)
            }
            Verification::Invalid { reason } => {
                unit.rollback().await?;
                tx.mark_failed()?;
                // Written outside the unit so the failed attempt stays on record.
                let stored = self.transactions.update_pending(tx).await?;
                match stored.status {
                    TransactionStatus::Success => {
                        info!(transaction = %stored.id, "Transaction settled by another callback");
                        Ok(VerificationResult::success(ALREADY_PAID_MESSAGE))
                    }
                    _ => {
                        warn!(transaction = %stored.id, reason = %reason, "Payment rejected by gateway");
                        Ok(VerificationResult::failed(reason).with_membership(membership))
                    }
                }
            }
        }
    }

    async fn check_with_gateway(
        &self,
        unit: &mut dyn UnitOfWork,
        tx: &Transaction,
        gateway_transaction_id: &str,
    ) -> Result<(MembershipRequest, Verification)> {
        let membership = unit
            .membership(tx.membership)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("membership {}", tx.membership)))?;
        let verification = self.gateway.verify(tx.price, gateway_transaction_id).await?;
        Ok((membership, verification))
    }
}
