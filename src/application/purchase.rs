use crate::config::PaymentSettings;
use crate::domain::gateway::RedirectTarget;
use crate::domain::invoice::Invoice;
use crate::domain::membership::{MembershipId, MembershipRequest, UserId};
use crate::domain::ports::{MembershipStoreRef, PaymentGatewayRef, TransactionStoreRef};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::{PaymentError, Result};
use tracing::{error, info, warn};

/// First phase of the payment workflow: sends the payer to the gateway.
///
/// Holds one canonical transaction per membership request and reuses it
/// across repeated attempts until it settles or fails.
pub struct PurchaseInitiator {
    memberships: MembershipStoreRef,
    transactions: TransactionStoreRef,
    gateway: PaymentGatewayRef,
    settings: PaymentSettings,
}

impl PurchaseInitiator {
    pub fn new(
        memberships: MembershipStoreRef,
        transactions: TransactionStoreRef,
        gateway: PaymentGatewayRef,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            memberships,
            transactions,
            gateway,
            settings,
        }
    }

    /// Entry point for an authenticated user paying for `membership_id`.
    pub async fn purchase(
        &self,
        membership_id: MembershipId,
        actor: UserId,
    ) -> Result<RedirectTarget> {
        let membership = self
            .memberships
            .get(membership_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("membership {}", membership_id)))?;
        self.initiate_purchase(&membership, actor).await
    }

    /// Returns where to send the payer next.
    ///
    /// Fails with `NotApproved`, without touching storage, unless the request
    /// is waiting for payment. Any other failure is logged and returned as a
    /// recoverable `GatewayInitiation` error.
    pub async fn initiate_purchase(
        &self,
        membership: &MembershipRequest,
        actor: UserId,
    ) -> Result<RedirectTarget> {
        if !membership.is_payable() {
            warn!(membership = %membership.id, status = ?membership.status, "Purchase refused, request not approved");
            return Err(PaymentError::NotApproved);
        }

        match self.start(membership, actor).await {
            Ok(target) => Ok(target),
            Err(e) => {
                error!(membership = %membership.id, error = %e, "Purchase could not be started");
                Err(match e {
                    PaymentError::Gateway(reason)
                    | PaymentError::Validation(reason)
                    | PaymentError::GatewayInitiation(reason) => {
                        PaymentError::GatewayInitiation(reason)
                    }
                    other => PaymentError::GatewayInitiation(other.user_message()),
                })
            }
        }
    }

    async fn start(&self, membership: &MembershipRequest, actor: UserId) -> Result<RedirectTarget> {
        let invoice = Invoice::new(membership.price.value())?;

        let candidate = Transaction::pending(actor, membership.id, invoice.amount());
        let candidate_id = candidate.id;
        let mut tx = self.transactions.find_or_create_pending(candidate).await?;
        if tx.id == candidate_id {
            info!(transaction = %tx.id, membership = %membership.id, "Created pending transaction");
        }

        if tx.status == TransactionStatus::Success {
            info!(transaction = %tx.id, "Transaction already paid, skipping gateway");
            return Ok(RedirectTarget::get(self.settings.callback_url(tx.id)));
        }

        let callback_url = self.settings.callback_url(tx.id);
        let description = self.settings.purchase_description(invoice.amount());
        let started = self
            .gateway
            .begin_purchase(&invoice, &callback_url, &description)
            .await?;

        // The verifier checks the stored price, so it must match what was invoiced.
        tx.price = invoice.amount();
        tx.assign_gateway_id(started.gateway_transaction_id)?;

        // A callback may have settled or failed the row while the gateway was busy.
        let stored = self.transactions.update_pending(tx).await?;
        match stored.status {
            TransactionStatus::Pending => {
                info!(
                    transaction = %stored.id,
                    gateway_transaction = stored.gateway_transaction_id.as_deref().unwrap_or_default(),
                    callback = %callback_url,
                    "Purchase started at gateway"
                );
                Ok(started.redirect)
            }
            TransactionStatus::Success => {
                info!(transaction = %stored.id, "Transaction settled while purchase was starting");
                Ok(RedirectTarget::get(callback_url))
            }
            TransactionStatus::Failed => Err(PaymentError::GatewayInitiation(
                "This payment attempt has already failed, please try again".to_string(),
            )),
        }
    }
}
