use crate::domain::gateway::{PurchaseStart, Receipt, RedirectTarget, Verification};
use crate::domain::invoice::Invoice;
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DRIVER_NAME: &str = "simulated";
const DEFAULT_PAYMENT_URL: &str = "https://gateway.invalid/pay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayerAction {
    Awaiting,
    Paid,
    Declined,
}

#[derive(Debug, Clone)]
struct Purchase {
    amount: Amount,
    callback_url: String,
    action: PayerAction,
}

/// A stand-in for a bank gateway that keeps its ledger in memory.
///
/// `begin_purchase` registers an invoice and issues a gateway id. The payer's
/// side is driven explicitly with `pay` and `decline`.
#[derive(Clone)]
pub struct SimulatedGateway {
    payment_url: String,
    purchases: Arc<RwLock<HashMap<String, Purchase>>>,
    unavailable: Arc<RwLock<Option<String>>>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(DEFAULT_PAYMENT_URL)
    }
}

impl SimulatedGateway {
    pub fn new(payment_url: impl Into<String>) -> Self {
        Self {
            payment_url: payment_url.into(),
            purchases: Arc::default(),
            unavailable: Arc::default(),
        }
    }

    /// Makes every subsequent `begin_purchase` fail with `reason`; `None` restores service.
    pub async fn set_unavailable(&self, reason: Option<String>) {
        *self.unavailable.write().await = reason;
    }

    pub async fn pay(&self, gateway_transaction_id: &str) -> Result<()> {
        self.settle(gateway_transaction_id, PayerAction::Paid).await
    }

    pub async fn decline(&self, gateway_transaction_id: &str) -> Result<()> {
        self.settle(gateway_transaction_id, PayerAction::Declined).await
    }

    pub async fn callback_url(&self, gateway_transaction_id: &str) -> Option<String> {
        let purchases = self.purchases.read().await;
        purchases
            .get(gateway_transaction_id)
            .map(|p| p.callback_url.clone())
    }

    pub async fn purchase_count(&self) -> usize {
        self.purchases.read().await.len()
    }

    async fn settle(&self, gateway_transaction_id: &str, action: PayerAction) -> Result<()> {
        let mut purchases = self.purchases.write().await;
        let purchase = purchases.get_mut(gateway_transaction_id).ok_or_else(|| {
            PaymentError::NotFound(format!("gateway transaction {}", gateway_transaction_id))
        })?;
        if purchase.action == PayerAction::Awaiting {
            purchase.action = action;
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn begin_purchase(
        &self,
        invoice: &Invoice,
        callback_url: &str,
        description: &str,
    ) -> Result<PurchaseStart> {
        if let Some(reason) = self.unavailable.read().await.clone() {
            return Err(PaymentError::Gateway(reason));
        }

        let gateway_transaction_id = Uuid::new_v4().simple().to_string();
        self.purchases.write().await.insert(
            gateway_transaction_id.clone(),
            Purchase {
                amount: invoice.amount(),
                callback_url: callback_url.to_string(),
                action: PayerAction::Awaiting,
            },
        );

        let redirect = RedirectTarget::post(
            self.payment_url.clone(),
            vec![
                ("token".to_string(), gateway_transaction_id.clone()),
                ("amount".to_string(), invoice.amount().to_string()),
                ("description".to_string(), description.to_string()),
                ("callback".to_string(), callback_url.to_string()),
            ],
        );

        Ok(PurchaseStart {
            gateway_transaction_id,
            redirect,
        })
    }

    async fn verify(&self, amount: Amount, gateway_transaction_id: &str) -> Result<Verification> {
        let purchases = self.purchases.read().await;
        let invalid = |reason: &str| Verification::Invalid {
            reason: reason.to_string(),
        };

        let verification = match purchases.get(gateway_transaction_id) {
            None => invalid("Unknown transaction"),
            Some(p) if p.amount != amount => invalid("Paid amount does not match the invoice"),
            Some(p) => match p.action {
                PayerAction::Awaiting => invalid("Payment has not been completed"),
                PayerAction::Declined => invalid("Payment was cancelled by the payer"),
                PayerAction::Paid => Verification::Verified(Receipt {
                    reference_id: format!("ref-{}", gateway_transaction_id),
                    driver: DRIVER_NAME.to_string(),
                }),
            },
        };
        Ok(verification)
    }
}
