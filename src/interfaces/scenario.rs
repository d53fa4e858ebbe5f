use crate::application::{PaymentVerifier, PurchaseInitiator, VerificationResult};
use crate::config::PaymentSettings;
use crate::domain::gateway::RedirectTarget;
use crate::domain::membership::{MembershipId, MembershipRequest, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::{
    MembershipStore, MembershipStoreRef, TransactionStore, TransactionStoreRef, UnitOfWorkFactory,
};
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use crate::infrastructure::simulated_gateway::SimulatedGateway;
use crate::interfaces::csv::scenario_reader::{Action, ScenarioStep};
use std::sync::Arc;
use tracing::info;

/// What a single step produced, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Recorded,
    Redirect(RedirectTarget),
    Verified(VerificationResult),
}

/// Replays scenario steps against the payment workflow.
///
/// The simulated gateway plays the bank and the payer; `request` and
/// `approve` stand in for the membership module.
pub struct ScenarioRunner {
    memberships: MembershipStoreRef,
    transactions: TransactionStoreRef,
    gateway: SimulatedGateway,
    initiator: PurchaseInitiator,
    verifier: PaymentVerifier,
}

impl ScenarioRunner {
    pub fn new<S>(store: S, gateway: SimulatedGateway, settings: PaymentSettings) -> Self
    where
        S: MembershipStore + TransactionStore + UnitOfWorkFactory + Clone + 'static,
    {
        let memberships: MembershipStoreRef = Arc::new(store.clone());
        let transactions: TransactionStoreRef = Arc::new(store.clone());
        let units = Arc::new(store);
        let gateway_ref = Arc::new(gateway.clone());

        Self {
            initiator: PurchaseInitiator::new(
                memberships.clone(),
                transactions.clone(),
                gateway_ref.clone(),
                settings,
            ),
            verifier: PaymentVerifier::new(transactions.clone(), units, gateway_ref),
            memberships,
            transactions,
            gateway,
        }
    }

    pub async fn apply(&self, step: ScenarioStep) -> Result<StepOutcome> {
        let id = MembershipId(step.membership);
        match step.action {
            Action::Request => {
                let actor = step.actor.map(UserId).ok_or_else(|| missing("actor"))?;
                let price = Amount::new(step.amount.ok_or_else(|| missing("amount"))?)?;
                if self.memberships.get(id).await?.is_some() {
                    return Err(PaymentError::Validation(format!(
                        "Membership {} already exists",
                        id
                    )));
                }
                self.memberships
                    .store(MembershipRequest::new(id, actor, price))
                    .await?;
                Ok(StepOutcome::Recorded)
            }
            Action::Approve => {
                let mut membership = self.membership(id).await?;
                membership.approve()?;
                self.memberships.store(membership).await?;
                Ok(StepOutcome::Recorded)
            }
            Action::Purchase => {
                let actor = match step.actor {
                    Some(actor) => UserId(actor),
                    None => self.membership(id).await?.user,
                };
                let target = self.initiator.purchase(id, actor).await?;
                info!(membership = %id, url = %target.url, "Redirecting payer");
                Ok(StepOutcome::Redirect(target))
            }
            Action::Pay => {
                let gateway_id = self.gateway_id(id).await?;
                self.gateway.pay(&gateway_id).await?;
                Ok(StepOutcome::Recorded)
            }
            Action::Decline => {
                let gateway_id = self.gateway_id(id).await?;
                self.gateway.decline(&gateway_id).await?;
                Ok(StepOutcome::Recorded)
            }
            Action::Verify => {
                let tx = self.canonical(id).await?;
                let result = self.verifier.verify_by_id(tx.id).await?;
                info!(membership = %id, status = ?result.status, detail = %result.message, "Verification finished");
                Ok(StepOutcome::Verified(result))
            }
        }
    }

    pub async fn memberships(&self) -> Result<Vec<MembershipRequest>> {
        self.memberships.get_all().await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.transactions.get_all().await
    }

    async fn membership(&self, id: MembershipId) -> Result<MembershipRequest> {
        self.memberships
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("membership {}", id)))
    }

    async fn canonical(&self, id: MembershipId) -> Result<Transaction> {
        self.transactions
            .find_by_membership(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction for membership {}", id)))
    }

    async fn gateway_id(&self, id: MembershipId) -> Result<String> {
        self.canonical(id)
            .await?
            .gateway_transaction_id
            .ok_or_else(|| PaymentError::Validation(format!("Membership {} has no purchase in progress", id)))
    }
}

fn missing(field: &str) -> PaymentError {
    PaymentError::Validation(format!("Missing {} column", field))
}
