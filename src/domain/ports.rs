use super::gateway::{PurchaseStart, Verification};
use super::invoice::Invoice;
use super::membership::{MembershipId, MembershipRequest};
use super::money::Amount;
use super::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn store(&self, membership: MembershipRequest) -> Result<()>;
    async fn get(&self, id: MembershipId) -> Result<Option<MembershipRequest>>;
    async fn get_all(&self) -> Result<Vec<MembershipRequest>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn store(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;
    /// The canonical attempt for a membership: the newest `Pending` or `Success` one.
    async fn find_by_membership(&self, membership: MembershipId) -> Result<Option<Transaction>>;
    /// Returns the canonical attempt for `candidate.membership`, inserting
    /// `candidate` when there is none. Atomic with respect to other callers.
    async fn find_or_create_pending(&self, candidate: Transaction) -> Result<Transaction>;
    /// Writes `tx` only while the stored row is still `Pending` and returns the
    /// row as stored afterwards. A settled or failed row is returned untouched.
    async fn update_pending(&self, tx: Transaction) -> Result<Transaction>;
    async fn get_all(&self) -> Result<Vec<Transaction>>;
}

/// A group of writes that is applied all at once or not at all.
///
/// Reads go to committed state. Staged writes become visible only on `commit`,
/// which fails with `Conflict` and writes nothing if a staged transaction would
/// move a row out of a terminal status.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn membership(&mut self, id: MembershipId) -> Result<Option<MembershipRequest>>;
    fn stage_transaction(&mut self, tx: Transaction);
    fn stage_membership(&mut self, membership: MembershipRequest);
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn begin_purchase(
        &self,
        invoice: &Invoice,
        callback_url: &str,
        description: &str,
    ) -> Result<PurchaseStart>;

    async fn verify(&self, amount: Amount, gateway_transaction_id: &str) -> Result<Verification>;
}

pub type MembershipStoreRef = Arc<dyn MembershipStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type UnitOfWorkFactoryRef = Arc<dyn UnitOfWorkFactory>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
