use crate::domain::membership::{MembershipId, MembershipRequest};
use crate::domain::ports::{MembershipStore, TransactionStore, UnitOfWork, UnitOfWorkFactory};
use crate::domain::transaction::{Transaction, TransactionId, TransactionStatus};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    memberships: HashMap<MembershipId, MembershipRequest>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl State {
    fn canonical(&self, membership: MembershipId) -> Option<&Transaction> {
        self.transactions
            .values()
            .filter(|tx| tx.membership == membership && tx.status != TransactionStatus::Failed)
            .max_by_key(|tx| tx.created_at)
    }

    fn check_transition(&self, staged: &Transaction) -> Result<()> {
        match self.transactions.get(&staged.id) {
            Some(stored) if stored.status.is_terminal() && stored.status != staged.status => {
                Err(PaymentError::Conflict(format!(
                    "Transaction {} is already {:?}",
                    stored.id, stored.status
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A thread-safe in-memory store for memberships and transactions.
///
/// Both tables sit behind one `RwLock`, so a unit of work commits all of its
/// writes under a single write guard. Ideal for testing or local runs where
/// persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn store(&self, membership: MembershipRequest) -> Result<()> {
        let mut state = self.state.write().await;
        state.memberships.insert(membership.id, membership);
        Ok(())
    }

    async fn get(&self, id: MembershipId) -> Result<Option<MembershipRequest>> {
        let state = self.state.read().await;
        Ok(state.memberships.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<MembershipRequest>> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state.memberships.values().cloned().collect();
        all.sort_by_key(|m| m.id);
        Ok(all)
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let mut state = self.state.write().await;
        state.transactions.insert(tx.id, tx);
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(&id).cloned())
    }

    async fn find_by_membership(&self, membership: MembershipId) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state.canonical(membership).cloned())
    }

    async fn find_or_create_pending(&self, candidate: Transaction) -> Result<Transaction> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.canonical(candidate.membership) {
            return Ok(existing.clone());
        }
        state.transactions.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn update_pending(&self, tx: Transaction) -> Result<Transaction> {
        let mut state = self.state.write().await;
        let stored = state
            .transactions
            .get(&tx.id)
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", tx.id)))?;
        if stored.status != TransactionStatus::Pending {
            return Ok(stored.clone());
        }
        state.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state.transactions.values().cloned().collect();
        all.sort_by_key(|tx| (tx.membership, tx.created_at));
        Ok(all)
    }
}

/// Buffers writes until `commit` applies them under one write guard.
pub struct InMemoryUnit {
    state: Arc<RwLock<State>>,
    transactions: Vec<Transaction>,
    memberships: Vec<MembershipRequest>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn membership(&mut self, id: MembershipId) -> Result<Option<MembershipRequest>> {
        let state = self.state.read().await;
        Ok(state.memberships.get(&id).cloned())
    }

    fn stage_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    fn stage_membership(&mut self, membership: MembershipRequest) {
        self.memberships.push(membership);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnit {
            state,
            transactions,
            memberships,
        } = *self;
        let mut state = state.write().await;
        for tx in &transactions {
            state.check_transition(tx)?;
        }
        for tx in transactions {
            state.transactions.insert(tx.id, tx);
        }
        for membership in memberships {
            state.memberships.insert(membership.id, membership);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnit {
            state: self.state.clone(),
            transactions: Vec::new(),
            memberships: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::UserId;
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;

    fn membership(id: u64) -> MembershipRequest {
        MembershipRequest::new(MembershipId(id), UserId(7), Amount::new(dec!(500000)).unwrap())
    }

    fn pending(membership: u64) -> Transaction {
        Transaction::pending(UserId(7), MembershipId(membership), Amount::new(dec!(500000)).unwrap())
    }

    #[tokio::test]
    async fn test_in_memory_membership_store() {
        let store = InMemoryStore::new();
        let m = membership(1);

        MembershipStore::store(&store, m.clone()).await.unwrap();
        let retrieved = MembershipStore::get(&store, MembershipId(1)).await.unwrap().unwrap();
        assert_eq!(retrieved, m);

        assert!(MembershipStore::get(&store, MembershipId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_pending() {
        let store = InMemoryStore::new();
        let first = store.find_or_create_pending(pending(1)).await.unwrap();
        let second = store.find_or_create_pending(pending(1)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(TransactionStore::get_all(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_or_create_skips_failed() {
        let store = InMemoryStore::new();
        let mut failed = store.find_or_create_pending(pending(1)).await.unwrap();
        failed.mark_failed().unwrap();
        TransactionStore::store(&store, failed.clone()).await.unwrap();

        let fresh = store.find_or_create_pending(pending(1)).await.unwrap();
        assert_ne!(fresh.id, failed.id);
        assert_eq!(fresh.status, TransactionStatus::Pending);
        assert_eq!(store.find_by_membership(MembershipId(1)).await.unwrap().unwrap().id, fresh.id);
    }

    #[tokio::test]
    async fn test_unit_of_work_commit_and_rollback() {
        let store = InMemoryStore::new();
        let mut m = membership(1);
        m.approve().unwrap();
        MembershipStore::store(&store, m.clone()).await.unwrap();
        let tx = store.find_or_create_pending(pending(1)).await.unwrap();

        let mut paid = m.clone();
        paid.mark_paid().unwrap();
        let mut settled = tx.clone();
        settled.mark_success().unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.stage_membership(paid.clone());
        unit.stage_transaction(settled.clone());
        unit.rollback().await.unwrap();
        assert_eq!(MembershipStore::get(&store, m.id).await.unwrap().unwrap(), m);
        assert_eq!(TransactionStore::get(&store, tx.id).await.unwrap().unwrap(), tx);

        let mut unit = store.begin().await.unwrap();
        unit.stage_membership(paid.clone());
        unit.stage_transaction(settled.clone());
        unit.commit().await.unwrap();
        assert_eq!(MembershipStore::get(&store, m.id).await.unwrap().unwrap(), paid);
        assert_eq!(TransactionStore::get(&store, tx.id).await.unwrap().unwrap(), settled);
    }

    #[tokio::test]
    async fn test_update_pending_keeps_settled_row() {
        let store = InMemoryStore::new();
        let tx = store.find_or_create_pending(pending(1)).await.unwrap();
        let mut settled = tx.clone();
        settled.mark_success().unwrap();
        TransactionStore::store(&store, settled.clone()).await.unwrap();

        let mut stale = tx.clone();
        stale.assign_gateway_id("late".to_string()).unwrap();
        let stored = store.update_pending(stale).await.unwrap();

        assert_eq!(stored, settled);
        assert_eq!(TransactionStore::get(&store, tx.id).await.unwrap().unwrap(), settled);
    }

    #[tokio::test]
    async fn test_update_pending_writes_pending_row() {
        let store = InMemoryStore::new();
        let mut tx = store.find_or_create_pending(pending(1)).await.unwrap();
        tx.assign_gateway_id("abc".to_string()).unwrap();

        let stored = store.update_pending(tx.clone()).await.unwrap();
        assert_eq!(stored.gateway_transaction_id.as_deref(), Some("abc"));
        assert!(matches!(
            store.update_pending(pending(2)).await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_refuses_to_reopen_failed_transaction() {
        let store = InMemoryStore::new();
        let mut m = membership(1);
        m.approve().unwrap();
        MembershipStore::store(&store, m.clone()).await.unwrap();
        let tx = store.find_or_create_pending(pending(1)).await.unwrap();

        let mut failed = tx.clone();
        failed.mark_failed().unwrap();
        TransactionStore::store(&store, failed.clone()).await.unwrap();

        let mut settled = tx.clone();
        settled.mark_success().unwrap();
        let mut paid = m.clone();
        paid.mark_paid().unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.stage_transaction(settled);
        unit.stage_membership(paid);
        assert!(matches!(unit.commit().await, Err(PaymentError::Conflict(_))));

        assert_eq!(TransactionStore::get(&store, tx.id).await.unwrap().unwrap(), failed);
        assert_eq!(MembershipStore::get(&store, m.id).await.unwrap().unwrap(), m);
    }
}
