#![allow(dead_code)]

use async_trait::async_trait;
use membership_pay::application::{PaymentVerifier, PurchaseInitiator};
use membership_pay::config::PaymentSettings;
use membership_pay::domain::gateway::{PurchaseStart, Verification};
use membership_pay::domain::invoice::Invoice;
use membership_pay::domain::membership::{MembershipId, MembershipRequest, UserId};
use membership_pay::domain::money::Amount;
use membership_pay::domain::ports::{
    MembershipStore, PaymentGateway, UnitOfWork, UnitOfWorkFactory, UnitOfWorkFactoryRef,
};
use membership_pay::domain::transaction::TransactionId;
use membership_pay::error::{PaymentError, Result};
use membership_pay::infrastructure::in_memory::InMemoryStore;
use membership_pay::infrastructure::simulated_gateway::SimulatedGateway;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const ACTOR: UserId = UserId(7);

/// Wraps the simulated gateway and counts calls, optionally failing `verify`.
#[derive(Clone, Default)]
pub struct CountingGateway {
    pub inner: SimulatedGateway,
    pub begins: Arc<AtomicUsize>,
    pub verifies: Arc<AtomicUsize>,
    pub broken_verify: bool,
}

impl CountingGateway {
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn verifies(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn begin_purchase(
        &self,
        invoice: &Invoice,
        callback_url: &str,
        description: &str,
    ) -> Result<PurchaseStart> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner
            .begin_purchase(invoice, callback_url, description)
            .await
    }

    async fn verify(&self, amount: Amount, gateway_transaction_id: &str) -> Result<Verification> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        if self.broken_verify {
            return Err(PaymentError::Gateway("connection reset".to_string()));
        }
        self.inner.verify(amount, gateway_transaction_id).await
    }
}

/// Delivers a settling callback for the first gateway purchase while another
/// gateway call for the same transaction is still in flight.
///
/// With `during_purchase` the callback runs inside the second `begin_purchase`.
/// Otherwise it runs inside the first `verify`, which then answers with the
/// stale outcome it read before the payer finished.
#[derive(Clone, Default)]
pub struct InterleavingGateway {
    pub inner: SimulatedGateway,
    pub verifier: Arc<OnceLock<Arc<PaymentVerifier>>>,
    pub during_purchase: bool,
    pub issued: Arc<Mutex<Vec<(String, String)>>>,
    pub verifies: Arc<AtomicUsize>,
}

impl InterleavingGateway {
    /// Gateway ids in the order they were issued.
    pub async fn issued(&self) -> Vec<String> {
        let issued = self.issued.lock().await;
        issued.iter().map(|(id, _)| id.clone()).collect()
    }

    async fn settle_first(&self) -> Result<()> {
        let first = self.issued.lock().await.first().cloned();
        let Some((gateway_transaction_id, callback_url)) = first else {
            return Ok(());
        };
        self.inner.pay(&gateway_transaction_id).await?;
        let verifier = self
            .verifier
            .get()
            .ok_or_else(|| PaymentError::Gateway("verifier not wired".to_string()))?;
        verifier
            .verify_by_id(callback_transaction(&callback_url))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for InterleavingGateway {
    async fn begin_purchase(
        &self,
        invoice: &Invoice,
        callback_url: &str,
        description: &str,
    ) -> Result<PurchaseStart> {
        let started = self
            .inner
            .begin_purchase(invoice, callback_url, description)
            .await?;
        let count = {
            let mut issued = self.issued.lock().await;
            issued.push((started.gateway_transaction_id.clone(), callback_url.to_string()));
            issued.len()
        };
        if self.during_purchase && count == 2 {
            self.settle_first().await?;
        }
        Ok(started)
    }

    async fn verify(&self, amount: Amount, gateway_transaction_id: &str) -> Result<Verification> {
        let seen = self.verifies.fetch_add(1, Ordering::SeqCst);
        if self.during_purchase || seen > 0 {
            return self.inner.verify(amount, gateway_transaction_id).await;
        }
        let stale = self.inner.verify(amount, gateway_transaction_id).await?;
        self.settle_first().await?;
        Ok(stale)
    }
}

fn callback_transaction(callback_url: &str) -> TransactionId {
    let id = callback_url.rsplit('/').next().unwrap();
    TransactionId(Uuid::parse_str(id).unwrap())
}

/// Wires both services to `gateway`, including its own handle on the verifier.
pub fn interleaving(
    gateway: InterleavingGateway,
) -> (InMemoryStore, PurchaseInitiator, Arc<PaymentVerifier>) {
    let store = InMemoryStore::new();
    let gateway_ref = Arc::new(gateway.clone());
    let verifier = Arc::new(PaymentVerifier::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway_ref.clone(),
    ));
    let _ = gateway.verifier.set(verifier.clone());
    let initiator = PurchaseInitiator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway_ref,
        PaymentSettings::default(),
    );
    (store, initiator, verifier)
}

/// A unit of work whose commit always fails, simulating a crash at commit time.
pub struct FailingCommitUnits {
    pub inner: InMemoryStore,
}

struct FailingCommitUnit {
    inner: Box<dyn UnitOfWork>,
}

#[async_trait]
impl UnitOfWork for FailingCommitUnit {
    async fn membership(&mut self, id: MembershipId) -> Result<Option<MembershipRequest>> {
        self.inner.membership(id).await
    }

    fn stage_transaction(&mut self, tx: membership_pay::domain::transaction::Transaction) {
        self.inner.stage_transaction(tx);
    }

    fn stage_membership(&mut self, membership: MembershipRequest) {
        self.inner.stage_membership(membership);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await?;
        Err(PaymentError::Storage("disk full".to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl UnitOfWorkFactory for FailingCommitUnits {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(FailingCommitUnit {
            inner: self.inner.begin().await?,
        }))
    }
}

/// The two workflow services wired to one in-memory store.
pub struct Harness {
    pub store: InMemoryStore,
    pub gateway: CountingGateway,
    pub initiator: PurchaseInitiator,
    pub verifier: PaymentVerifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(CountingGateway::default())
    }

    pub fn with_gateway(gateway: CountingGateway) -> Self {
        let store = InMemoryStore::new();
        let units: UnitOfWorkFactoryRef = Arc::new(store.clone());
        Self::build(store, gateway, units)
    }

    pub fn with_failing_commit() -> Self {
        let store = InMemoryStore::new();
        let units: UnitOfWorkFactoryRef = Arc::new(FailingCommitUnits {
            inner: store.clone(),
        });
        Self::build(store, CountingGateway::default(), units)
    }

    fn build(store: InMemoryStore, gateway: CountingGateway, units: UnitOfWorkFactoryRef) -> Self {
        let gateway_ref = Arc::new(gateway.clone());
        Self {
            initiator: PurchaseInitiator::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                gateway_ref.clone(),
                PaymentSettings::default(),
            ),
            verifier: PaymentVerifier::new(Arc::new(store.clone()), units, gateway_ref),
            store,
            gateway,
        }
    }

    /// Seeds an approved membership request with the given price.
    pub async fn payable_membership(&self, id: u64, price: Decimal) -> MembershipRequest {
        let mut membership =
            MembershipRequest::new(MembershipId(id), ACTOR, Amount::new(price).unwrap());
        membership.approve().unwrap();
        MembershipStore::store(&self.store, membership.clone())
            .await
            .unwrap();
        membership
    }
}
