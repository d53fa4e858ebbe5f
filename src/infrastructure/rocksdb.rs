use crate::domain::membership::{MembershipId, MembershipRequest};
use crate::domain::ports::{MembershipStore, TransactionStore, UnitOfWork, UnitOfWorkFactory};
use crate::domain::transaction::{Transaction, TransactionId, TransactionStatus};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for storing membership requests.
pub const CF_MEMBERSHIPS: &str = "memberships";
/// Column Family for storing transactions.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family mapping a membership id to its canonical transaction id.
pub const CF_CANONICAL: &str = "canonical";

/// A persistent store implementation using RocksDB.
///
/// Memberships and transactions live in separate Column Families. Multi-key
/// writes go through a `WriteBatch`, which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes read-then-write transaction updates and unit commits.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_MEMBERSHIPS, CF_TRANSACTIONS, CF_CANONICAL]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Storage(format!("{} column family not found", name)))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    fn put<T: Serialize>(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn put_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        self.put(batch, CF_TRANSACTIONS, tx.id.0.as_bytes(), tx)?;
        if tx.status != TransactionStatus::Failed {
            let cf = self.cf(CF_CANONICAL)?;
            batch.put_cf(cf, tx.membership.0.to_be_bytes(), tx.id.0.as_bytes());
        }
        Ok(())
    }

    fn canonical(&self, membership: MembershipId) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_CANONICAL)?;
        let Some(raw_id) = self.db.get_pinned_cf(cf, membership.0.to_be_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&raw_id)
            .map_err(|e| PaymentError::Storage(format!("Corrupt canonical index: {}", e)))?;
        let tx: Option<Transaction> = self.read(CF_TRANSACTIONS, id.as_bytes())?;
        Ok(tx.filter(|tx| tx.status != TransactionStatus::Failed))
    }

    fn check_transition(&self, staged: &Transaction) -> Result<()> {
        let stored: Option<Transaction> = self.read(CF_TRANSACTIONS, staged.id.0.as_bytes())?;
        match stored {
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

#[async_trait]
impl MembershipStore for RocksDBStore {
    async fn store(&self, membership: MembershipRequest) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_MEMBERSHIPS, &membership.id.0.to_be_bytes(), &membership)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: MembershipId) -> Result<Option<MembershipRequest>> {
        self.read(CF_MEMBERSHIPS, &id.0.to_be_bytes())
    }

    async fn get_all(&self) -> Result<Vec<MembershipRequest>> {
        self.read_all(CF_MEMBERSHIPS)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        self.put_transaction(&mut batch, &tx)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, id.0.as_bytes())
    }

    async fn find_by_membership(&self, membership: MembershipId) -> Result<Option<Transaction>> {
        self.canonical(membership)
    }

    async fn find_or_create_pending(&self, candidate: Transaction) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.canonical(candidate.membership)? {
            return Ok(existing);
        }
        let mut batch = WriteBatch::default();
        self.put_transaction(&mut batch, &candidate)?;
        self.db.write(batch)?;
        Ok(candidate)
    }

    async fn update_pending(&self, tx: Transaction) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let stored: Transaction = self
            .read(CF_TRANSACTIONS, tx.id.0.as_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("transaction {}", tx.id)))?;
        if stored.status != TransactionStatus::Pending {
            return Ok(stored);
        }
        let mut batch = WriteBatch::default();
        self.put_transaction(&mut batch, &tx)?;
        self.db.write(batch)?;
        Ok(tx)
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        let mut all: Vec<Transaction> = self.read_all(CF_TRANSACTIONS)?;
        all.sort_by_key(|tx| (tx.membership, tx.created_at));
        Ok(all)
    }
}

/// Stages writes and hands them to RocksDB as a single `WriteBatch`.
pub struct RocksDBUnit {
    store: RocksDBStore,
    transactions: Vec<Transaction>,
    memberships: Vec<MembershipRequest>,
}

#[async_trait]
impl UnitOfWork for RocksDBUnit {
    async fn membership(&mut self, id: MembershipId) -> Result<Option<MembershipRequest>> {
        self.store.read(CF_MEMBERSHIPS, &id.0.to_be_bytes())
    }

    fn stage_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    fn stage_membership(&mut self, membership: MembershipRequest) {
        self.memberships.push(membership);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        for tx in &self.transactions {
            self.store.check_transition(tx)?;
            self.store.put_transaction(&mut batch, tx)?;
        }
        for membership in &self.memberships {
            self.store
                .put(&mut batch, CF_MEMBERSHIPS, &membership.id.0.to_be_bytes(), membership)?;
        }
        self.store.db.write(batch)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for RocksDBStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(RocksDBUnit {
            store: self.clone(),
            transactions: Vec::new(),
            memberships: Vec::new(),
        }))
    }
}
