use crate::domain::hash::PaymentRequestHash;
use crate::domain::payment_request::PaymentRequest;
use crate::domain::ports::PaymentRequestStore;
use crate::error::{PaymentRequestError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding payment requests keyed by hash.
pub const CF_PAYMENT_REQUESTS: &str = "payment_requests";
/// Column Family mapping a payment id to the hashes of its requests, oldest first.
pub const CF_PAYMENT_INDEX: &str = "payment_index";

/// A persistent payment request store using RocksDB.
///
/// Every mutation goes through one `WriteBatch`, so a record and its index entry
/// are committed together. Writers are serialized by an async mutex, which makes
/// the version check of `compare_and_swap` and the write a single step.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_requests = ColumnFamilyDescriptor::new(CF_PAYMENT_REQUESTS, Options::default());
        let cf_index = ColumnFamilyDescriptor::new(CF_PAYMENT_INDEX, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_requests, cf_index])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentRequestError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read_request(&self, hash: &PaymentRequestHash) -> Result<Option<PaymentRequest>> {
        let cf = self.cf(CF_PAYMENT_REQUESTS)?;
        match self.db.get_pinned_cf(cf, hash.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_index(&self, payment_id: u64) -> Result<Vec<PaymentRequestHash>> {
        let cf = self.cf(CF_PAYMENT_INDEX)?;
        match self.db.get_pinned_cf(cf, payment_id.to_be_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl PaymentRequestStore for RocksDBStore {
    async fn insert(&self, request: PaymentRequest) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.read_request(&request.hash)?.is_some() {
            return Err(PaymentRequestError::Conflict {
                hash: request.hash.to_string(),
                expected: 0,
            });
        }

        let mut index = self.read_index(request.payment_id)?;
        index.push(request.hash.clone());

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_PAYMENT_REQUESTS)?,
            request.hash.as_str().as_bytes(),
            serde_json::to_vec(&request)?,
        );
        batch.put_cf(
            self.cf(CF_PAYMENT_INDEX)?,
            request.payment_id.to_be_bytes(),
            serde_json::to_vec(&index)?,
        );
        self.db.write(batch)?;

        Ok(())
    }

    async fn find_by_hash(&self, hash: &PaymentRequestHash) -> Result<Option<PaymentRequest>> {
        self.read_request(hash)
    }

    async fn find_by_payment(&self, payment_id: u64) -> Result<Vec<PaymentRequest>> {
        let mut requests = Vec::new();
        for hash in self.read_index(payment_id)? {
            if let Some(request) = self.read_request(&hash)? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    async fn compare_and_swap(
        &self,
        mut request: PaymentRequest,
        expected_version: u64,
    ) -> Result<PaymentRequest> {
        let _guard = self.write_lock.lock().await;

        let stored = self
            .read_request(&request.hash)?
            .ok_or_else(|| PaymentRequestError::not_found("Payment request", request.hash.as_str()))?;
        if stored.version != expected_version {
            return Err(PaymentRequestError::Conflict {
                hash: request.hash.to_string(),
                expected: expected_version,
            });
        }

        request.version = expected_version + 1;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_PAYMENT_REQUESTS)?,
            request.hash.as_str().as_bytes(),
            serde_json::to_vec(&request)?,
        );
        self.db.write(batch)?;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment_request::{Payload, PaymentRequestAction, PaymentRequestState};
    use tempfile::tempdir;

    fn request(payment_id: u64) -> PaymentRequest {
        PaymentRequest::new(payment_id, "CARD", PaymentRequestAction::Capture, Payload::new())
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_PAYMENT_REQUESTS).is_some());
        assert!(store.db.cf_handle(CF_PAYMENT_INDEX).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_insert_and_index() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let first = request(1);
        let second = request(1);

        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();

        assert_eq!(store.find_by_hash(&first.hash).await.unwrap(), Some(first.clone()));
        assert_eq!(store.find_by_payment(1).await.unwrap(), vec![first.clone(), second]);
        assert!(store.find_by_payment(2).await.unwrap().is_empty());

        let duplicate = store.insert(first).await;
        assert!(matches!(duplicate, Err(PaymentRequestError::Conflict { .. })));
        assert_eq!(store.find_by_payment(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rocksdb_compare_and_swap() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let request = request(1);
        store.insert(request.clone()).await.unwrap();

        let mut processing = request.clone();
        processing.state = PaymentRequestState::Processing;
        let saved = store.compare_and_swap(processing, 1).await.unwrap();
        assert_eq!(saved.version, 2);

        let stale = store.compare_and_swap(request.clone(), 1).await;
        assert!(matches!(stale, Err(PaymentRequestError::Conflict { .. })));
        assert_eq!(
            store.find_by_hash(&request.hash).await.unwrap().map(|r| r.state),
            Some(PaymentRequestState::Processing)
        );
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let request = request(9);
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.insert(request.clone()).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(store.find_by_hash(&request.hash).await.unwrap(), Some(request));
    }
}
