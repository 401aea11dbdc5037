use crate::domain::hash::PaymentRequestHash;
use crate::domain::order::Order;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::payment_request::PaymentRequest;
use crate::domain::ports::{OrderRepository, PaymentMethodRegistry, PaymentRequestStore};
use crate::error::{PaymentRequestError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct RequestTables {
    by_hash: HashMap<PaymentRequestHash, PaymentRequest>,
    by_payment: HashMap<u64, Vec<PaymentRequestHash>>,
}

/// A thread-safe in-memory store for payment requests.
///
/// Both tables live behind one `RwLock`, so an insert lands in the hash table and
/// the payment index together, and readers never see half of it.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRequestStore {
    tables: Arc<RwLock<RequestTables>>,
}

impl InMemoryPaymentRequestStore {
    /// Creates a new, empty in-memory payment request store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRequestStore for InMemoryPaymentRequestStore {
    async fn insert(&self, request: PaymentRequest) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.by_hash.contains_key(&request.hash) {
            return Err(PaymentRequestError::Conflict {
                hash: request.hash.to_string(),
                expected: 0,
            });
        }
        tables
            .by_payment
            .entry(request.payment_id)
            .or_default()
            .push(request.hash.clone());
        tables.by_hash.insert(request.hash.clone(), request);
        Ok(())
    }

    async fn find_by_hash(&self, hash: &PaymentRequestHash) -> Result<Option<PaymentRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.by_hash.get(hash).cloned())
    }

    async fn find_by_payment(&self, payment_id: u64) -> Result<Vec<PaymentRequest>> {
        let tables = self.tables.read().await;
        let hashes = tables.by_payment.get(&payment_id).map(Vec::as_slice).unwrap_or_default();
        Ok(hashes
            .iter()
            .filter_map(|hash| tables.by_hash.get(hash).cloned())
            .collect())
    }

    async fn compare_and_swap(
        &self,
        mut request: PaymentRequest,
        expected_version: u64,
    ) -> Result<PaymentRequest> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .by_hash
            .get_mut(&request.hash)
            .ok_or_else(|| PaymentRequestError::not_found("Payment request", request.hash.as_str()))?;

        if stored.version != expected_version {
            return Err(PaymentRequestError::Conflict {
                hash: request.hash.to_string(),
                expected: expected_version,
            });
        }

        request.version = expected_version + 1;
        *stored = request.clone();
        Ok(request)
    }
}

/// Orders indexed by token value.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.insert(order.token_value.clone(), order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_token_value(&self, token_value: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(token_value).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentMethodRegistry {
    methods: Arc<RwLock<HashMap<String, PaymentMethod>>>,
}

impl InMemoryPaymentMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, method: PaymentMethod) {
        let mut methods = self.methods.write().await;
        methods.insert(method.code.clone(), method);
    }
}

#[async_trait]
impl PaymentMethodRegistry for InMemoryPaymentMethodRegistry {
    async fn find_by_code(&self, code: &str) -> Result<Option<PaymentMethod>> {
        let methods = self.methods.read().await;
        Ok(methods.get(code).cloned())
    }
}
