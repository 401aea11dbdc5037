use super::hash::PaymentRequestHash;
use super::order::Order;
use super::payment_method::PaymentMethod;
use super::payment_request::PaymentRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence of payment requests, addressed by hash.
#[async_trait]
pub trait PaymentRequestStore: Send + Sync {
    /// Persists a brand new request together with its payment index entry, atomically.
    ///
    /// Fails without writing anything when the hash is already taken.
    async fn insert(&self, request: PaymentRequest) -> Result<()>;

    async fn find_by_hash(&self, hash: &PaymentRequestHash) -> Result<Option<PaymentRequest>>;

    /// All requests of a payment, oldest first.
    async fn find_by_payment(&self, payment_id: u64) -> Result<Vec<PaymentRequest>>;

    /// Replaces the stored request if its version still equals `expected_version`.
    ///
    /// On success the stored copy carries `expected_version + 1`, which is returned.
    /// A stale version yields `PaymentRequestError::Conflict`.
    async fn compare_and_swap(
        &self,
        request: PaymentRequest,
        expected_version: u64,
    ) -> Result<PaymentRequest>;
}

/// Read access to orders, looked up by their public token.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_token_value(&self, token_value: &str) -> Result<Option<Order>>;
}

/// Configured payment methods and their gateway capabilities.
#[async_trait]
pub trait PaymentMethodRegistry: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<PaymentMethod>>;
}

pub type PaymentRequestStoreRef = Arc<dyn PaymentRequestStore>;
pub type OrderRepositoryRef = Arc<dyn OrderRepository>;
pub type PaymentMethodRegistryRef = Arc<dyn PaymentMethodRegistry>;
