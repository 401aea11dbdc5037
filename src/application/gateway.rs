use super::handler::ResolutionContext;
use crate::domain::hash::PaymentRequestHash;
use crate::domain::payment_request::{Payload, PaymentRequest};
use crate::domain::state_machine::Transition;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOutcome {
    Completed,
    /// Accepted, final outcome arrives later through a notification.
    Pending,
    Failed,
}

impl GatewayOutcome {
    /// The state machine transition this outcome triggers, if any.
    pub fn transition(self) -> Option<Transition> {
        match self {
            Self::Completed => Some(Transition::Complete),
            Self::Failed => Some(Transition::Fail),
            Self::Pending => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub outcome: GatewayOutcome,
    pub data: Payload,
}

/// A gateway callback, already mapped back to the request it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub hash: PaymentRequestHash,
    pub outcome: GatewayOutcome,
    pub data: Payload,
}

/// Boundary to an external payment gateway. Protocol details stay behind this trait.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Starts the gateway interaction for `request`. `context` carries the channel
    /// and locale the shop resolved the handler under, plus the gateway config.
    async fn initiate(&self, context: &ResolutionContext, request: &PaymentRequest) -> Result<GatewayResponse>;

    fn handle_notification(&self, raw: &serde_json::Value) -> Result<Notification>;
}

/// Gateways known to the process, by gateway name.
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    adapters: HashMap<String, Arc<dyn GatewayAdapter>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn GatewayAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn GatewayAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, gateway_name: &str) -> Option<Arc<dyn GatewayAdapter>> {
        self.adapters.get(gateway_name).cloned()
    }
}
