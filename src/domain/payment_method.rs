use super::payment_request::PaymentRequestAction;
use serde::{Deserialize, Deserializer, Serialize};

/// Factory name of gateways that settle outside of any payment service.
pub const OFFLINE_FACTORY: &str = "offline";

/// How a payment method talks to its gateway.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct GatewayConfig {
    pub gateway_name: String,
    pub factory_name: String,
    /// Gateways that consume payment requests directly; the others go through the legacy hand-off.
    pub uses_payment_requests: bool,
    #[serde(deserialize_with = "deserialize_actions")]
    pub supported_actions: Vec<PaymentRequestAction>,
}

impl GatewayConfig {
    pub fn is_offline(&self) -> bool {
        self.factory_name == OFFLINE_FACTORY
    }

    pub fn supports_action(&self, action: PaymentRequestAction) -> bool {
        self.supported_actions.contains(&action)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PaymentMethod {
    pub code: String,
    #[serde(flatten)]
    pub gateway: GatewayConfig,
}

/// Accepts either a sequence or a single `|`-separated string (as written in CSV catalogs).
fn deserialize_actions<'de, D>(deserializer: D) -> Result<Vec<PaymentRequestAction>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Actions {
        List(Vec<PaymentRequestAction>),
        Joined(String),
    }

    match Actions::deserialize(deserializer)? {
        Actions::List(actions) => Ok(actions),
        Actions::Joined(joined) => joined
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(serde::de::Error::custom))
            .collect(),
    }
}
