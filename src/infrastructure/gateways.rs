use crate::application::gateway::{GatewayAdapter, GatewayOutcome, GatewayResponse, Notification};
use crate::application::handler::ResolutionContext;
use crate::domain::hash::PaymentRequestHash;
use crate::domain::payment_request::{Payload, PaymentRequest};
use crate::error::{PaymentRequestError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::str::FromStr;

/// How a [`MockGateway`] answers `initiate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum MockBehavior {
    #[default]
    AlwaysSuccess,
    AlwaysPending,
    AlwaysFailure,
    /// The gateway cannot be reached at all.
    Unreachable,
}

/// Sandbox gateway answering with a fixed behavior.
///
/// Notifications are JSON objects `{"hash": ..., "status": "completed" | "failed"}`;
/// any other member is passed through as response data.
pub struct MockGateway {
    pub gateway_name: String,
    pub behavior: MockBehavior,
}

impl MockGateway {
    pub fn new(gateway_name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            behavior,
        }
    }
}

#[async_trait]
impl GatewayAdapter for MockGateway {
    fn name(&self) -> &str {
        &self.gateway_name
    }

    async fn initiate(&self, context: &ResolutionContext, request: &PaymentRequest) -> Result<GatewayResponse> {
        let mut data = Payload::new();
        data.insert("channel_code".into(), json!(context.channel_code));
        let outcome = match self.behavior {
            MockBehavior::AlwaysSuccess => {
                data.insert(
                    "transaction_id".into(),
                    json!(format!("mock_txn_{}", &request.hash.as_str()[..12])),
                );
                GatewayOutcome::Completed
            }
            MockBehavior::AlwaysPending => {
                data.insert("status".into(), json!("awaiting_notification"));
                GatewayOutcome::Pending
            }
            MockBehavior::AlwaysFailure => {
                data.insert("error_code".into(), json!("MOCK_DECLINED"));
                data.insert("error_message".into(), json!("mock decline"));
                GatewayOutcome::Failed
            }
            MockBehavior::Unreachable => {
                return Err(PaymentRequestError::GatewayFailure(format!(
                    "{} did not answer",
                    self.gateway_name
                )));
            }
        };
        Ok(GatewayResponse { outcome, data })
    }

    fn handle_notification(&self, raw: &serde_json::Value) -> Result<Notification> {
        let mut data = raw
            .as_object()
            .cloned()
            .ok_or_else(|| PaymentRequestError::MalformedBody("notification must be an object".into()))?;

        let hash = data
            .remove("hash")
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| PaymentRequestError::MalformedBody("notification has no hash".into()))?;
        let hash = PaymentRequestHash::from_str(&hash)
            .map_err(|e| PaymentRequestError::MalformedBody(e.to_string()))?;

        let outcome = match data.remove("status").as_ref().and_then(|v| v.as_str()) {
            Some("completed") => GatewayOutcome::Completed,
            Some("failed") => GatewayOutcome::Failed,
            other => {
                return Err(PaymentRequestError::MalformedBody(format!(
                    "unsupported notification status {other:?}"
                )));
            }
        };

        Ok(Notification {
            hash,
            outcome,
            data,
        })
    }
}
