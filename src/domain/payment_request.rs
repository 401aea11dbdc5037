use super::hash::PaymentRequestHash;
use super::state_machine::{self, Transition};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form data attached to a request by the client (`target_path`, `after_path`, ...).
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRequestState {
    #[default]
    New,
    Processing,
    Completed,
    Failed,
}

impl PaymentRequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRequestAction {
    Authorize,
    #[default]
    Capture,
    Notify,
}

impl PaymentRequestAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Capture => "capture",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for PaymentRequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment request action \"{0}\"")]
pub struct UnknownAction(pub String);

impl FromStr for PaymentRequestAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "authorize" => Ok(Self::Authorize),
            "capture" => Ok(Self::Capture),
            "notify" => Ok(Self::Notify),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// A single interaction requested against one payment of an order.
///
/// The `hash` is the only identifier ever exposed to clients. `version` is the
/// optimistic concurrency token: stores bump it on every accepted write.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub hash: PaymentRequestHash,
    pub state: PaymentRequestState,
    pub action: PaymentRequestAction,
    pub payment_id: u64,
    pub method_code: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub response_data: Payload,
    pub version: u64,
}

impl PaymentRequest {
    pub fn new(
        payment_id: u64,
        method_code: impl Into<String>,
        action: PaymentRequestAction,
        payload: Payload,
    ) -> Self {
        Self {
            hash: PaymentRequestHash::generate(),
            state: PaymentRequestState::New,
            action,
            payment_id,
            method_code: method_code.into(),
            payload,
            response_data: Payload::new(),
            version: 1,
        }
    }

    /// Whether clients may still replace the payload.
    pub fn is_mutable(&self) -> bool {
        self.state == PaymentRequestState::New
    }

    /// Applies a state transition, returning `false` when it was an idempotent re-application.
    pub fn apply(&mut self, transition: Transition) -> Result<bool> {
        let next = state_machine::apply(self.state, transition)?;
        if next == self.state {
            return Ok(false);
        }
        self.state = next;
        Ok(true)
    }

    /// Merges gateway-provided data into `response_data`.
    pub fn record_response(&mut self, data: Payload) {
        self.response_data.extend(data);
    }
}
