//! Order-level chains of the shop checkout.
//!
//! The pay chain decides how the last payment of an order gets paid; the after
//! pay chain decides where the customer lands once the gateway hands them back.
//! Both resolve first-match over [`ProviderChain`], like the handler chain.

use super::handler::{Provider, ProviderChain, ResolutionContext};
use crate::domain::hash::PaymentRequestHash;
use crate::domain::order::Order;
use crate::domain::payment_method::GatewayConfig;
use crate::domain::payment_request::{PaymentRequest, PaymentRequestAction, PaymentRequestState};
use crate::error::{PaymentRequestError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// The payment request a pay call should create, or resume when one is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPlan {
    pub payment_id: u64,
    pub method_code: String,
    pub action: PaymentRequestAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayResponseProvider {
    /// Offline methods and gateways consuming payment requests.
    PaymentRequest,
    /// Gateways predating payment requests; always a capture.
    Legacy,
}

fn preferred_action(gateway: &GatewayConfig) -> Option<PaymentRequestAction> {
    [PaymentRequestAction::Capture, PaymentRequestAction::Authorize]
        .into_iter()
        .find(|action| gateway.supports_action(*action))
}

#[async_trait]
impl Provider<Order> for PayResponseProvider {
    type Output = PayPlan;

    fn supports(&self, context: &ResolutionContext, order: &Order) -> bool {
        let gateway = &context.gateway;
        order.last_payment().is_some()
            && match self {
                Self::PaymentRequest => {
                    gateway.is_offline()
                        || (gateway.uses_payment_requests && preferred_action(gateway).is_some())
                }
                Self::Legacy => !gateway.uses_payment_requests && !gateway.is_offline(),
            }
    }

    async fn get_response(&self, context: &ResolutionContext, order: &Order) -> Result<PayPlan> {
        let unsupported = || PaymentRequestError::NoPayResponseProvider { order_id: order.id };
        let payment = order.last_payment().ok_or_else(unsupported)?;
        let gateway = &context.gateway;

        let action = match self {
            Self::PaymentRequest if !gateway.is_offline() => {
                preferred_action(gateway).ok_or_else(unsupported)?
            }
            _ => PaymentRequestAction::Capture,
        };

        Ok(PayPlan {
            payment_id: payment.id,
            method_code: payment.method_code.clone(),
            action,
        })
    }
}

pub type PayChain = ProviderChain<PayResponseProvider>;

impl ProviderChain<PayResponseProvider> {
    pub fn with_default_providers() -> Self {
        Self::new(vec![PayResponseProvider::PaymentRequest, PayResponseProvider::Legacy])
    }
}

/// A customer returning from a gateway: the order they paid and the request they came back with.
#[derive(Debug, Clone, PartialEq)]
pub struct AfterPaySubject {
    pub order: Order,
    pub request: PaymentRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterPayResponse {
    pub hash: PaymentRequestHash,
    pub state: PaymentRequestState,
    pub redirect_to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPayResponseProvider {
    /// Completed or failed: continue at the request's `after_path`.
    Settled,
    /// Still `new` or `processing`: back to the request's `target_path`.
    InFlight,
}

/// The order summary page in the context locale.
pub fn order_path(context: &ResolutionContext, order: &Order) -> String {
    format!("/{}/order/{}", context.locale_code, order.token_value)
}

#[async_trait]
impl Provider<AfterPaySubject> for AfterPayResponseProvider {
    type Output = AfterPayResponse;

    fn supports(&self, _context: &ResolutionContext, subject: &AfterPaySubject) -> bool {
        let terminal = subject.request.state.is_terminal();
        match self {
            Self::Settled => terminal,
            Self::InFlight => !terminal,
        }
    }

    async fn get_response(
        &self,
        context: &ResolutionContext,
        subject: &AfterPaySubject,
    ) -> Result<AfterPayResponse> {
        let key = match self {
            Self::Settled => "after_path",
            Self::InFlight => "target_path",
        };
        let request = &subject.request;
        let redirect_to = request
            .payload
            .get(key)
            .and_then(|path| path.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| order_path(context, &subject.order));

        Ok(AfterPayResponse {
            hash: request.hash.clone(),
            state: request.state,
            redirect_to,
        })
    }
}

pub type AfterPayChain = ProviderChain<AfterPayResponseProvider>;

impl ProviderChain<AfterPayResponseProvider> {
    pub fn with_default_providers() -> Self {
        Self::new(vec![AfterPayResponseProvider::Settled, AfterPayResponseProvider::InFlight])
    }
}
