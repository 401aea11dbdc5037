//! First-match resolution of the handler that acts on a payment request.
//!
//! Providers are kept in registration order and asked, one by one, whether they
//! support the subject. The first one that does wins; no scoring is involved.

use super::gateway::{GatewayAdapter, GatewayOutcome, GatewayRegistry, GatewayResponse};
use crate::domain::payment_method::GatewayConfig;
use crate::domain::payment_request::{Payload, PaymentRequest, PaymentRequestAction};
use crate::error::{PaymentRequestError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Everything a provider may look at besides the subject itself.
///
/// Channel and locale are also handed on to gateway adapters and used to build
/// shop URLs on the way back from a gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionContext {
    pub channel_code: String,
    pub locale_code: String,
    pub gateway: GatewayConfig,
}

/// Two-method capability interface shared by every provider in a chain.
#[async_trait]
pub trait Provider<S: Sync + ?Sized>: Send + Sync {
    type Output: Send;

    fn supports(&self, context: &ResolutionContext, subject: &S) -> bool;

    async fn get_response(&self, context: &ResolutionContext, subject: &S) -> Result<Self::Output>;
}

/// Ordered providers; see [`ProviderChain::resolve`].
#[derive(Debug, Clone)]
pub struct ProviderChain<P> {
    providers: Vec<P>,
}

impl<P> ProviderChain<P> {
    pub fn new(providers: Vec<P>) -> Self {
        Self { providers }
    }

    /// Returns the first registered provider supporting `subject`.
    pub fn resolve<S>(&self, context: &ResolutionContext, subject: &S) -> Option<&P>
    where
        S: Sync + ?Sized,
        P: Provider<S>,
    {
        self.providers.iter().find(|p| p.supports(context, subject))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// The ways a payment request can be carried out.
#[derive(Clone)]
pub enum PaymentRequestHandler {
    /// Offline methods (cash on delivery, bank transfer) settle immediately.
    Offline,
    /// Gateways that consume payment requests and list the requested action.
    GatewayCommand(GatewayRegistry),
    /// Gateways predating payment requests: authorize/capture hand-off, outcome by notification.
    Legacy(GatewayRegistry),
}

impl PaymentRequestHandler {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::GatewayCommand(_) => "gateway_command",
            Self::Legacy(_) => "legacy",
        }
    }
}

impl std::fmt::Debug for PaymentRequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn adapter_for(gateways: &GatewayRegistry, config: &GatewayConfig) -> Result<Arc<dyn GatewayAdapter>> {
    gateways.get(&config.gateway_name).ok_or_else(|| {
        PaymentRequestError::GatewayFailure(format!(
            "gateway \"{}\" is not registered",
            config.gateway_name
        ))
    })
}

#[async_trait]
impl Provider<PaymentRequest> for PaymentRequestHandler {
    type Output = GatewayResponse;

    fn supports(&self, context: &ResolutionContext, request: &PaymentRequest) -> bool {
        let gateway = &context.gateway;
        match self {
            Self::Offline => {
                gateway.is_offline()
                    && matches!(
                        request.action,
                        PaymentRequestAction::Authorize | PaymentRequestAction::Capture
                    )
            }
            Self::GatewayCommand(_) => {
                gateway.uses_payment_requests && gateway.supports_action(request.action)
            }
            Self::Legacy(_) => {
                !gateway.uses_payment_requests
                    && !gateway.is_offline()
                    && matches!(
                        request.action,
                        PaymentRequestAction::Authorize | PaymentRequestAction::Capture
                    )
            }
        }
    }

    async fn get_response(
        &self,
        context: &ResolutionContext,
        request: &PaymentRequest,
    ) -> Result<GatewayResponse> {
        match self {
            Self::Offline => {
                let mut data = Payload::new();
                data.insert("offline".into(), json!(true));
                Ok(GatewayResponse {
                    outcome: GatewayOutcome::Completed,
                    data,
                })
            }
            Self::GatewayCommand(gateways) => {
                adapter_for(gateways, &context.gateway)?
                    .initiate(context, request)
                    .await
            }
            Self::Legacy(gateways) => {
                let mut response = adapter_for(gateways, &context.gateway)?
                    .initiate(context, request)
                    .await?;
                if let Some(after_path) = request.payload.get("after_path") {
                    response.data.insert("after_url".into(), after_path.clone());
                }
                Ok(response)
            }
        }
    }
}

pub type HandlerChain = ProviderChain<PaymentRequestHandler>;

impl ProviderChain<PaymentRequestHandler> {
    /// The chain installed at startup: offline first, then payment-request gateways, then legacy.
    pub fn with_default_handlers(gateways: GatewayRegistry) -> Self {
        Self::new(vec![
            PaymentRequestHandler::Offline,
            PaymentRequestHandler::GatewayCommand(gateways.clone()),
            PaymentRequestHandler::Legacy(gateways),
        ])
    }

    /// Like [`ProviderChain::resolve`], but an exhausted chain is an error naming the request.
    pub fn resolve_handler(
        &self,
        context: &ResolutionContext,
        request: &PaymentRequest,
    ) -> Result<&PaymentRequestHandler> {
        self.resolve(context, request)
            .ok_or_else(|| PaymentRequestError::NoHandlerAvailable {
                method_code: request.method_code.clone(),
                payment_id: request.payment_id,
            })
    }
}
