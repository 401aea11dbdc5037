use super::command::{AddPaymentRequest, PayOrder, UpdatePaymentRequest};
use super::gateway::{GatewayOutcome, GatewayRegistry};
use super::handler::{HandlerChain, Provider, ResolutionContext};
use super::pay::{AfterPayChain, AfterPayResponse, AfterPaySubject, PayChain};
use crate::config::AppConfig;
use crate::domain::hash::PaymentRequestHash;
use crate::domain::order::Order;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::payment_request::{Payload, PaymentRequest, PaymentRequestAction, PaymentRequestState};
use crate::domain::ports::{OrderRepositoryRef, PaymentMethodRegistryRef, PaymentRequestStoreRef};
use crate::domain::state_machine::Transition;
use crate::error::{PaymentRequestError, Result, Violation};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PAYMENT_REQUEST: &str = "Payment request";

/// Entry point for every payment request operation.
///
/// Holds no per-request state: each call reads what it needs from the ports and
/// writes back through optimistic compare-and-swap, so calls may run concurrently.
#[derive(Clone)]
pub struct PaymentRequestService {
    pub store: PaymentRequestStoreRef,
    pub orders: OrderRepositoryRef,
    pub methods: PaymentMethodRegistryRef,
    pub gateways: GatewayRegistry,
    pub handlers: Arc<HandlerChain>,
    pub pay_providers: Arc<PayChain>,
    pub after_pay_providers: Arc<AfterPayChain>,
    pub channel_code: String,
    pub locale_code: String,
}

impl PaymentRequestService {
    /// Wires the service with the default handler chain built over `gateways` and
    /// the default pay and after pay chains.
    pub fn new(
        store: PaymentRequestStoreRef,
        orders: OrderRepositoryRef,
        methods: PaymentMethodRegistryRef,
        gateways: GatewayRegistry,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            orders,
            methods,
            handlers: Arc::new(HandlerChain::with_default_handlers(gateways.clone())),
            pay_providers: Arc::new(PayChain::with_default_providers()),
            after_pay_providers: Arc::new(AfterPayChain::with_default_providers()),
            gateways,
            channel_code: config.channel_code.clone(),
            locale_code: config.locale_code.clone(),
        }
    }

    fn context(&self, method: &PaymentMethod) -> ResolutionContext {
        ResolutionContext {
            channel_code: self.channel_code.clone(),
            locale_code: self.locale_code.clone(),
            gateway: method.gateway.clone(),
        }
    }

    async fn method(&self, code: &str) -> Result<Option<PaymentMethod>> {
        self.methods.find_by_code(code).await
    }

    /// Creates a request in state `new` for one payment of the order behind `order_token`.
    pub async fn create(&self, order_token: &str, command: AddPaymentRequest) -> Result<PaymentRequest> {
        let missing = command.missing_fields();
        let (true, Some(payment_id), Some(method_code)) = (
            missing.is_empty(),
            command.payment_id,
            command.payment_method_code.clone(),
        ) else {
            return Err(PaymentRequestError::MissingFields(missing));
        };

        let order = self.order(order_token).await?;

        if order.payment(payment_id).is_none() {
            return Err(PaymentRequestError::ValidationError(vec![Violation::new(
                "paymentId",
                format!("The payment with id {payment_id} does not belong to this order."),
            )]));
        }

        let method = self.method(&method_code).await?.ok_or_else(|| {
            PaymentRequestError::ValidationError(vec![Violation::new(
                "paymentMethodCode",
                format!("The payment method with code \"{method_code}\" does not exist."),
            )])
        })?;

        let no_handler = || PaymentRequestError::NoHandlerAvailable {
            method_code: method_code.clone(),
            payment_id,
        };
        let action = match command.action.as_deref() {
            None => PaymentRequestAction::default(),
            Some(action) => action.parse().map_err(|_| no_handler())?,
        };

        let request = PaymentRequest::new(payment_id, method.code.clone(), action, command.payload);
        let context = self.context(&method);
        let handler = self.handlers.resolve_handler(&context, &request)?;
        debug!(hash = %request.hash, handler = handler.name(), "payment request handler resolved");

        let request = match self.store.insert(request.clone()).await {
            Err(PaymentRequestError::Conflict { .. }) => {
                // Hash collision: draw a fresh one, once.
                let retry = PaymentRequest {
                    hash: PaymentRequestHash::generate(),
                    ..request
                };
                self.store.insert(retry.clone()).await?;
                retry
            }
            Err(e) => return Err(e),
            Ok(()) => request,
        };

        info!(
            hash = %request.hash,
            order = order.id,
            payment_id,
            method = %request.method_code,
            action = %request.action,
            "payment request created"
        );
        Ok(request)
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<PaymentRequest> {
        let not_found = || PaymentRequestError::not_found(PAYMENT_REQUEST, hash);
        let parsed: PaymentRequestHash = hash.parse().map_err(|_| not_found())?;
        self.store.find_by_hash(&parsed).await?.ok_or_else(not_found)
    }

    /// Requests of one payment, oldest first.
    pub async fn find_by_payment(&self, payment_id: u64) -> Result<Vec<PaymentRequest>> {
        self.store.find_by_payment(payment_id).await
    }

    /// Replaces the payload of a request that is still `new`.
    ///
    /// A request in any other state, or one that lost a concurrent update, is
    /// reported exactly like an unknown hash. Of several updates made against the
    /// same version only the first to land succeeds, whatever their payloads.
    pub async fn update(&self, hash: &str, command: UpdatePaymentRequest) -> Result<PaymentRequest> {
        let current = self.find_by_hash(hash).await?;
        if !current.is_mutable() {
            debug!(hash, state = %current.state, "update refused outside of state new");
            return Err(PaymentRequestError::not_found(PAYMENT_REQUEST, hash));
        }

        let expected_version = command.expected_version.unwrap_or(current.version);
        let mut updated = current;
        updated.payload = command.payload;

        match self.store.compare_and_swap(updated, expected_version).await {
            Ok(saved) => {
                info!(hash, version = saved.version, "payment request updated");
                Ok(saved)
            }
            Err(PaymentRequestError::Conflict { .. }) => {
                warn!(hash, expected_version, "update lost a concurrent write");
                Err(PaymentRequestError::not_found(PAYMENT_REQUEST, hash))
            }
            Err(e) => Err(e),
        }
    }

    /// Hands a `new` request to its handler and records the outcome.
    ///
    /// Requests past `new` are returned unchanged. Gateway errors end in state
    /// `failed` with the message under `response_data.error`.
    pub async fn process(&self, hash: &str) -> Result<PaymentRequest> {
        let request = self.find_by_hash(hash).await?;
        if request.state != PaymentRequestState::New {
            return Ok(request);
        }

        let method = self
            .method(&request.method_code)
            .await?
            .ok_or_else(|| PaymentRequestError::not_found("Payment method", &request.method_code))?;
        let context = self.context(&method);
        let handler = self.handlers.resolve_handler(&context, &request)?;

        let version = request.version;
        let mut processing = request;
        processing.apply(Transition::Process)?;
        let processing = match self.store.compare_and_swap(processing, version).await {
            Ok(saved) => saved,
            // Someone else got there first.
            Err(PaymentRequestError::Conflict { .. }) => return self.find_by_hash(hash).await,
            Err(e) => return Err(e),
        };
        info!(hash, handler = handler.name(), "payment request processing");

        let mut finished = processing.clone();
        match handler.get_response(&context, &processing).await {
            Ok(response) => {
                finished.record_response(response.data);
                if let Some(transition) = response.outcome.transition() {
                    finished.apply(transition)?;
                }
            }
            Err(e) => {
                warn!(hash, error = %e, "gateway interaction failed");
                let mut data = Payload::new();
                data.insert("error".into(), json!(e.to_string()));
                finished.record_response(data);
                finished.apply(Transition::Fail)?;
            }
        }

        match self.store.compare_and_swap(finished, processing.version).await {
            Ok(saved) => {
                info!(hash, state = %saved.state, "payment request handled");
                Ok(saved)
            }
            // A notification settled the request meanwhile; it wins.
            Err(PaymentRequestError::Conflict { .. }) => self.find_by_hash(hash).await,
            Err(e) => Err(e),
        }
    }

    async fn order(&self, order_token: &str) -> Result<Order> {
        self.orders
            .find_by_token_value(order_token)
            .await?
            .ok_or_else(|| PaymentRequestError::not_found("Order", order_token))
    }

    /// Pays the last payment of an order through the first supporting pay provider.
    ///
    /// An open (`new`) request for the same payment, method and action is resumed
    /// instead of creating another one; its payload is left as is.
    pub async fn pay(&self, order_token: &str, command: PayOrder) -> Result<PaymentRequest> {
        let order = self.order(order_token).await?;
        let no_provider = || PaymentRequestError::NoPayResponseProvider { order_id: order.id };

        let payment = order.last_payment().ok_or_else(no_provider)?;
        let method = self.method(&payment.method_code).await?.ok_or_else(no_provider)?;
        let context = self.context(&method);
        let provider = self.pay_providers.resolve(&context, &order).ok_or_else(no_provider)?;
        let plan = provider.get_response(&context, &order).await?;
        debug!(order = order.id, ?provider, ?plan, "pay response provider resolved");

        let open = self
            .store
            .find_by_payment(plan.payment_id)
            .await?
            .into_iter()
            .rev()
            .find(|r| r.is_mutable() && r.action == plan.action && r.method_code == plan.method_code);

        let request = match open {
            Some(request) => {
                info!(hash = %request.hash, order = order.id, "resuming open payment request");
                request
            }
            None => {
                let command = AddPaymentRequest {
                    payment_id: Some(plan.payment_id),
                    payment_method_code: Some(plan.method_code),
                    action: Some(plan.action.as_str().to_string()),
                    payload: command.payload,
                };
                self.create(order_token, command).await?
            }
        };

        self.process(request.hash.as_str()).await
    }

    /// Decides where a customer returning from a gateway goes next.
    ///
    /// A request that does not belong to the order is reported like an unknown hash.
    pub async fn after_pay(&self, order_token: &str, hash: &str) -> Result<AfterPayResponse> {
        let order = self.order(order_token).await?;
        let request = self.find_by_hash(hash).await?;
        if order.payment(request.payment_id).is_none() {
            return Err(PaymentRequestError::not_found(PAYMENT_REQUEST, hash));
        }

        let method = self
            .method(&request.method_code)
            .await?
            .ok_or_else(|| PaymentRequestError::not_found("Payment method", &request.method_code))?;
        let context = self.context(&method);
        let subject = AfterPaySubject { order, request };
        let provider = self
            .after_pay_providers
            .resolve(&context, &subject)
            .ok_or(PaymentRequestError::NoAfterPayResponseProvider)?;

        provider.get_response(&context, &subject).await
    }

    /// Applies a gateway callback. Replaying the outcome a request already has is a no-op.
    ///
    /// A callback for a request that is not `processing`, other than such a replay,
    /// is reported exactly like an unknown hash.
    pub async fn notify(&self, gateway_name: &str, raw: &serde_json::Value) -> Result<PaymentRequest> {
        let adapter = self
            .gateways
            .get(gateway_name)
            .ok_or_else(|| PaymentRequestError::not_found("Gateway", gateway_name))?;
        let notification = adapter.handle_notification(raw)?;
        let hash = notification.hash.to_string();

        self.apply_outcome(&hash, notification.outcome, notification.data)
            .await
    }

    async fn apply_outcome(
        &self,
        hash: &str,
        outcome: GatewayOutcome,
        data: Payload,
    ) -> Result<PaymentRequest> {
        let Some(transition) = outcome.transition() else {
            return self.find_by_hash(hash).await;
        };

        for _ in 0..2 {
            let current = self.find_by_hash(hash).await?;
            let version = current.version;
            let mut next = current.clone();
            let changed = match next.apply(transition) {
                Ok(changed) => changed,
                // Unprocessed or settled the other way: answer like an unknown hash.
                Err(PaymentRequestError::InvalidTransition { from, .. }) => {
                    debug!(hash, state = %from, ?transition, "notification does not apply");
                    return Err(PaymentRequestError::not_found(PAYMENT_REQUEST, hash));
                }
                Err(e) => return Err(e),
            };
            if !changed {
                debug!(hash, state = %current.state, "duplicate notification ignored");
                return Ok(current);
            }
            next.record_response(data.clone());

            match self.store.compare_and_swap(next, version).await {
                Ok(saved) => {
                    info!(hash, state = %saved.state, "payment request settled by notification");
                    return Ok(saved);
                }
                Err(PaymentRequestError::Conflict { .. }) => {
                    warn!(hash, "notification raced with another write, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PaymentRequestError::not_found(PAYMENT_REQUEST, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Amount, Order, Payment};
    use crate::domain::payment_method::GatewayConfig;
    use crate::infrastructure::gateways::{MockBehavior, MockGateway};
    use crate::infrastructure::in_memory::{
        InMemoryOrderRepository, InMemoryPaymentMethodRegistry, InMemoryPaymentRequestStore,
    };
    use rust_decimal_macros::dec;

    async fn service(behavior: MockBehavior) -> PaymentRequestService {
        let orders = InMemoryOrderRepository::new();
        let mut order = Order::new(1, "nAWw2jewpA");
        order.add_payment(Payment {
            id: 10,
            order_id: 1,
            method_code: "CARD".into(),
            amount: Amount::new(dec!(42.00)).unwrap(),
            currency_code: "USD".into(),
        });
        orders.add(order).await;

        let methods = InMemoryPaymentMethodRegistry::new();
        methods
            .add(PaymentMethod {
                code: "CARD".into(),
                gateway: GatewayConfig {
                    gateway_name: "sandbox".into(),
                    factory_name: "sandbox".into(),
                    uses_payment_requests: true,
                    supported_actions: vec![PaymentRequestAction::Capture, PaymentRequestAction::Authorize],
                },
            })
            .await;

        let gateways = GatewayRegistry::new().with(Arc::new(MockGateway::new("sandbox", behavior)));
        PaymentRequestService::new(
            Arc::new(InMemoryPaymentRequestStore::new()),
            Arc::new(orders),
            Arc::new(methods),
            gateways,
            &AppConfig::default(),
        )
    }

    fn command(action: Option<&str>) -> AddPaymentRequest {
        AddPaymentRequest {
            payment_id: Some(10),
            payment_method_code: Some("CARD".into()),
            action: action.map(str::to_string),
            payload: Payload::new(),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_capture() {
        let service = service(MockBehavior::AlwaysSuccess).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();

        assert_eq!(request.action, PaymentRequestAction::Capture);
        assert_eq!(request.state, PaymentRequestState::New);
        assert_eq!(service.find_by_hash(request.hash.as_str()).await.unwrap(), request);
        assert_eq!(service.find_by_payment(10).await.unwrap(), vec![request]);
    }

    #[tokio::test]
    async fn test_create_rejects_unsupported_action() {
        let service = service(MockBehavior::AlwaysSuccess).await;

        for action in ["notify", "invalid_action"] {
            let result = service.create("nAWw2jewpA", command(Some(action))).await;
            assert!(matches!(
                result,
                Err(PaymentRequestError::NoHandlerAvailable { payment_id: 10, .. })
            ));
        }
        assert!(service.find_by_payment(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_checks_payment_and_method() {
        let service = service(MockBehavior::AlwaysSuccess).await;

        let mut foreign = command(None);
        foreign.payment_id = Some(99);
        let result = service.create("nAWw2jewpA", foreign).await;
        assert!(matches!(result, Err(PaymentRequestError::ValidationError(ref v)) if v[0].property_path == "paymentId"));

        let mut unknown = command(None);
        unknown.payment_method_code = Some("BITCOIN".into());
        let result = service.create("nAWw2jewpA", unknown).await;
        assert!(matches!(result, Err(PaymentRequestError::ValidationError(ref v)) if v[0].property_path == "paymentMethodCode"));
    }

    #[tokio::test]
    async fn test_process_completes_on_success() {
        let service = service(MockBehavior::AlwaysSuccess).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();

        let processed = service.process(request.hash.as_str()).await.unwrap();
        assert_eq!(processed.state, PaymentRequestState::Completed);
        assert!(processed.response_data.contains_key("transaction_id"));
        assert_eq!(processed.version, 3);

        // Processing again is a no-op.
        let again = service.process(request.hash.as_str()).await.unwrap();
        assert_eq!(again, processed);
    }

    #[tokio::test]
    async fn test_process_records_gateway_errors_as_failed() {
        let service = service(MockBehavior::Unreachable).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();

        let processed = service.process(request.hash.as_str()).await.unwrap();
        assert_eq!(processed.state, PaymentRequestState::Failed);
        assert!(processed.response_data["error"].as_str().unwrap().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_update_after_processing_is_not_found() {
        let service = service(MockBehavior::AlwaysPending).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();
        let processed = service.process(request.hash.as_str()).await.unwrap();
        assert_eq!(processed.state, PaymentRequestState::Processing);

        let result = service
            .update(request.hash.as_str(), UpdatePaymentRequest::default())
            .await;
        assert!(matches!(result, Err(PaymentRequestError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resubmitting_a_stale_update_is_not_found() {
        let service = service(MockBehavior::AlwaysSuccess).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();

        let mut payload = Payload::new();
        payload.insert("after_path".into(), json!("https://myshop.tld/after"));
        let update = UpdatePaymentRequest {
            payload,
            expected_version: Some(1),
        };

        let first = service.update(request.hash.as_str(), update.clone()).await.unwrap();
        assert_eq!(first.version, 2);

        // Same payload, same stale version: the second write lost the race.
        let second = service.update(request.hash.as_str(), update).await;
        assert!(matches!(second, Err(PaymentRequestError::NotFound { .. })));
        assert_eq!(service.find_by_hash(request.hash.as_str()).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_notification_for_unprocessed_request_is_not_found() {
        let service = service(MockBehavior::AlwaysPending).await;
        let request = service.create("nAWw2jewpA", command(None)).await.unwrap();

        for status in ["completed", "failed"] {
            let raw = json!({"hash": request.hash.as_str(), "status": status});
            let result = service.notify("sandbox", &raw).await;
            assert!(matches!(result, Err(PaymentRequestError::NotFound { .. })), "{status}");
        }
        let stored = service.find_by_hash(request.hash.as_str()).await.unwrap();
        assert_eq!(stored.state, PaymentRequestState::New);
        assert_eq!(stored.version, 1);
    }
}
