#![allow(dead_code)]

use payreq::application::gateway::GatewayRegistry;
use payreq::application::service::PaymentRequestService;
use payreq::config::AppConfig;
use payreq::domain::order::{Amount, Order, Payment};
use payreq::domain::payment_method::{GatewayConfig, PaymentMethod};
use payreq::domain::payment_request::PaymentRequestAction;
use payreq::infrastructure::gateways::{MockBehavior, MockGateway};
use payreq::infrastructure::in_memory::{
    InMemoryOrderRepository, InMemoryPaymentMethodRegistry, InMemoryPaymentRequestStore,
};
use payreq::interfaces::api::ShopApi;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;

pub const ORDER_TOKEN: &str = "nAWw2jewpA";
/// Paid through a gateway consuming payment requests.
pub const CARD_PAYMENT: u64 = 10;
/// Paid through a legacy (notification driven) gateway.
pub const PAYPAL_PAYMENT: u64 = 11;
pub const OFFLINE_PAYMENT: u64 = 12;

fn method(code: &str, gateway: &str, factory: &str, uses_payment_requests: bool, actions: &[PaymentRequestAction]) -> PaymentMethod {
    PaymentMethod {
        code: code.to_string(),
        gateway: GatewayConfig {
            gateway_name: gateway.to_string(),
            factory_name: factory.to_string(),
            uses_payment_requests,
            supported_actions: actions.to_vec(),
        },
    }
}

pub fn payment(id: u64, method_code: &str) -> Payment {
    Payment {
        id,
        order_id: 1,
        method_code: method_code.to_string(),
        amount: Amount::new(dec!(105.50)).unwrap(),
        currency_code: "USD".to_string(),
    }
}

pub async fn service(behavior: MockBehavior) -> PaymentRequestService {
    let methods = InMemoryPaymentMethodRegistry::new();
    methods
        .add(method(
            "CARD",
            "sandbox",
            "sandbox",
            true,
            &[PaymentRequestAction::Authorize, PaymentRequestAction::Capture, PaymentRequestAction::Notify],
        ))
        .await;
    methods
        .add(method("PAYPAL", "paypal", "paypal_express", false, &[]))
        .await;
    methods
        .add(method("CASH_ON_DELIVERY", "offline", "offline", false, &[PaymentRequestAction::Capture]))
        .await;

    let orders = InMemoryOrderRepository::new();
    let mut order = Order::new(1, ORDER_TOKEN);
    order.add_payment(payment(CARD_PAYMENT, "CARD"));
    order.add_payment(payment(PAYPAL_PAYMENT, "PAYPAL"));
    order.add_payment(payment(OFFLINE_PAYMENT, "CASH_ON_DELIVERY"));
    orders.add(order).await;

    let gateways = GatewayRegistry::new()
        .with(Arc::new(MockGateway::new("sandbox", behavior)))
        .with(Arc::new(MockGateway::new("paypal", MockBehavior::AlwaysPending)));

    PaymentRequestService::new(
        Arc::new(InMemoryPaymentRequestStore::new()),
        Arc::new(orders),
        Arc::new(methods),
        gateways,
        &AppConfig::default(),
    )
}

pub async fn api(behavior: MockBehavior) -> ShopApi {
    ShopApi::new(service(behavior).await)
}

pub fn target_payload() -> Value {
    json!({
        "target_path": "https://myshop.tld/target-path",
        "after_path": "https://myshop.tld/after-path",
    })
}

pub fn create_body(payment_id: u64, method_code: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "paymentId": payment_id,
        "paymentMethodCode": method_code,
        "payload": target_payload(),
    }))
    .unwrap()
}

/// Creates a request through the API and returns its hash.
pub async fn create(api: &ShopApi, payment_id: u64, method_code: &str) -> String {
    let response = api
        .post_payment_request(ORDER_TOKEN, &create_body(payment_id, method_code))
        .await;
    assert_eq!(response.status, 201, "{}", response.body);
    response.body["hash"].as_str().unwrap().to_string()
}
