//! Shop API facade: the external contract of the payment request workflow,
//! expressed as status codes and JSON-LD flavoured bodies.
//!
//! This is the only place where errors become statuses. Transport (routing,
//! headers, content negotiation) is left to whoever embeds it.

use crate::application::command::{AddPaymentRequest, AfterPay, PayOrder, UpdatePaymentRequest};
use crate::application::pay::AfterPayResponse;
use crate::application::service::PaymentRequestService;
use crate::domain::payment_request::PaymentRequest;
use crate::error::{PaymentRequestError, Violation};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::error;

pub const API_PREFIX: &str = "/api/v2/shop";

pub const OK: u16 = 200;
pub const CREATED: u16 = 201;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const UNPROCESSABLE_ENTITY: u16 = 422;
pub const INTERNAL_SERVER_ERROR: u16 = 500;
pub const BAD_GATEWAY: u16 = 502;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Violations listed in an error body, as `(propertyPath, message)` pairs.
    pub fn violations(&self) -> Vec<(String, String)> {
        self.body["violations"]
            .as_array()
            .map(|violations| {
                violations
                    .iter()
                    .map(|v| {
                        (
                            v["propertyPath"].as_str().unwrap_or_default().to_string(),
                            v["message"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn payment_request_iri(hash: &str) -> String {
    format!("{API_PREFIX}/payment-requests/{hash}")
}

/// Public representation of a payment request. Storage details other than the version never leak.
pub fn represent(request: &PaymentRequest) -> Value {
    json!({
        "@context": "/api/v2/contexts/PaymentRequest",
        "@id": payment_request_iri(request.hash.as_str()),
        "@type": "PaymentRequest",
        "hash": request.hash.as_str(),
        "state": request.state,
        "action": request.action,
        "method": format!("{API_PREFIX}/payment-methods/{}", request.method_code),
        "payment": format!("{API_PREFIX}/payments/{}", request.payment_id),
        "payload": request.payload,
        "responseData": request.response_data,
        "version": request.version,
    })
}

fn represent_after_pay(response: &AfterPayResponse) -> Value {
    json!({
        "@type": "AfterPay",
        "paymentRequest": payment_request_iri(response.hash.as_str()),
        "hash": response.hash.as_str(),
        "state": response.state,
        "redirectTo": response.redirect_to,
    })
}

fn error_body(status: u16, title: &str, detail: String) -> ApiResponse {
    ApiResponse::new(
        status,
        json!({
            "@type": "Error",
            "title": title,
            "detail": detail,
            "status": status,
        }),
    )
}

fn violations_body(violations: &[Violation]) -> ApiResponse {
    let detail = violations
        .iter()
        .map(|v| match v.property_path.as_str() {
            "" => v.message.clone(),
            path => format!("{path}: {}", v.message),
        })
        .collect::<Vec<_>>()
        .join("\n");
    ApiResponse::new(
        UNPROCESSABLE_ENTITY,
        json!({
            "@type": "ConstraintViolationList",
            "title": "An error occurred",
            "detail": detail,
            "violations": violations,
            "status": UNPROCESSABLE_ENTITY,
        }),
    )
}

/// Maps a service error onto the external contract.
pub fn error_response(err: &PaymentRequestError) -> ApiResponse {
    match err {
        PaymentRequestError::NotFound { .. } => error_body(NOT_FOUND, "Not Found", err.to_string()),
        // A lost optimistic race reads as absence, like any request past state new.
        PaymentRequestError::Conflict { hash, .. } => error_body(
            NOT_FOUND,
            "Not Found",
            PaymentRequestError::not_found("Payment request", hash.as_str()).to_string(),
        ),
        PaymentRequestError::MalformedBody(_) | PaymentRequestError::MissingFields(_) => {
            error_body(BAD_REQUEST, "Bad Request", err.to_string())
        }
        PaymentRequestError::ValidationError(violations) => violations_body(violations),
        PaymentRequestError::NoHandlerAvailable { .. } | PaymentRequestError::NoPayResponseProvider { .. } => {
            violations_body(&[Violation::new("", err.to_string())])
        }
        PaymentRequestError::GatewayFailure(_) => error_body(BAD_GATEWAY, "Bad Gateway", err.to_string()),
        _ => {
            error!(error = %err, "unexpected failure");
            error_body(
                INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "An internal error occurred.".to_string(),
            )
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, PaymentRequestError> {
    serde_json::from_slice(body).map_err(|e| PaymentRequestError::MalformedBody(e.to_string()))
}

fn respond(status: u16, result: Result<PaymentRequest, PaymentRequestError>) -> ApiResponse {
    match result {
        Ok(request) => ApiResponse::new(status, represent(&request)),
        Err(e) => error_response(&e),
    }
}

#[derive(Clone)]
pub struct ShopApi {
    service: PaymentRequestService,
}

impl ShopApi {
    pub fn new(service: PaymentRequestService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &PaymentRequestService {
        &self.service
    }

    /// `GET /payment-requests/{hash}`
    pub async fn get_payment_request(&self, hash: &str) -> ApiResponse {
        respond(OK, self.service.find_by_hash(hash).await)
    }

    /// `POST /orders/{orderToken}/payment-requests`
    pub async fn post_payment_request(&self, order_token: &str, body: &[u8]) -> ApiResponse {
        let result = match parse_body::<AddPaymentRequest>(body) {
            Ok(command) => self.service.create(order_token, command).await,
            Err(e) => Err(e),
        };
        respond(CREATED, result)
    }

    /// `PUT /payment-requests/{hash}`
    pub async fn put_payment_request(&self, hash: &str, body: &[u8]) -> ApiResponse {
        let result = match parse_body::<UpdatePaymentRequest>(body) {
            Ok(command) => self.service.update(hash, command).await,
            Err(e) => Err(e),
        };
        respond(OK, result)
    }

    /// Runs the handler of a `new` request.
    pub async fn process_payment_request(&self, hash: &str) -> ApiResponse {
        respond(OK, self.service.process(hash).await)
    }

    /// `GET /order/{tokenValue}/pay`; an empty body is an empty payload.
    pub async fn pay_order(&self, order_token: &str, body: &[u8]) -> ApiResponse {
        let command = if body.trim_ascii().is_empty() {
            Ok(PayOrder::default())
        } else {
            parse_body::<PayOrder>(body)
        };
        let result = match command {
            Ok(command) => self.service.pay(order_token, command).await,
            Err(e) => Err(e),
        };
        respond(OK, result)
    }

    /// Return trip from a gateway, body `{"hash": ...}`.
    pub async fn after_pay(&self, order_token: &str, body: &[u8]) -> ApiResponse {
        let result = match parse_body::<AfterPay>(body) {
            Ok(command) => self.service.after_pay(order_token, &command.hash).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(response) => ApiResponse::new(OK, represent_after_pay(&response)),
            Err(e) => error_response(&e),
        }
    }

    /// Gateway callback endpoint.
    pub async fn notify(&self, gateway_name: &str, body: &[u8]) -> ApiResponse {
        let result = match parse_body::<Value>(body) {
            Ok(raw) => self.service.notify(gateway_name, &raw).await,
            Err(e) => Err(e),
        };
        respond(OK, result)
    }
}
