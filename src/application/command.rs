use crate::domain::payment_request::Payload;
use serde::Deserialize;

/// Body of a "create payment request" call.
///
/// Every member is optional at the wire level so that missing ones can be
/// reported together instead of failing on the first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentRequest {
    pub payment_id: Option<u64>,
    pub payment_method_code: Option<String>,
    /// Defaults to `capture`.
    pub action: Option<String>,
    #[serde(default)]
    pub payload: Payload,
}

impl AddPaymentRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.payment_id.is_none() {
            missing.push("paymentId");
        }
        if self
            .payment_method_code
            .as_deref()
            .is_none_or(|code| code.trim().is_empty())
        {
            missing.push("paymentMethodCode");
        }
        missing
    }
}

/// Body of an "update payment request" call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    #[serde(default)]
    pub payload: Payload,
    /// Version the client last saw; when absent the version read at call time is used.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Body of a "pay order" call. The payload seeds a newly created request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PayOrder {
    #[serde(default)]
    pub payload: Payload,
}

/// Body of the return trip from a gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AfterPay {
    pub hash: String,
}
