use crate::error::{PaymentRequestError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strictly positive monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentRequestError::ValidationError(vec![
                crate::error::Violation::new("amount", "Amount must be positive"),
            ]))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentRequestError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: u64,
    pub order_id: u64,
    pub method_code: String,
    pub amount: Amount,
    pub currency_code: String,
}

/// Aggregate root owning its payments. Clients address it by `token_value` only.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: u64,
    pub token_value: String,
    pub payments: Vec<Payment>,
}

impl Order {
    pub fn new(id: u64, token_value: impl Into<String>) -> Self {
        Self {
            id,
            token_value: token_value.into(),
            payments: Vec::new(),
        }
    }

    pub fn add_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    pub fn payment(&self, payment_id: u64) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }

    pub fn last_payment(&self) -> Option<&Payment> {
        self.payments.last()
    }
}
