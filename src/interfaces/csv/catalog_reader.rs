use crate::domain::order::{Amount, Order, Payment};
use crate::domain::payment_method::{GatewayConfig, PaymentMethod};
use crate::domain::payment_request::PaymentRequestAction;
use crate::error::{PaymentRequestError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source)
}

/// One row of the payment method catalog: `code,gateway_name,factory_name,uses_payment_requests,actions`.
#[derive(Debug, Deserialize)]
struct PaymentMethodRow {
    code: String,
    gateway_name: String,
    factory_name: String,
    uses_payment_requests: bool,
    /// `|`-separated, e.g. `authorize|capture`.
    #[serde(default)]
    actions: String,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = PaymentRequestError;

    fn try_from(row: PaymentMethodRow) -> Result<Self> {
        let supported_actions = row
            .actions
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<PaymentRequestAction>()
                    .map_err(|e| PaymentRequestError::InternalError(Box::new(e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PaymentMethod {
            code: row.code,
            gateway: GatewayConfig {
                gateway_name: row.gateway_name,
                factory_name: row.factory_name,
                uses_payment_requests: row.uses_payment_requests,
                supported_actions,
            },
        })
    }
}

/// Reads payment methods from a CSV catalog.
pub struct PaymentMethodReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentMethodReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: csv_reader(source),
        }
    }

    pub fn payment_methods(self) -> impl Iterator<Item = Result<PaymentMethod>> {
        self.reader
            .into_deserialize::<PaymentMethodRow>()
            .map(|row| PaymentMethod::try_from(row?))
    }
}

/// One payment of an order: `token,order_id,payment_id,method_code,amount,currency`.
#[derive(Debug, Deserialize)]
struct OrderPaymentRow {
    token: String,
    order_id: u64,
    payment_id: u64,
    method_code: String,
    amount: Decimal,
    currency: String,
}

/// Reads orders from a CSV catalog holding one row per payment.
///
/// Rows sharing a token are folded into one order, payments kept in file order.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: csv_reader(source),
        }
    }

    pub fn orders(self) -> Result<Vec<Order>> {
        let mut orders: BTreeMap<String, Order> = BTreeMap::new();
        for row in self.reader.into_deserialize::<OrderPaymentRow>() {
            let row = row?;
            let order = orders
                .entry(row.token.clone())
                .or_insert_with(|| Order::new(row.order_id, row.token.clone()));
            order.add_payment(Payment {
                id: row.payment_id,
                order_id: order.id,
                method_code: row.method_code,
                amount: Amount::new(row.amount)?,
                currency_code: row.currency,
            });
        }
        Ok(orders.into_values().collect())
    }
}
