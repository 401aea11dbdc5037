//! Legal moves of a payment request: `new -> processing -> {completed, failed}`.

use super::payment_request::PaymentRequestState;
use crate::error::{PaymentRequestError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Handed to a handler.
    Process,
    Complete,
    Fail,
}

/// Returns the state reached by applying `transition` to `from`.
///
/// Re-applying the outcome a terminal state already records is accepted and
/// leaves the state untouched, so duplicate gateway notifications are absorbed.
pub fn apply(from: PaymentRequestState, transition: Transition) -> Result<PaymentRequestState> {
    use PaymentRequestState::*;

    let to = match (from, transition) {
        (New, Transition::Process) => Processing,
        (Processing, Transition::Complete) => Completed,
        (Processing, Transition::Fail) => Failed,
        (Completed, Transition::Complete) => Completed,
        (Failed, Transition::Fail) => Failed,
        _ => return Err(PaymentRequestError::InvalidTransition { from, transition }),
    };
    Ok(to)
}

pub fn can_apply(from: PaymentRequestState, transition: Transition) -> bool {
    apply(from, transition).is_ok()
}
