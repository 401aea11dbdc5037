//! Domain model of the payment request workflow.
//!
//! Entities (`Order`, `Payment`, `PaymentMethod`, `PaymentRequest`), the request
//! state machine, and the ports through which the application layer reaches storage.

pub mod hash;
pub mod order;
pub mod payment_method;
pub mod payment_request;
pub mod ports;
pub mod state_machine;
