//! Application layer orchestrating the payment request workflow.
//!
//! `PaymentRequestService` is the entry point. It resolves a handler through the
//! ordered `HandlerChain`, drives the state machine and talks to gateways only
//! through the `GatewayAdapter` boundary. Order checkout goes through the pay
//! and after pay chains of `pay`.

pub mod command;
pub mod gateway;
pub mod handler;
pub mod pay;
pub mod service;
