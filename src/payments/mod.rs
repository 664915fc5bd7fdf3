//! Payment gateway integrations.
//!
//! The only collaborator is the redirect-based VNPay sandbox: the crate
//! builds a signed payment URL, the presentation layer opens it in an
//! embedded browser, and completion is detected by matching the configured
//! return URL and the gateway's response code.

pub mod vnpay;

pub use vnpay::{GatewayReturn, VnpayGateway};
