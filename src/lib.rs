//! Carmart core library
//!
//! This crate implements the cart → order → payment workflow for the Carmart
//! storefront: per-user cart mutation with merge-on-add semantics, order
//! creation with a denormalized per-user index, explicit order/payment status
//! lifecycles, and the signed redirect contract of the VNPay sandbox gateway.
//!
//! Persistence is a hosted hierarchical key-value store reached over REST
//! ([`store::RtdbClient`]); everything above it is written against the
//! [`store::KvStore`] trait so tests run on [`store::MemoryStore`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod payments;
pub mod services;
pub mod store;

pub use auth::AuthSession;
pub use config::AppConfig;
pub use errors::ServiceError;
