//! Typed records for the store's JSON trees.
//!
//! Every record is decoded through a validated boundary (`from_entry` /
//! `decode`) instead of passing raw JSON into the services; malformed stored
//! data surfaces as [`crate::errors::ServiceError::SerializationError`].

pub mod cart_item;
pub mod order;
pub mod product;

pub use cart_item::{CartItem, NewCartItem};
pub use order::{
    Order, OrderDraft, OrderIndexEntry, OrderStatus, PaymentInfo, PaymentMethod, PaymentStatus,
};
pub use product::{NewProduct, Product, ProductPatch, ProductStatus};
