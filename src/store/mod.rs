//! Persistence seam over the hosted hierarchical key-value store.
//!
//! The workflow services speak [`KvStore`] and nothing else. Production wires
//! in [`RtdbClient`] (the realtime-database REST surface); tests wire in
//! [`MemoryStore`]. Paths are slash-separated segments mirroring the store's
//! tree layout, e.g. `carts/{userId}/{itemId}`.

pub mod locks;
pub mod memory;
pub mod rtdb;

pub use locks::KeyedLocks;
pub use memory::MemoryStore;
pub use rtdb::RtdbClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::AuthSession;
use crate::errors::ServiceError;

/// Minimal contract of the backing store.
///
/// Semantics follow the REST surface: `get` of an absent subtree is
/// `Ok(None)`, `delete` of an absent path succeeds, `patch` is a shallow
/// merge of top-level keys, and `push` creates a child under a
/// server-generated key and returns that key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, session: &AuthSession, path: &str) -> Result<Option<Value>, ServiceError>;

    async fn put(&self, session: &AuthSession, path: &str, value: Value)
        -> Result<(), ServiceError>;

    async fn patch(
        &self,
        session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<(), ServiceError>;

    async fn push(&self, session: &AuthSession, path: &str, value: Value)
        -> Result<String, ServiceError>;

    async fn delete(&self, session: &AuthSession, path: &str) -> Result<(), ServiceError>;
}

/// Logical paths of the store's trees.
pub mod paths {
    pub const CARTS: &str = "carts";
    pub const ORDERS: &str = "orders";
    pub const USER_ORDERS: &str = "userOrders";
    pub const PRODUCTS: &str = "products";

    pub fn cart(user_id: &str) -> String {
        format!("{}/{}", CARTS, user_id)
    }

    pub fn cart_item(user_id: &str, item_id: &str) -> String {
        format!("{}/{}/{}", CARTS, user_id, item_id)
    }

    pub fn order(key: &str) -> String {
        format!("{}/{}", ORDERS, key)
    }

    pub fn user_orders(user_id: &str) -> String {
        format!("{}/{}", USER_ORDERS, user_id)
    }

    pub fn user_order(user_id: &str, order_key: &str) -> String {
        format!("{}/{}/{}", USER_ORDERS, user_id, order_key)
    }

    pub fn product(product_id: &str) -> String {
        format!("{}/{}", PRODUCTS, product_id)
    }
}
