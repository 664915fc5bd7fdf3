use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::auth::AuthSession;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{CartItem, NewCartItem};
use crate::store::{paths, KeyedLocks, KvStore};

/// Shopping cart service: CRUD over a single user's cart subtree with
/// merge-on-add semantics.
///
/// The cart lives at `carts/{userId}` and is exclusively owned by that user;
/// there is no cross-user contention. The merge-or-create decision in
/// [`CartService::add_item`] is a read-then-write, so it runs under a
/// per-user lock to keep concurrent adds of the same product from creating
/// duplicate lines.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn KvStore>,
    event_sender: Arc<EventSender>,
    locks: KeyedLocks,
}

impl CartService {
    pub fn new(store: Arc<dyn KvStore>, event_sender: Arc<EventSender>, locks: KeyedLocks) -> Self {
        Self {
            store,
            event_sender,
            locks,
        }
    }

    /// Returns all items in the user's cart, empty when the subtree is
    /// absent.
    #[instrument(skip(self, session))]
    pub async fn get_items(
        &self,
        session: &AuthSession,
        user_id: &str,
    ) -> Result<Vec<CartItem>, ServiceError> {
        let Some(subtree) = self.store.get(session, &paths::cart(user_id)).await? else {
            return Ok(Vec::new());
        };
        let entries = subtree.as_object().cloned().unwrap_or_default();

        entries
            .into_iter()
            .map(|(key, value)| CartItem::from_entry(key, value))
            .collect()
    }

    /// Adds a product to the cart, merging with an existing line.
    ///
    /// If an item with the same `product_id` is already present, its
    /// quantity is incremented by `draft.quantity` and the existing key is
    /// returned; otherwise a new entry is created under a generated key.
    #[instrument(skip(self, session, draft), fields(product_id = %draft.product_id))]
    pub async fn add_item(
        &self,
        session: &AuthSession,
        user_id: &str,
        draft: NewCartItem,
    ) -> Result<String, ServiceError> {
        if draft.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        if draft.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must be positive".to_string(),
            ));
        }

        // Serialize merge-or-create per user; two concurrent adds of the
        // same product must not both observe "not present".
        let _guard = self.locks.acquire(user_id).await;

        let existing = self.get_items(session, user_id).await?;
        let product_id = draft.product_id.clone();

        let item_id = if let Some(item) = existing.iter().find(|i| i.product_id == product_id) {
            self.update_quantity(session, user_id, &item.id, item.quantity + draft.quantity)
                .await?;
            item.id.clone()
        } else {
            let mut value = serde_json::to_value(&draft)?;
            if let Value::Object(record) = &mut value {
                record.insert("userId".to_string(), Value::String(user_id.to_string()));
                record.insert("addedAt".to_string(), json!(Utc::now()));
            }

            self.store.push(session, &paths::cart(user_id), value).await?
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id: user_id.to_string(),
                product_id: product_id.clone(),
            })
            .await;

        info!(%user_id, %product_id, "added item to cart");
        Ok(item_id)
    }

    /// Overwrites an item's quantity; a non-positive quantity deletes the
    /// item instead (delete-on-zero policy).
    #[instrument(skip(self, session))]
    pub async fn update_quantity(
        &self,
        session: &AuthSession,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return self.delete_item(session, user_id, item_id).await;
        }
        self.store
            .patch(
                session,
                &paths::cart_item(user_id, item_id),
                json!({ "quantity": quantity }),
            )
            .await
    }

    /// Removes one entry; deleting an absent entry is a no-op, not an error.
    #[instrument(skip(self, session))]
    pub async fn delete_item(
        &self,
        session: &AuthSession,
        user_id: &str,
        item_id: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .delete(session, &paths::cart_item(user_id, item_id))
            .await
    }

    /// Removes the entire cart subtree. Idempotent; used after order
    /// placement.
    #[instrument(skip(self, session))]
    pub async fn clear(&self, session: &AuthSession, user_id: &str) -> Result<(), ServiceError> {
        self.store.delete(session, &paths::cart(user_id)).await?;
        self.event_sender
            .send_or_log(Event::CartCleared {
                user_id: user_id.to_string(),
            })
            .await;
        info!(%user_id, "cleared cart");
        Ok(())
    }

    /// Total quantity across the cart's lines.
    #[instrument(skip(self, session))]
    pub async fn item_count(
        &self,
        session: &AuthSession,
        user_id: &str,
    ) -> Result<i64, ServiceError> {
        let items = self.get_items(session, user_id).await?;
        Ok(items.iter().map(|i| i.quantity).sum())
    }
}

/// Sum of price × quantity over the list. Pure; order of items is
/// irrelevant and an empty cart totals zero.
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(product_id: &str, price: Decimal, quantity: i64) -> CartItem {
        CartItem {
            id: format!("key-{}", product_id),
            product_id: product_id.to_string(),
            name: format!("Car {}", product_id),
            price,
            quantity,
            image: String::new(),
            description: String::new(),
            user_id: "u1".to_string(),
            added_at: None,
        }
    }

    #[test]
    fn total_of_empty_cart_is_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn total_sums_line_totals() {
        let items = vec![item("a", dec!(100), 1), item("b", dec!(50), 2)];
        assert_eq!(cart_total(&items), dec!(200));
    }

    proptest! {
        #[test]
        fn total_is_order_independent(
            prices in proptest::collection::vec((1u32..100_000u32, 1i64..100i64), 0..12)
        ) {
            let items: Vec<CartItem> = prices
                .iter()
                .enumerate()
                .map(|(i, (price, qty))| item(&i.to_string(), Decimal::from(*price), *qty))
                .collect();

            let mut reversed = items.clone();
            reversed.reverse();

            let expected: Decimal = prices
                .iter()
                .map(|(price, qty)| Decimal::from(*price) * Decimal::from(*qty))
                .sum();

            prop_assert_eq!(cart_total(&items), expected);
            prop_assert_eq!(cart_total(&reversed), expected);
        }
    }
}
