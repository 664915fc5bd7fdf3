use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

/// One line item in a user's active cart, stored at `carts/{userId}/{itemId}`.
///
/// The `id` is the server-assigned key of the entry; it is not part of the
/// stored value and gets filled in at decode time. Inside an order snapshot
/// the full item, id included, is frozen into the order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Decodes a stored cart entry, attaching its key.
    pub fn from_entry(id: impl Into<String>, value: Value) -> Result<Self, ServiceError> {
        let mut item: CartItem = serde_json::from_value(value)?;
        item.id = id.into();
        Ok(item)
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Draft for add-to-cart. Key, owner and timestamp are assigned by the
/// service on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn from_entry_fills_key_and_decodes_camel_case() {
        let value = json!({
            "productId": "p1",
            "name": "Mazda CX-5",
            "price": 100.0,
            "quantity": 2,
            "image": "https://img/cx5.jpg",
            "description": "2021, one owner",
            "userId": "u1",
            "addedAt": "2024-03-01T08:00:00Z"
        });

        let item = CartItem::from_entry("item-key", value).expect("decode failed");
        assert_eq!(item.id, "item-key");
        assert_eq!(item.product_id, "p1");
        assert_eq!(item.price, dec!(100));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.user_id, "u1");
        assert!(item.added_at.is_some());
    }

    #[test]
    fn from_entry_rejects_malformed_record() {
        let value = json!({ "productId": "p1" });
        let err = CartItem::from_entry("k", value).unwrap_err();
        assert!(matches!(err, ServiceError::SerializationError(_)));
    }

    #[test]
    fn line_total_is_price_times_quantity() {
        let item = CartItem {
            id: "k".into(),
            product_id: "p".into(),
            name: "Car".into(),
            price: dec!(50),
            quantity: 3,
            image: String::new(),
            description: String::new(),
            user_id: "u".into(),
            added_at: None,
        };
        assert_eq!(item.line_total(), dec!(150));
    }
}
