use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

/// A catalog listing, stored at `products/{productId}`.
///
/// Read-mostly from the workflow's perspective: add-to-cart snapshots the
/// listing's name and numeric price into the cart entry. `price` here is the
/// seller-entered display string and is not used in arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    pub fn from_entry(id: impl Into<String>, value: Value) -> Result<Self, ServiceError> {
        let mut product: Product = serde_json::from_value(value)?;
        product.id = id.into();
        Ok(product)
    }
}

/// Draft for a new listing; key and timestamp are assigned on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Partial update for a listing; only the set fields are patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_entry_decodes_listing() {
        let value = json!({
            "name": "Toyota Vios 2020",
            "category": "sedan",
            "price": "450 trieu",
            "description": "Well kept",
            "status": "active",
            "createdAt": "2024-02-01T00:00:00Z",
            "userId": "seller-1"
        });

        let product = Product::from_entry("p1", value).expect("decode failed");
        assert_eq!(product.id, "p1");
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.user_id.as_deref(), Some("seller-1"));
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = ProductPatch {
            status: Some(ProductStatus::Inactive),
            ..ProductPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["status"], "inactive");
    }
}
