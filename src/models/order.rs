use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::models::CartItem;

/// Fulfillment lifecycle stage of an order.
///
/// `status` and `payment_status` evolve independently: a COD order can sit in
/// `processing` while still `unpaid`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Whether money has been collected for an order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    #[strum(serialize = "COD")]
    Cod,
    #[serde(rename = "VNPay")]
    #[strum(serialize = "VNPay")]
    VnPay,
    #[serde(rename = "MoMo")]
    #[strum(serialize = "MoMo")]
    MoMo,
}

/// Gateway transaction details recorded when a payment completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// An immutable-at-creation snapshot of a purchase, stored at `orders/{key}`.
///
/// `items`, `subtotal`, `shipping_fee` and `total` are frozen at creation;
/// only `status`, `payment_status` and their companion fields mutate
/// afterwards. Orders are never deleted, only marked cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server-assigned key, not part of the stored value.
    #[serde(skip)]
    pub id: String,
    /// Client-generated human-readable reference (e.g. `DH1718000000000`).
    pub order_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Decodes a stored order record, attaching its key and normalizing
    /// legacy records that predate the `paymentStatus` field.
    pub fn decode(id: impl Into<String>, mut value: Value) -> Result<Self, ServiceError> {
        normalize_payment_status(&mut value);
        let mut order: Order = serde_json::from_value(value)?;
        order.id = id.into();
        Ok(order)
    }
}

/// Backward-compatibility rule for records written before `paymentStatus`
/// existed: infer `paid` when `paymentInfo.paidAt` is present or the legacy
/// `status` is `paid`, otherwise `unpaid`. Applied only when the field is
/// absent; records carrying the field pass through untouched.
fn normalize_payment_status(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if obj.contains_key("paymentStatus") {
        return;
    }

    let has_paid_at = obj
        .get("paymentInfo")
        .and_then(|info| info.get("paidAt"))
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    let status_is_paid = obj.get("status").and_then(Value::as_str) == Some("paid");

    let inferred = if has_paid_at || status_is_paid {
        "paid"
    } else {
        "unpaid"
    };
    obj.insert(
        "paymentStatus".to_string(),
        Value::String(inferred.to_string()),
    );
}

/// Denormalized per-user summary stored at `userOrders/{userId}/{orderKey}`.
///
/// Kept in sync with the primary record on every status or payment-status
/// mutation. Deliberately minimal: cancellation details never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIndexEntry {
    pub order_id: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for order creation. Key and timestamps are stamped by the service;
/// `payment_status` defaults to `unpaid` when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub phone: String,
    pub address: String,
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default = "default_draft_status")]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_draft_status() -> OrderStatus {
    OrderStatus::Pending
}

impl OrderDraft {
    /// Boundary checks before any write: a non-empty snapshot, positive line
    /// items and a total that equals subtotal + shipping fee.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order must contain at least one item".to_string(),
            ));
        }
        for item in &self.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "item {} has non-positive quantity",
                    item.product_id
                )));
            }
            if item.price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "item {} has non-positive price",
                    item.product_id
                )));
            }
        }
        if self.total != self.subtotal + self.shipping_fee {
            return Err(ServiceError::ValidationError(format!(
                "total {} does not equal subtotal {} + shipping fee {}",
                self.total, self.subtotal, self.shipping_fee
            )));
        }
        Ok(())
    }
}
