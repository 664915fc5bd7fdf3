use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::AuthSession;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{Order, OrderDraft, OrderIndexEntry, OrderStatus, PaymentInfo, PaymentStatus};
use crate::services::order_status::{ensure_payment_transition, ensure_status_transition};
use crate::store::{paths, KeyedLocks, KvStore};

/// Per-status order counts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total: usize,
    pub pending: usize,
    pub paid: usize,
    pub processing: usize,
    pub shipping: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Order service: creation, dual-index maintenance, status lifecycle and
/// payment reconciliation.
///
/// Orders live at `orders/{key}`; a denormalized summary per user lives at
/// `userOrders/{userId}/{key}` so non-admin listing avoids a full-table
/// scan. Status and payment-status mutations mirror the changed field into
/// the index under a per-order lock. Order creation's two writes are
/// sequential and deliberately not atomic: an index failure after the
/// primary write leaves the order unindexed for its user, which admin scans
/// still see.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn KvStore>,
    event_sender: Arc<EventSender>,
    locks: KeyedLocks,
}

impl OrderService {
    pub fn new(store: Arc<dyn KvStore>, event_sender: Arc<EventSender>, locks: KeyedLocks) -> Self {
        Self {
            store,
            event_sender,
            locks,
        }
    }

    /// Creates an order from a validated draft and indexes it for its user.
    ///
    /// Stamps `created_at = updated_at = now` and defaults `payment_status`
    /// to `unpaid`. Returns the server-generated order key.
    #[instrument(skip(self, session, draft), fields(order_id = %draft.order_id, user_id = %draft.user_id))]
    pub async fn create_order(
        &self,
        session: &AuthSession,
        draft: OrderDraft,
    ) -> Result<String, ServiceError> {
        draft.validate()?;

        let now = Utc::now();
        let order = Order {
            id: String::new(),
            order_id: draft.order_id,
            user_id: draft.user_id,
            user_name: draft.user_name,
            user_email: draft.user_email,
            phone: draft.phone,
            address: draft.address,
            items: draft.items,
            subtotal: draft.subtotal,
            shipping_fee: draft.shipping_fee,
            total: draft.total,
            payment_method: draft.payment_method,
            payment_status: draft.payment_status.unwrap_or(PaymentStatus::Unpaid),
            status: draft.status,
            created_at: now,
            updated_at: now,
            note: draft.note,
            payment_info: None,
            cancel_reason: None,
            cancelled_at: None,
        };

        let key = self
            .store
            .push(session, paths::ORDERS, serde_json::to_value(&order)?)
            .await?;

        // Second leg of the dual write; not atomic with the first.
        let entry = OrderIndexEntry {
            order_id: order.order_id.clone(),
            total: order.total,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
        };
        self.store
            .put(
                session,
                &paths::user_order(&order.user_id, &key),
                serde_json::to_value(&entry)?,
            )
            .await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(key.clone()))
            .await;

        info!(order_key = %key, "order created");
        Ok(key)
    }

    /// Fetches one order by its store key, normalizing legacy records at the
    /// decode boundary.
    #[instrument(skip(self, session))]
    pub async fn get_order_by_id(
        &self,
        session: &AuthSession,
        key: &str,
    ) -> Result<Option<Order>, ServiceError> {
        let Some(value) = self.store.get(session, &paths::order(key)).await? else {
            return Ok(None);
        };
        Order::decode(key, value).map(Some)
    }

    /// Fetches one order by its human-readable reference via a table scan.
    #[instrument(skip(self, session))]
    pub async fn get_order_by_reference(
        &self,
        session: &AuthSession,
        reference: &str,
    ) -> Result<Option<Order>, ServiceError> {
        let orders = self.scan_orders(session).await?;
        Ok(orders.into_iter().find(|o| o.order_id == reference))
    }

    /// Lists a user's orders, newest first.
    ///
    /// Administrators scan the full table and filter client-side; regular
    /// users read their index and hydrate each summary through
    /// [`Self::get_order_by_id`], dropping entries whose hydration fails.
    #[instrument(skip(self, session))]
    pub async fn get_user_orders(
        &self,
        session: &AuthSession,
        user_id: &str,
    ) -> Result<Vec<Order>, ServiceError> {
        let mut orders = if session.is_admin {
            let mut all = self.scan_orders(session).await?;
            all.retain(|o| o.user_id == user_id);
            all
        } else {
            let Some(index) = self
                .store
                .get(session, &paths::user_orders(user_id))
                .await?
            else {
                return Ok(Vec::new());
            };
            let keys: Vec<String> = index
                .as_object()
                .map(|o| o.keys().cloned().collect())
                .unwrap_or_default();

            let hydrated = join_all(
                keys.iter()
                    .map(|key| self.get_order_by_id(session, key)),
            )
            .await;
            // An index entry whose primary record is unreadable is skipped,
            // not fatal to the listing.
            hydrated
                .into_iter()
                .filter_map(|result| result.ok().flatten())
                .collect()
        };

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Lists every order (admin only), newest first.
    #[instrument(skip(self, session))]
    pub async fn get_all_orders(&self, session: &AuthSession) -> Result<Vec<Order>, ServiceError> {
        if !session.is_admin {
            return Err(ServiceError::PermissionDenied(
                "order table scan requires an administrator".to_string(),
            ));
        }
        let mut orders = self.scan_orders(session).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Moves an order along the fulfillment lifecycle and mirrors the new
    /// status into the owner's index entry.
    #[instrument(skip(self, session, payment_info))]
    pub async fn update_order_status(
        &self,
        session: &AuthSession,
        key: &str,
        status: OrderStatus,
        payment_info: Option<PaymentInfo>,
    ) -> Result<(), ServiceError> {
        // Patch and mirror run under the per-order lock so two racing
        // updates cannot leave the index reflecting a stale status.
        let _guard = self.locks.acquire(key).await;

        let order = self
            .get_order_by_id(session, key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", key)))?;
        let old_status = order.status;
        ensure_status_transition(old_status, status)?;

        let mut update = json!({
            "status": status,
            "updatedAt": Utc::now(),
        });
        if let Some(info) = &payment_info {
            update["paymentInfo"] = serde_json::to_value(info)?;
        }
        self.store.patch(session, &paths::order(key), update).await?;

        // Re-read for the owner, then mirror the status only.
        if let Some(refreshed) = self.get_order_by_id(session, key).await? {
            self.store
                .patch(
                    session,
                    &paths::user_order(&refreshed.user_id, key),
                    json!({ "status": status }),
                )
                .await?;
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_key: key.to_string(),
                old_status,
                new_status: status,
            })
            .await;

        info!(order_key = %key, %old_status, new_status = %status, "order status updated");
        Ok(())
    }

    /// Moves an order along the payment axis, independent of its
    /// fulfillment status, and mirrors the change into the index.
    #[instrument(skip(self, session, payment_info))]
    pub async fn update_payment_status(
        &self,
        session: &AuthSession,
        key: &str,
        payment_status: PaymentStatus,
        payment_info: Option<PaymentInfo>,
    ) -> Result<(), ServiceError> {
        let _guard = self.locks.acquire(key).await;

        let order = self
            .get_order_by_id(session, key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", key)))?;
        let old_status = order.payment_status;
        ensure_payment_transition(old_status, payment_status)?;

        let mut update = json!({
            "paymentStatus": payment_status,
            "updatedAt": Utc::now(),
        });
        if let Some(info) = &payment_info {
            update["paymentInfo"] = serde_json::to_value(info)?;
        }
        self.store.patch(session, &paths::order(key), update).await?;

        if let Some(refreshed) = self.get_order_by_id(session, key).await? {
            self.store
                .patch(
                    session,
                    &paths::user_order(&refreshed.user_id, key),
                    json!({ "paymentStatus": payment_status }),
                )
                .await?;
        }

        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                order_key: key.to_string(),
                old_status,
                new_status: payment_status,
            })
            .await;

        info!(order_key = %key, %old_status, new_status = %payment_status, "payment status updated");
        Ok(())
    }

    /// Cancels an order, recording the reason on the primary record only.
    ///
    /// The per-user index keeps its minimal summary shape: it reflects
    /// `status = cancelled` but never carries `cancelReason`.
    #[instrument(skip(self, session))]
    pub async fn cancel_order(
        &self,
        session: &AuthSession,
        key: &str,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        self.update_order_status(session, key, OrderStatus::Cancelled, None)
            .await?;

        if let Some(reason) = reason {
            self.store
                .patch(
                    session,
                    &paths::order(key),
                    json!({
                        "cancelReason": reason,
                        "cancelledAt": Utc::now(),
                    }),
                )
                .await?;
        }

        self.event_sender
            .send_or_log(Event::OrderCancelled(key.to_string()))
            .await;
        Ok(())
    }

    /// Per-status counts over one user's orders, or over all orders when no
    /// user is given.
    #[instrument(skip(self, session))]
    pub async fn get_order_statistics(
        &self,
        session: &AuthSession,
        user_id: Option<&str>,
    ) -> Result<OrderStatistics, ServiceError> {
        let orders = self.orders_in_scope(session, user_id).await?;

        let mut stats = OrderStatistics {
            total: orders.len(),
            ..OrderStatistics::default()
        };
        for order in &orders {
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Paid => stats.paid += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipping => stats.shipping += 1,
                OrderStatus::Completed => stats.completed += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }

    /// Revenue over the same scope as [`Self::get_order_statistics`];
    /// cancelled orders are excluded.
    #[instrument(skip(self, session))]
    pub async fn get_total_revenue(
        &self,
        session: &AuthSession,
        user_id: Option<&str>,
    ) -> Result<Decimal, ServiceError> {
        let orders = self.orders_in_scope(session, user_id).await?;
        Ok(orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| o.total)
            .sum())
    }

    async fn orders_in_scope(
        &self,
        session: &AuthSession,
        user_id: Option<&str>,
    ) -> Result<Vec<Order>, ServiceError> {
        match user_id {
            Some(user_id) => self.get_user_orders(session, user_id).await,
            None => self.get_all_orders(session).await,
        }
    }

    /// Reads the full order table, decoding each record and skipping the
    /// undecodable ones.
    async fn scan_orders(&self, session: &AuthSession) -> Result<Vec<Order>, ServiceError> {
        let Some(table) = self.store.get(session, paths::ORDERS).await? else {
            return Ok(Vec::new());
        };
        let entries = table.as_object().cloned().unwrap_or_default();

        let mut orders = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match Order::decode(&key, value) {
                Ok(order) => orders.push(order),
                Err(err) => warn!(order_key = %key, %err, "skipping undecodable order record"),
            }
        }
        Ok(orders)
    }
}
