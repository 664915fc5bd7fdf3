use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::AuthSession;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::{OrderDraft, OrderStatus, PaymentMethod, PaymentStatus};
use crate::payments::{GatewayReturn, VnpayGateway};
use crate::services::cart::{cart_total, CartService};
use crate::services::orders::OrderService;

/// Recipient details collected at checkout, validated before any network
/// call.
#[derive(Debug, Clone, Validate)]
pub struct RecipientForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub note: Option<String>,
}

fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return Err(validator::ValidationError::new(
            "phone must contain at least 10 digits",
        ));
    }
    Ok(())
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedOrder {
    /// COD: the order is confirmed immediately and the cart is cleared.
    Confirmed { order_key: String, reference: String },
    /// Online payment: the caller must redirect the customer to `pay_url`
    /// and feed the gateway's return back through
    /// [`CheckoutService::complete_payment`]. The cart stays intact until
    /// the payment completes.
    PendingPayment {
        order_key: String,
        reference: String,
        pay_url: String,
    },
}

/// Outcome of processing a gateway return redirect.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// Payment confirmed; the order is marked paid and the cart cleared.
    Paid,
    /// The gateway reported a failure; the order stays pending and unpaid.
    Failed { response_code: String },
}

/// Checkout orchestration: snapshots the cart into an order and drives the
/// payment branch.
#[derive(Clone)]
pub struct CheckoutService {
    carts: Arc<CartService>,
    orders: Arc<OrderService>,
    gateway: VnpayGateway,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        carts: Arc<CartService>,
        orders: Arc<OrderService>,
        gateway: VnpayGateway,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            carts,
            orders,
            gateway,
            config,
        }
    }

    /// Places an order from the session user's current cart.
    ///
    /// The cart contents, the configured shipping fee and the computed total
    /// are frozen into the order. COD orders confirm immediately and clear
    /// the cart; online-payment orders return a signed gateway URL and leave
    /// the cart untouched until the payment succeeds.
    #[instrument(skip(self, session, form), fields(user_id = %session.user_id, method = %payment_method))]
    pub async fn place_order(
        &self,
        session: &AuthSession,
        form: RecipientForm,
        payment_method: PaymentMethod,
    ) -> Result<PlacedOrder, ServiceError> {
        form.validate()?;

        let items = self.carts.get_items(session, &session.user_id).await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "cart is empty".to_string(),
            ));
        }

        let now = Utc::now();
        let subtotal = cart_total(&items);
        let shipping_fee = self.config.shipping_fee;
        let total = subtotal + shipping_fee;
        let reference = format!("DH{}", now.timestamp_millis());

        let draft = OrderDraft {
            order_id: reference.clone(),
            user_id: session.user_id.clone(),
            user_name: form.name,
            user_email: form.email,
            phone: form.phone,
            address: form.address,
            items,
            subtotal,
            shipping_fee,
            total,
            payment_method,
            status: OrderStatus::Pending,
            payment_status: Some(PaymentStatus::Unpaid),
            note: form.note,
        };
        let order_key = self.orders.create_order(session, draft).await?;

        match payment_method {
            PaymentMethod::Cod => {
                self.carts.clear(session, &session.user_id).await?;
                info!(%order_key, %reference, "COD order confirmed");
                Ok(PlacedOrder::Confirmed {
                    order_key,
                    reference,
                })
            }
            // MoMo exists in the stored data model but has no gateway
            // integration of its own; it rides the same signed redirect.
            PaymentMethod::VnPay | PaymentMethod::MoMo => {
                let pay_url = self.gateway.payment_url(&reference, total, now)?;
                info!(%order_key, %reference, "awaiting gateway payment");
                Ok(PlacedOrder::PendingPayment {
                    order_key,
                    reference,
                    pay_url,
                })
            }
        }
    }

    /// Processes a navigated URL from the embedded gateway browser.
    ///
    /// Returns `Ok(None)` when the URL is not the gateway's return redirect
    /// (navigation inside the payment flow). On a successful return the
    /// order's payment status moves to `paid` and the cart is cleared; on a
    /// failed return the order is left pending and unpaid.
    #[instrument(skip(self, session, navigated_url))]
    pub async fn complete_payment(
        &self,
        session: &AuthSession,
        order_key: &str,
        navigated_url: &str,
    ) -> Result<Option<PaymentOutcome>, ServiceError> {
        let Some(outcome) = self.gateway.classify_return(navigated_url) else {
            return Ok(None);
        };

        match outcome {
            GatewayReturn::Completed { payment_info } => {
                self.orders
                    .update_payment_status(
                        session,
                        order_key,
                        PaymentStatus::Paid,
                        Some(payment_info),
                    )
                    .await?;
                self.carts.clear(session, &session.user_id).await?;
                info!(%order_key, "payment completed");
                Ok(Some(PaymentOutcome::Paid))
            }
            GatewayReturn::Failed { response_code } => {
                info!(%order_key, %response_code, "payment failed, order left pending");
                Ok(Some(PaymentOutcome::Failed { response_code }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RecipientForm {
        RecipientForm {
            name: "Nguyen Van A".to_string(),
            email: "a@example.com".to_string(),
            phone: "0900123456".to_string(),
            address: "1 Le Loi, Da Nang".to_string(),
            note: None,
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn short_phone_is_rejected() {
        let mut f = form();
        f.phone = "090012".to_string();
        assert!(f.validate().is_err());
    }

    #[test]
    fn phone_digits_counted_through_separators() {
        let mut f = form();
        f.phone = "090-012-3456".to_string();
        assert!(f.validate().is_ok());
    }

    #[test]
    fn empty_address_is_rejected() {
        let mut f = form();
        f.address = String::new();
        assert!(f.validate().is_err());
    }
}
