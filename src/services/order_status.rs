//! Lifecycle tables for order status and payment status.
//!
//! Both axes were historically unenforced free-form strings; they are now
//! explicit transition tables checked before every mutation. A same-status
//! update is a permitted no-op on both axes.

use crate::errors::ServiceError;
use crate::models::{OrderStatus, PaymentStatus};

/// Whether a fulfillment-status transition is allowed.
///
/// pending → paid | processing | cancelled
/// paid → processing | cancelled
/// processing → shipping | cancelled
/// shipping → completed | cancelled
/// completed, cancelled → terminal
pub fn is_valid_status_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        _ if from == to => true,
        (Pending, Paid) | (Pending, Processing) => true,
        (Paid, Processing) => true,
        (Processing, Shipping) => true,
        (Shipping, Completed) => true,
        // Any non-terminal state can be cancelled.
        (from, Cancelled) if !from.is_terminal() => true,
        _ => false,
    }
}

/// Whether a payment-status transition is allowed: unpaid → paid → refunded,
/// strictly linear.
pub fn is_valid_payment_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    use PaymentStatus::*;
    match (from, to) {
        _ if from == to => true,
        (Unpaid, Paid) => true,
        (Paid, Refunded) => true,
        _ => false,
    }
}

pub fn ensure_status_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if is_valid_status_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "cannot transition order from '{}' to '{}'",
            from, to
        )))
    }
}

pub fn ensure_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), ServiceError> {
    if is_valid_payment_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "cannot transition payment from '{}' to '{}'",
            from, to
        )))
    }
}
