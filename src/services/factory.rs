use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::payments::VnpayGateway;
use crate::services::{CartService, CheckoutService, OrderService, ProductService};
use crate::store::{KeyedLocks, KvStore};

/// The wired-up service graph.
///
/// All services share one store, one event channel and one lock registry;
/// sharing the lock registry is what makes the per-user and per-order
/// serialization hold across services.
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub products: Arc<ProductService>,
}

/// Builds the full service graph over a store implementation.
pub fn build_services(
    store: Arc<dyn KvStore>,
    config: Arc<AppConfig>,
    event_sender: Arc<EventSender>,
) -> AppServices {
    let locks = KeyedLocks::new();

    let carts = Arc::new(CartService::new(
        store.clone(),
        event_sender.clone(),
        locks.clone(),
    ));
    let orders = Arc::new(OrderService::new(
        store.clone(),
        event_sender.clone(),
        locks,
    ));
    let checkout = Arc::new(CheckoutService::new(
        carts.clone(),
        orders.clone(),
        VnpayGateway::new(config.vnpay.clone()),
        config,
    ));
    let products = Arc::new(ProductService::new(store));

    AppServices {
        carts,
        orders,
        checkout,
        products,
    }
}
