// Workflow services
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

// Lifecycle tables for order and payment status
pub mod order_status;

// Service wiring for dependency injection
pub mod factory;

pub use cart::CartService;
pub use factory::{build_services, AppServices};
pub use checkout::{CheckoutService, PlacedOrder, RecipientForm};
pub use orders::{OrderService, OrderStatistics};
pub use products::ProductService;
