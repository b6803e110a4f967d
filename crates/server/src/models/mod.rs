//! Domain models for the server.
//!
//! Models are what repositories return and handlers serialize. JSON field
//! names are camelCase; money serializes as a number.

pub mod bulk_order;
pub mod customer;
pub mod delivery;
pub mod session;
pub mod user;

pub use bulk_order::BulkOrder;
pub use customer::Customer;
pub use delivery::{CustomerDayStatus, Delivery, DeliveryWithCustomer, MarkedDelivery};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
