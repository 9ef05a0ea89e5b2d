//! Domain models for the back office.
//!
//! Products, orders and users are stored independently. Users additionally
//! embed a summary of their orders (see [`user::OrderSummary`]).

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order};
pub use product::{MAX_PRODUCT_IMAGES, NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, OrderSummary, User};
