//! Entity records and their insert/update shapes.
//!
//! Entities carry server-assigned fields (ids, timestamps). Insert shapes
//! (`New*`) carry what a caller supplies; update shapes (`*Update`) carry
//! only the fields being changed. Shapes with input rules expose `validate()`.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, NewCart, NewCartItem, validate_quantity};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderLine, OrderWithItems};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{NewUser, User, UserUpdate};
