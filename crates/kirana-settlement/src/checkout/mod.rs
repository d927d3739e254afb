//! Checkout module.
//!
//! Cart lines, addresses, the order model, and the settlement
//! coordinator that turns a priced cart into a committed order.

mod address;
mod cart;
mod order;
mod settlement;

pub use address::Address;
pub use cart::{aggregate_lines, CartLine, MAX_QUANTITY_PER_LINE};
pub use order::{
    CustomerIdentity, Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus,
};
pub use settlement::{SettlementCoordinator, SettlementPhase, SettlementRequest};
