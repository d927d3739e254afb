//! Order settlement core for the Kirana storefront.
//!
//! Turns a proposed cart (items, quantities, a delivery destination, an
//! optional coupon code) into a priced, stock-checked, atomically
//! committed order:
//!
//! - **Shipping**: distance- and threshold-tiered cost calculation with
//!   zone overrides, as a pure function with an auditable breakdown
//! - **Coupons**: case-insensitive lookup, redeemability rules, capped
//!   percentage/fixed discounts, re-validated at settlement time
//! - **Settlement**: re-prices every line from the catalog, checks
//!   stock, and commits order + stock decrements + coupon redemption as
//!   one atomic write — or aborts with no side effects
//!
//! Catalog browsing, carts, auth, and fulfillment live elsewhere; this
//! crate only talks to them through the [`store::SettlementStore`]
//! boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use kirana_settlement::prelude::*;
//!
//! let store = MemoryStore::new(Currency::INR);
//! store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5",
//!     Money::from_major(600, Currency::INR), 20);
//!
//! let coordinator = SettlementCoordinator::new(store);
//! let request = SettlementRequest::new(
//!     CustomerIdentity::guest("a.rao@example.com"),
//!     vec![CartLine::new("p-rice", 2)],
//!     Address::new("A. Rao", "12 MG Road", "Bengaluru", "560001", "India"),
//!     3.0,
//! );
//! let order = coordinator.settle(request)?;
//! println!("{} — {}", order.order_number, order.total_amount);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod checkout;
pub mod coupon;
pub mod shipping;
pub mod store;

pub use error::{SettlementError, StockShortfall};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{SettlementError, StockShortfall};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Shipping
    pub use crate::shipping::{
        compute_shipping, EffectiveShippingParams, ShippingBreakdown, ShippingQuote,
        ShippingSettings, ShippingZone,
    };

    // Coupons
    pub use crate::coupon::{Coupon, CouponRejection, DiscountValue};

    // Checkout
    pub use crate::checkout::{
        Address, CartLine, CustomerIdentity, Order, OrderDraft, OrderItem, OrderStatus,
        PaymentStatus, SettlementCoordinator, SettlementPhase, SettlementRequest,
    };

    // Store boundary
    pub use crate::store::{MemoryStore, ProductSnapshot, SettlementStore, StoreError};
}
