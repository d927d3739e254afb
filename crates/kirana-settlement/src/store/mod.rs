//! Persistence boundary for settlement.
//!
//! Settlement touches exactly two kinds of shared mutable state: product
//! stock counters and coupon usage counters. Both live behind
//! [`SettlementStore`], and both are only ever written through
//! [`SettlementStore::commit_order`] — the single atomic boundary. Any
//! transport (SQL, RPC, in-memory) satisfying these contracts is
//! conformant.

mod memory;

pub use memory::MemoryStore;

use crate::coupon::Coupon;
use crate::ids::{AttemptId, CouponId, ProductId};
use crate::money::Money;
use crate::shipping::{ShippingSettings, ShippingZone};
use crate::checkout::{Order, OrderDraft};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Authoritative per-product state at settlement time. Price and stock
/// come from here, never from the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    /// Current catalog price.
    pub price: Money,
    /// Units available.
    pub stock_quantity: i64,
    /// Whether the product can be sold at all.
    pub is_active: bool,
    /// Product name, captured onto order items.
    pub name: String,
    /// SKU, captured onto order items.
    pub sku: String,
}

/// Errors surfaced by a store implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached; nothing was written.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The commit was attempted but its outcome is unknown (e.g., a
    /// timeout after the write was sent). Resolve by re-querying the
    /// attempt id.
    #[error("commit outcome unknown: {0}")]
    OutcomeUnknown(String),

    /// A stock decrement would have driven stock negative. Nothing was
    /// written.
    #[error("stock conflict for {product_id}: requested {requested}, available {available}")]
    StockConflict {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The coupon's usage limit was reached between validation and
    /// commit. Nothing was written.
    #[error("coupon {code} redemption limit reached")]
    CouponExhausted { code: String },
}

/// The read/write contracts settlement needs from the catalog/order
/// store. Implementations must make `commit_order` atomic: all of its
/// writes land together or none do.
pub trait SettlementStore: Send + Sync {
    /// Read the shipping configuration: process-wide settings plus zone
    /// overrides.
    fn shipping_config(&self) -> Result<(ShippingSettings, Vec<ShippingZone>), StoreError>;

    /// Look up a coupon by code, case-insensitively.
    fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// Snapshot price, stock, and status for the given products. Unknown
    /// ids are simply absent from the result.
    fn products_for_order(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSnapshot>, StoreError>;

    /// Atomically decrement stock for every product, record the coupon
    /// redemption (when given), and insert the order with a fresh unique
    /// order number. Fails as a whole — without writing anything — if
    /// any decrement would drive stock negative or the coupon is over
    /// its limit.
    fn commit_order(
        &self,
        draft: OrderDraft,
        decrements: &BTreeMap<ProductId, i64>,
        coupon: Option<&CouponId>,
    ) -> Result<Order, StoreError>;

    /// Find the order a previous settlement attempt committed, if any.
    /// This is the reconciliation read for indeterminate commits.
    fn order_by_attempt(&self, attempt_id: &AttemptId) -> Result<Option<Order>, StoreError>;
}

impl<S: SettlementStore + ?Sized> SettlementStore for std::sync::Arc<S> {
    fn shipping_config(&self) -> Result<(ShippingSettings, Vec<ShippingZone>), StoreError> {
        (**self).shipping_config()
    }

    fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        (**self).coupon_by_code(code)
    }

    fn products_for_order(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSnapshot>, StoreError> {
        (**self).products_for_order(ids)
    }

    fn commit_order(
        &self,
        draft: OrderDraft,
        decrements: &BTreeMap<ProductId, i64>,
        coupon: Option<&CouponId>,
    ) -> Result<Order, StoreError> {
        (**self).commit_order(draft, decrements, coupon)
    }

    fn order_by_attempt(&self, attempt_id: &AttemptId) -> Result<Option<Order>, StoreError> {
        (**self).order_by_attempt(attempt_id)
    }
}
