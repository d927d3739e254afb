//! Settlement error types.
//!
//! Business-rule failures (unavailable product, insufficient stock,
//! invalid coupon) are expected conditions: they are typed variants the
//! caller can match on, and they never leave residual side effects. Only
//! `PersistenceFailure` with an unknown outcome requires a reconciliation
//! read before retrying.

use crate::coupon::CouponRejection;
use crate::ids::ProductId;
use crate::money::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A cart line that could not be covered by available stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockShortfall {
    /// Product that fell short.
    pub product_id: ProductId,
    /// Quantity requested by the cart.
    pub requested: i64,
    /// Quantity actually available.
    pub available: i64,
}

impl fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: requested {}, available {}",
            self.product_id, self.requested, self.available
        )
    }
}

fn format_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while settling an order.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    /// Cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line has a non-positive quantity.
    #[error("invalid quantity {quantity} for {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i64,
    },

    /// A cart line's quantity exceeds the per-line cap.
    #[error("quantity {quantity} for {product_id} exceeds the limit of {limit}")]
    QuantityExceedsLimit {
        product_id: ProductId,
        quantity: i64,
        limit: i64,
    },

    /// Delivery distance is negative.
    #[error("delivery distance cannot be negative: {0} km")]
    NegativeDistance(f64),

    /// Shipping address is malformed or incomplete.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),

    /// Guest email is malformed.
    #[error("invalid guest email: {0}")]
    InvalidGuestEmail(String),

    /// Amounts in two different currencies were combined.
    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    /// Arithmetic overflow in a money calculation.
    #[error("arithmetic overflow in money calculation")]
    Overflow,

    /// Unknown or inactive product referenced by a cart line.
    #[error("product unavailable: {product_id}")]
    ProductUnavailable { product_id: ProductId },

    /// Requested quantity exceeds available stock for one or more lines.
    #[error("insufficient stock: {}", format_shortfalls(.shortfalls))]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// Coupon could not be applied.
    #[error("invalid coupon {code}: {reason}")]
    CouponInvalid {
        code: String,
        reason: CouponRejection,
    },

    /// The atomic commit kept detecting races; the whole settlement may
    /// be retried from the re-pricing step.
    #[error("settlement lost a concurrent race: {0}")]
    ConcurrencyConflict(String),

    /// The store failed. When `outcome_known` is false the commit may
    /// have landed; re-query by attempt id before retrying.
    #[error("persistence failure (outcome known: {outcome_known}): {detail}")]
    PersistenceFailure { detail: String, outcome_known: bool },
}

impl SettlementError {
    /// Expected business-rule failure, as opposed to an infrastructure
    /// fault. Guaranteed to have left no side effects.
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            SettlementError::ProductUnavailable { .. }
                | SettlementError::InsufficientStock { .. }
                | SettlementError::CouponInvalid { .. }
        )
    }

    /// Whether the whole settlement is safe to retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettlementError::ConcurrencyConflict(_))
    }

    /// Whether the caller must re-query by attempt id before retrying.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(
            self,
            SettlementError::PersistenceFailure {
                outcome_known: false,
                ..
            }
        )
    }
}
