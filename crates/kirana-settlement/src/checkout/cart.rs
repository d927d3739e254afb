//! Cart input to settlement.

use crate::error::SettlementError;
use crate::ids::ProductId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum quantity allowed for a single product across the cart.
pub const MAX_QUANTITY_PER_LINE: i64 = 9_999;

/// One proposed line of a cart: a product and how many of it.
///
/// Carries no price. Unit prices are re-read from the catalog at
/// settlement time; a client-supplied price is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    /// Product to purchase.
    pub product_id: ProductId,
    /// Quantity, must be positive.
    pub quantity: i64,
}

impl CartLine {
    /// Create a new cart line.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Validate cart lines and merge duplicates into per-product quantities.
///
/// Rejects an empty cart, any non-positive quantity, and any merged
/// quantity over [`MAX_QUANTITY_PER_LINE`]. The result is ordered by
/// product id so downstream iteration is deterministic.
pub fn aggregate_lines(
    lines: &[CartLine],
) -> Result<BTreeMap<ProductId, i64>, SettlementError> {
    if lines.is_empty() {
        return Err(SettlementError::EmptyCart);
    }

    let mut wanted: BTreeMap<ProductId, i64> = BTreeMap::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(SettlementError::InvalidQuantity {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }

        let entry = wanted.entry(line.product_id.clone()).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or(SettlementError::Overflow)?;
        if *entry > MAX_QUANTITY_PER_LINE {
            return Err(SettlementError::QuantityExceedsLimit {
                product_id: line.product_id.clone(),
                quantity: *entry,
                limit: MAX_QUANTITY_PER_LINE,
            });
        }
    }

    Ok(wanted)
}
