//! Coupon types.

use crate::ids::CouponId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Value of a coupon's discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DiscountValue {
    /// Percentage off the order subtotal (0.0 - 100.0).
    Percentage(f64),
    /// Fixed amount off.
    Fixed(Money),
}

/// A coupon definition.
///
/// Codes are stored canonically uppercased; lookups are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Coupon code (e.g., "SAVE10"), canonical uppercase.
    pub code: String,
    /// Description for display.
    pub description: Option<String>,
    /// Value of the discount.
    pub value: DiscountValue,
    /// Minimum order subtotal required to redeem.
    pub minimum_order_amount: Option<Money>,
    /// Cap on the computed discount (percentage coupons).
    pub maximum_discount: Option<Money>,
    /// Maximum number of redemptions (None = unlimited).
    pub usage_limit: Option<i64>,
    /// Current redemption count. Never exceeds `usage_limit` when set.
    pub used_count: i64,
    /// Start of validity window (Unix timestamp).
    pub starts_at: Option<i64>,
    /// End of validity window (Unix timestamp).
    pub expires_at: Option<i64>,
    /// Whether the coupon is active.
    pub is_active: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Coupon {
    /// Create a new percentage coupon.
    pub fn percentage(code: impl Into<String>, percent: f64) -> Self {
        Self::new(code, DiscountValue::Percentage(percent))
    }

    /// Create a new fixed-amount coupon.
    pub fn fixed(code: impl Into<String>, amount: Money) -> Self {
        Self::new(code, DiscountValue::Fixed(amount))
    }

    fn new(code: impl Into<String>, value: DiscountValue) -> Self {
        let now = current_timestamp();
        Self {
            id: CouponId::generate(),
            code: super::canonical_code(&code.into()),
            description: None,
            value,
            minimum_order_amount: None,
            maximum_discount: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Require a minimum order subtotal.
    pub fn with_minimum_order(mut self, amount: Money) -> Self {
        self.minimum_order_amount = Some(amount);
        self
    }

    /// Cap the computed discount.
    pub fn with_maximum_discount(mut self, amount: Money) -> Self {
        self.maximum_discount = Some(amount);
        self
    }

    /// Limit total redemptions.
    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Set the start of the validity window.
    pub fn starting_at(mut self, timestamp: i64) -> Self {
        self.starts_at = Some(timestamp);
        self
    }

    /// Set the end of the validity window.
    pub fn expiring_at(mut self, timestamp: i64) -> Self {
        self.expires_at = Some(timestamp);
        self
    }

    /// Check whether the coupon is currently redeemable: active, inside
    /// its validity window, and under its usage limit.
    pub fn is_redeemable(&self) -> bool {
        self.rejection().is_none()
    }

    /// The first reason this coupon cannot be redeemed right now, if any.
    pub fn rejection(&self) -> Option<super::CouponRejection> {
        use super::CouponRejection;

        if !self.is_active {
            return Some(CouponRejection::Inactive);
        }

        let now = current_timestamp();

        if let Some(starts) = self.starts_at {
            if now < starts {
                return Some(CouponRejection::NotStarted);
            }
        }

        if let Some(expires) = self.expires_at {
            if now >= expires {
                return Some(CouponRejection::Expired);
            }
        }

        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return Some(CouponRejection::UsageExhausted);
            }
        }

        None
    }

    /// Check if the usage limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .map(|limit| self.used_count >= limit)
            .unwrap_or(false)
    }

    /// Compute the discount this coupon grants on a subtotal.
    ///
    /// Percentage discounts are capped at `maximum_discount` when set;
    /// every discount is capped at the subtotal and is never negative.
    /// Rounding (half-up) happens once, inside the percentage step.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match &self.value {
            DiscountValue::Percentage(percent) => {
                let discount = subtotal.percentage(*percent);
                match self.maximum_discount {
                    Some(cap) if discount.amount_minor > cap.amount_minor => cap,
                    _ => discount,
                }
            }
            DiscountValue::Fixed(amount) => *amount,
        };

        let capped = if raw.amount_minor > subtotal.amount_minor {
            subtotal
        } else {
            raw
        };
        capped.clamp_non_negative()
    }

    /// Increment the redemption count.
    pub fn record_usage(&mut self) {
        self.used_count += 1;
        self.updated_at = current_timestamp();
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_percentage_discount() {
        let coupon = Coupon::percentage("save10", 10.0);
        assert_eq!(coupon.code, "SAVE10");

        let subtotal = Money::from_major(1_000, Currency::INR);
        assert_eq!(coupon.discount_for(subtotal).amount_minor, 10_000);
    }

    #[test]
    fn test_percentage_capped_at_maximum() {
        // SAVE10: 10% capped at ₹500, subtotal ₹8,000 → min(800, 500) = ₹500
        let coupon = Coupon::percentage("SAVE10", 10.0)
            .with_maximum_discount(Money::from_major(500, Currency::INR));
        let subtotal = Money::from_major(8_000, Currency::INR);
        assert_eq!(
            coupon.discount_for(subtotal),
            Money::from_major(500, Currency::INR)
        );
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let coupon = Coupon::fixed("FLAT1000", Money::from_major(1_000, Currency::INR));
        let subtotal = Money::from_major(400, Currency::INR);
        assert_eq!(coupon.discount_for(subtotal), subtotal);
    }

    #[test]
    fn test_inactive_coupon_rejected() {
        let mut coupon = Coupon::percentage("TEST", 10.0);
        assert!(coupon.is_redeemable());

        coupon.is_active = false;
        assert!(!coupon.is_redeemable());
    }

    #[test]
    fn test_usage_limit() {
        let mut coupon = Coupon::percentage("TEST", 10.0).with_usage_limit(5);

        coupon.used_count = 4;
        assert!(coupon.is_redeemable());
        assert!(!coupon.is_exhausted());

        coupon.record_usage();
        assert!(coupon.is_exhausted());
        assert!(!coupon.is_redeemable());
    }

    #[test]
    fn test_validity_window() {
        let now = current_timestamp();

        let coupon = Coupon::percentage("EARLY", 10.0).starting_at(now + 3_600);
        assert!(!coupon.is_redeemable());

        let coupon = Coupon::percentage("LATE", 10.0).expiring_at(now - 3_600);
        assert!(!coupon.is_redeemable());

        let coupon = Coupon::percentage("OPEN", 10.0)
            .starting_at(now - 3_600)
            .expiring_at(now + 3_600);
        assert!(coupon.is_redeemable());
    }
}
