//! Coupon validation against an order subtotal.
//!
//! Validation fails closed: every expected business condition (unknown
//! code, inactive, outside the validity window, exhausted, below minimum)
//! comes back as a typed [`CouponRejection`], never a panic or a generic
//! fault. The coordinator re-runs this against live coupon state at
//! settlement time; a code a customer entered minutes ago may no longer
//! be redeemable.

use crate::coupon::Coupon;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonicalize a coupon code for lookup and storage.
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a coupon could not be applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CouponRejection {
    /// No coupon exists for the code.
    UnknownCode,
    /// Coupon has been deactivated.
    Inactive,
    /// Validity window has not opened yet.
    NotStarted,
    /// Validity window has closed.
    Expired,
    /// Redemption limit has been reached.
    UsageExhausted,
    /// Order subtotal is below the coupon's minimum.
    BelowMinimum {
        minimum: Money,
        subtotal: Money,
    },
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::UnknownCode => write!(f, "coupon code not recognized"),
            CouponRejection::Inactive => write!(f, "coupon is no longer active"),
            CouponRejection::NotStarted => write!(f, "coupon is not valid yet"),
            CouponRejection::Expired => write!(f, "coupon has expired"),
            CouponRejection::UsageExhausted => {
                write!(f, "coupon redemption limit has been reached")
            }
            CouponRejection::BelowMinimum { minimum, subtotal } => {
                let shortfall = *minimum - *subtotal;
                write!(
                    f,
                    "order subtotal {} is {} short of the {} minimum for this coupon",
                    subtotal, shortfall, minimum
                )
            }
        }
    }
}

/// Assess a looked-up coupon against an order subtotal.
///
/// `coupon` is the result of a case-insensitive store lookup; `None`
/// means the code matched nothing. On success, returns the discount
/// amount to apply.
pub fn assess(coupon: Option<&Coupon>, subtotal: Money) -> Result<Money, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::UnknownCode)?;

    if let Some(rejection) = coupon.rejection() {
        return Err(rejection);
    }

    if let Some(minimum) = coupon.minimum_order_amount {
        if subtotal.amount_minor < minimum.amount_minor {
            return Err(CouponRejection::BelowMinimum { minimum, subtotal });
        }
    }

    Ok(coupon.discount_for(subtotal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn subtotal(major: i64) -> Money {
        Money::from_major(major, Currency::INR)
    }

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code("  save10 "), "SAVE10");
        assert_eq!(canonical_code("FLAT50"), "FLAT50");
    }

    #[test]
    fn test_unknown_code_fails_closed() {
        assert_eq!(
            assess(None, subtotal(1_000)),
            Err(CouponRejection::UnknownCode)
        );
    }

    #[test]
    fn test_below_minimum_reports_shortfall() {
        let coupon = Coupon::percentage("SAVE10", 10.0).with_minimum_order(subtotal(2_000));
        let result = assess(Some(&coupon), subtotal(1_500));
        assert_eq!(
            result,
            Err(CouponRejection::BelowMinimum {
                minimum: subtotal(2_000),
                subtotal: subtotal(1_500),
            })
        );

        let message = result.unwrap_err().to_string();
        assert!(message.contains("\u{20b9}500.00 short"), "{message}");
    }

    #[test]
    fn test_minimum_met_is_inclusive() {
        let coupon = Coupon::percentage("SAVE10", 10.0).with_minimum_order(subtotal(2_000));
        assert_eq!(assess(Some(&coupon), subtotal(2_000)), Ok(subtotal(200)));
    }

    #[test]
    fn test_exhausted_coupon_rejected() {
        let mut coupon = Coupon::fixed("FLAT50", subtotal(50)).with_usage_limit(1);
        coupon.used_count = 1;
        assert_eq!(
            assess(Some(&coupon), subtotal(1_000)),
            Err(CouponRejection::UsageExhausted)
        );
    }

    #[test]
    fn test_applicable_fixed_coupon() {
        let coupon = Coupon::fixed("FLAT50", subtotal(50));
        assert_eq!(assess(Some(&coupon), subtotal(1_000)), Ok(subtotal(50)));
    }
}
