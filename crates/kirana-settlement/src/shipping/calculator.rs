//! Shipping cost calculation.
//!
//! A pure function of the cart subtotal, the delivery distance, and the
//! resolved shipping parameters. The same inputs always yield the same
//! quote, so the storefront can show shipping at cart time and settlement
//! can recompute it without drift.

use crate::error::SettlementError;
use crate::money::Money;
use crate::shipping::{EffectiveShippingParams, ShippingSettings, ShippingZone};
use serde::{Deserialize, Serialize};

/// The computed shipping charge plus its auditable breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingQuote {
    /// Total shipping charge.
    pub amount: Money,
    /// Every resolved parameter and intermediate amount.
    pub breakdown: ShippingBreakdown,
}

/// Itemized record of how a shipping charge was computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingBreakdown {
    /// Parameters after zone resolution.
    pub params: EffectiveShippingParams,
    /// Distance as supplied by the caller.
    pub requested_distance_km: f64,
    /// Distance after clamping to the zone's maximum, if any.
    pub effective_distance_km: f64,
    /// Portion of the distance beyond the free radius.
    pub chargeable_distance_km: f64,
    /// Flat base charge applied (zero when the threshold was met).
    pub base_charge: Money,
    /// Per-kilometre surcharge applied.
    pub distance_surcharge: Money,
    /// Whether the subtotal met the free-shipping threshold and the
    /// delivery fell inside the free radius.
    pub is_free_shipping: bool,
}

/// Compute the shipping charge for an order.
///
/// A negative distance is a contract violation, not an input to clamp.
pub fn compute_shipping(
    subtotal: Money,
    distance_km: f64,
    settings: &ShippingSettings,
    zones: &[ShippingZone],
) -> Result<ShippingQuote, SettlementError> {
    if distance_km < 0.0 || distance_km.is_nan() {
        return Err(SettlementError::NegativeDistance(distance_km));
    }

    let params = EffectiveShippingParams::resolve(settings, zones);
    if params.base_rate.currency != subtotal.currency {
        return Err(SettlementError::CurrencyMismatch {
            expected: subtotal.currency,
            got: params.base_rate.currency,
        });
    }

    let effective_distance_km = match params.max_shipping_distance_km {
        Some(max) => distance_km.min(max),
        None => distance_km,
    };
    let chargeable_distance_km =
        (effective_distance_km - params.distance_free_radius_km).max(0.0);

    let meets_threshold =
        subtotal.amount_minor >= params.free_shipping_threshold.amount_minor;
    let within_radius = chargeable_distance_km == 0.0;

    let zero = Money::zero(subtotal.currency);
    let base_charge = if meets_threshold { zero } else { params.base_rate };
    let distance_surcharge = if within_radius {
        zero
    } else {
        params.per_km_rate.scale_half_up(chargeable_distance_km)
    };

    let amount = base_charge
        .checked_add(&distance_surcharge)
        .ok_or(SettlementError::Overflow)?;

    Ok(ShippingQuote {
        amount,
        breakdown: ShippingBreakdown {
            params,
            requested_distance_km: distance_km,
            effective_distance_km,
            chargeable_distance_km,
            base_charge,
            distance_surcharge,
            is_free_shipping: meets_threshold && within_radius,
        },
    })
}
