//! Shipping configuration: process-wide settings and zone overrides.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Process-wide shipping configuration.
///
/// Mutable only by the admin surface; read-only inside settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingSettings {
    /// Subtotal at or above which base shipping is waived.
    pub free_shipping_threshold: Money,
    /// Distance within which no per-km surcharge applies.
    pub distance_free_radius_km: f64,
    /// Surcharge per kilometre beyond the free radius.
    pub per_km_rate: Money,
    /// Flat charge for orders below the free-shipping threshold.
    pub base_rate: Money,
}

impl ShippingSettings {
    /// Platform defaults, used when no configuration has been stored.
    pub fn defaults(currency: Currency) -> Self {
        Self {
            free_shipping_threshold: Money::from_major(10_000, currency),
            distance_free_radius_km: 5.0,
            per_km_rate: Money::from_major(50, currency),
            base_rate: Money::from_major(500, currency),
        }
    }
}

/// A zone-level override of the shipping settings.
///
/// Present fields override the matching settings field; absent fields
/// fall through. At most one active zone is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingZone {
    /// Zone name for display and audit.
    pub name: String,
    /// Flat charge below the free-shipping threshold.
    pub base_rate: Money,
    /// Override of the free-shipping threshold.
    pub free_shipping_threshold: Option<Money>,
    /// Override of the surcharge-free radius.
    pub distance_free_radius_km: Option<f64>,
    /// Override of the per-kilometre rate.
    pub per_km_rate: Option<Money>,
    /// Deliveries beyond this distance are charged as if at it.
    pub max_shipping_distance_km: Option<f64>,
    /// Whether this zone is considered at all.
    pub is_active: bool,
}

impl ShippingZone {
    /// Create an active zone overriding only the base rate.
    pub fn new(name: impl Into<String>, base_rate: Money) -> Self {
        Self {
            name: name.into(),
            base_rate,
            free_shipping_threshold: None,
            distance_free_radius_km: None,
            per_km_rate: None,
            max_shipping_distance_km: None,
            is_active: true,
        }
    }
}

/// Shipping parameters after zone overrides have been resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveShippingParams {
    /// Flat charge below the free-shipping threshold.
    pub base_rate: Money,
    /// Subtotal at or above which base shipping is waived.
    pub free_shipping_threshold: Money,
    /// Distance within which no per-km surcharge applies.
    pub distance_free_radius_km: f64,
    /// Surcharge per kilometre beyond the free radius.
    pub per_km_rate: Money,
    /// Distance cap, if the active zone declares one.
    pub max_shipping_distance_km: Option<f64>,
    /// Name of the zone that was applied, if any.
    pub zone: Option<String>,
}

impl EffectiveShippingParams {
    /// Merge the first active zone (if any) over the settings.
    pub fn resolve(settings: &ShippingSettings, zones: &[ShippingZone]) -> Self {
        match zones.iter().find(|z| z.is_active) {
            Some(zone) => Self {
                base_rate: zone.base_rate,
                free_shipping_threshold: zone
                    .free_shipping_threshold
                    .unwrap_or(settings.free_shipping_threshold),
                distance_free_radius_km: zone
                    .distance_free_radius_km
                    .unwrap_or(settings.distance_free_radius_km),
                per_km_rate: zone.per_km_rate.unwrap_or(settings.per_km_rate),
                max_shipping_distance_km: zone.max_shipping_distance_km,
                zone: Some(zone.name.clone()),
            },
            None => Self {
                base_rate: settings.base_rate,
                free_shipping_threshold: settings.free_shipping_threshold,
                distance_free_radius_km: settings.distance_free_radius_km,
                per_km_rate: settings.per_km_rate,
                max_shipping_distance_km: None,
                zone: None,
            },
        }
    }
}
