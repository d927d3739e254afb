//! Order settlement.
//!
//! Turns a proposed cart into a priced, stock-checked, atomically
//! committed order. Prices and stock are re-read from the store, the
//! coupon is re-validated against live state, shipping is computed from
//! the resolved subtotal, and the commit either lands whole or not at
//! all. A commit-time race is retried from the re-pricing step, so the
//! loser of a race for the last unit reports insufficient stock from a
//! fresh read rather than a spurious conflict.

use crate::checkout::{aggregate_lines, Address, CartLine, CustomerIdentity, Order, OrderDraft, OrderItem};
use crate::coupon::{assess, canonical_code, Coupon};
use crate::error::{SettlementError, StockShortfall};
use crate::ids::{AttemptId, CouponId, ProductId};
use crate::money::{Currency, Money};
use crate::shipping::compute_shipping;
use crate::store::{ProductSnapshot, SettlementStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Default number of times a commit-time race is retried from the
/// re-pricing step before giving up.
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// Phases of a single settlement attempt. Terminal success is
/// `Persisted`; any phase can abort with an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementPhase {
    /// Input validated, nothing read yet.
    Started,
    /// Authoritative prices and availability in hand.
    PricesResolved,
    /// Every line covered by current stock.
    StockReserved,
    /// Subtotal, discount, shipping, tax, and total computed.
    Priced,
    /// Order committed.
    Persisted,
}

impl SettlementPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementPhase::Started => "started",
            SettlementPhase::PricesResolved => "prices_resolved",
            SettlementPhase::StockReserved => "stock_reserved",
            SettlementPhase::Priced => "priced",
            SettlementPhase::Persisted => "persisted",
        }
    }
}

/// A settlement request: the cart, the destination, and an idempotency
/// key for safe retry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementRequest {
    /// Client-generated idempotency key for this attempt.
    pub attempt_id: AttemptId,
    /// Who is buying.
    pub customer: CustomerIdentity,
    /// Proposed cart lines.
    pub lines: Vec<CartLine>,
    /// Delivery address.
    pub shipping_address: Address,
    /// Delivery distance in kilometres.
    pub distance_km: f64,
    /// Optional coupon code, any case.
    pub coupon_code: Option<String>,
}

impl SettlementRequest {
    /// Create a request with a fresh attempt id.
    pub fn new(
        customer: CustomerIdentity,
        lines: Vec<CartLine>,
        shipping_address: Address,
        distance_km: f64,
    ) -> Self {
        Self {
            attempt_id: AttemptId::generate(),
            customer,
            lines,
            shipping_address,
            distance_km,
            coupon_code: None,
        }
    }

    /// Attach a coupon code.
    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    /// Use a caller-managed idempotency key (for retries).
    pub fn with_attempt_id(mut self, attempt_id: AttemptId) -> Self {
        self.attempt_id = attempt_id;
        self
    }

    /// Reject malformed input before any store access.
    fn validate(&self) -> Result<(), SettlementError> {
        if self.distance_km < 0.0 || self.distance_km.is_nan() {
            return Err(SettlementError::NegativeDistance(self.distance_km));
        }
        self.shipping_address.validate()?;
        self.customer.validate()?;
        Ok(())
    }
}

/// Coordinates a settlement attempt end to end against a
/// [`SettlementStore`].
pub struct SettlementCoordinator<S: SettlementStore> {
    store: S,
    tax_percent: f64,
    commit_retries: u32,
}

impl<S: SettlementStore> SettlementCoordinator<S> {
    /// Create a coordinator with no tax and default retry bounds.
    pub fn new(store: S) -> Self {
        Self {
            store,
            tax_percent: 0.0,
            commit_retries: DEFAULT_COMMIT_RETRIES,
        }
    }

    /// Charge tax as a percentage of the subtotal.
    pub fn with_tax_percent(mut self, tax_percent: f64) -> Self {
        self.tax_percent = tax_percent;
        self
    }

    /// Bound commit-race retries.
    pub fn with_commit_retries(mut self, retries: u32) -> Self {
        self.commit_retries = retries;
        self
    }

    /// Settle a cart into a committed order, or abort with no side
    /// effects. Re-submitting with the same attempt id after an
    /// indeterminate failure returns the original order.
    pub fn settle(&self, request: SettlementRequest) -> Result<Order, SettlementError> {
        request.validate()?;
        let wanted = aggregate_lines(&request.lines)?;

        // A previous attempt with this key may have committed without
        // the caller learning of it.
        if let Some(existing) = self
            .store
            .order_by_attempt(&request.attempt_id)
            .map_err(read_failure)?
        {
            info!(
                order_number = %existing.order_number,
                "settlement attempt already committed, returning original order"
            );
            return Ok(existing);
        }

        let mut tries = self.commit_retries + 1;
        loop {
            match self.settle_once(&request, &wanted) {
                Err(SettlementError::ConcurrencyConflict(detail)) if tries > 1 => {
                    tries -= 1;
                    warn!(detail = %detail, tries_left = tries, "commit raced, re-checking");
                }
                outcome => return outcome,
            }
        }
    }

    /// One pass through the settlement pipeline.
    fn settle_once(
        &self,
        request: &SettlementRequest,
        wanted: &BTreeMap<ProductId, i64>,
    ) -> Result<Order, SettlementError> {
        debug!(phase = SettlementPhase::Started.as_str(), attempt = %request.attempt_id, "settling");

        // Re-read authoritative price and stock for every product.
        let ids: Vec<ProductId> = wanted.keys().cloned().collect();
        let snapshots = self.store.products_for_order(&ids).map_err(read_failure)?;

        let mut currency: Option<Currency> = None;
        for (product_id, _) in wanted.iter() {
            let snapshot = snapshots
                .get(product_id)
                .filter(|s| s.is_active)
                .ok_or_else(|| SettlementError::ProductUnavailable {
                    product_id: product_id.clone(),
                })?;
            match currency {
                None => currency = Some(snapshot.price.currency),
                Some(expected) if expected != snapshot.price.currency => {
                    return Err(SettlementError::CurrencyMismatch {
                        expected,
                        got: snapshot.price.currency,
                    });
                }
                Some(_) => {}
            }
        }
        let currency = currency.ok_or(SettlementError::EmptyCart)?;
        debug!(phase = SettlementPhase::PricesResolved.as_str(), products = wanted.len(), "prices resolved");

        // Partial fulfillment is not permitted: one short line aborts
        // the whole settlement.
        let shortfalls: Vec<StockShortfall> = wanted
            .iter()
            .filter_map(|(product_id, quantity)| {
                let snapshot = &snapshots[product_id];
                (snapshot.stock_quantity < *quantity).then(|| StockShortfall {
                    product_id: product_id.clone(),
                    requested: *quantity,
                    available: snapshot.stock_quantity,
                })
            })
            .collect();
        if !shortfalls.is_empty() {
            return Err(SettlementError::InsufficientStock { shortfalls });
        }
        debug!(phase = SettlementPhase::StockReserved.as_str(), "stock covered");

        let subtotal = self.subtotal(wanted, &snapshots, currency)?;

        // Re-validate the coupon against live state and the computed
        // subtotal; eligibility may have changed since the code was
        // entered.
        let (discount, applied_coupon) = match &request.coupon_code {
            Some(code) => self.apply_coupon(code, subtotal)?,
            None => (Money::zero(currency), None),
        };

        let (settings, zones) = self.store.shipping_config().map_err(read_failure)?;
        let shipping = compute_shipping(subtotal, request.distance_km, &settings, &zones)?;

        let tax_amount = subtotal.percentage(self.tax_percent);
        let gross = subtotal
            .checked_add(&tax_amount)
            .and_then(|m| m.checked_add(&shipping.amount))
            .ok_or(SettlementError::Overflow)?;
        let total_amount = gross
            .try_subtract(&discount)
            .ok_or(SettlementError::CurrencyMismatch {
                expected: currency,
                got: discount.currency,
            })?
            .clamp_non_negative();
        debug!(
            phase = SettlementPhase::Priced.as_str(),
            subtotal = subtotal.amount_minor,
            shipping = shipping.amount.amount_minor,
            tax = tax_amount.amount_minor,
            discount = discount.amount_minor,
            total = total_amount.amount_minor,
            "priced"
        );

        let items = wanted
            .iter()
            .map(|(product_id, quantity)| {
                let snapshot = &snapshots[product_id];
                OrderItem::capture(
                    product_id.clone(),
                    snapshot.name.clone(),
                    snapshot.sku.clone(),
                    *quantity,
                    snapshot.price,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let draft = OrderDraft {
            attempt_id: request.attempt_id.clone(),
            customer: request.customer.clone(),
            shipping_address: request.shipping_address.clone(),
            items,
            coupon_code: applied_coupon.as_ref().map(|(_, code)| code.clone()),
            currency,
            subtotal,
            tax_amount,
            shipping_amount: shipping.amount,
            discount_amount: discount,
            total_amount,
        };

        let coupon_id = applied_coupon.as_ref().map(|(id, _)| id);
        match self.store.commit_order(draft, wanted, coupon_id) {
            Ok(order) => {
                info!(
                    phase = SettlementPhase::Persisted.as_str(),
                    order_number = %order.order_number,
                    total = order.total_amount.amount_minor,
                    "order committed"
                );
                Ok(order)
            }
            Err(StoreError::StockConflict {
                product_id,
                requested,
                available,
            }) => Err(SettlementError::ConcurrencyConflict(format!(
                "stock changed under commit for {product_id}: requested {requested}, available {available}"
            ))),
            Err(StoreError::CouponExhausted { code }) => Err(
                SettlementError::ConcurrencyConflict(format!(
                    "coupon {code} exhausted under commit"
                )),
            ),
            Err(StoreError::OutcomeUnknown(detail)) => self.reconcile(request, detail),
            Err(StoreError::Unavailable(detail)) => Err(SettlementError::PersistenceFailure {
                detail,
                outcome_known: true,
            }),
        }
    }

    /// Resolve an indeterminate commit by re-querying the attempt id
    /// before reporting failure, so a client retry cannot duplicate the
    /// order.
    fn reconcile(
        &self,
        request: &SettlementRequest,
        detail: String,
    ) -> Result<Order, SettlementError> {
        warn!(detail = %detail, attempt = %request.attempt_id, "commit outcome unknown, reconciling");
        match self.store.order_by_attempt(&request.attempt_id) {
            Ok(Some(order)) => {
                info!(order_number = %order.order_number, "commit had landed");
                Ok(order)
            }
            Ok(None) => Err(SettlementError::PersistenceFailure {
                detail,
                outcome_known: false,
            }),
            Err(_) => Err(SettlementError::PersistenceFailure {
                detail,
                outcome_known: false,
            }),
        }
    }

    fn subtotal(
        &self,
        wanted: &BTreeMap<ProductId, i64>,
        snapshots: &std::collections::HashMap<ProductId, ProductSnapshot>,
        currency: Currency,
    ) -> Result<Money, SettlementError> {
        let mut subtotal = Money::zero(currency);
        for (product_id, quantity) in wanted {
            let line_total = snapshots[product_id]
                .price
                .checked_mul(*quantity)
                .ok_or(SettlementError::Overflow)?;
            subtotal = subtotal
                .checked_add(&line_total)
                .ok_or(SettlementError::Overflow)?;
        }
        Ok(subtotal)
    }

    fn apply_coupon(
        &self,
        code: &str,
        subtotal: Money,
    ) -> Result<(Money, Option<(CouponId, String)>), SettlementError> {
        let canonical = canonical_code(code);
        let coupon = match self.store.coupon_by_code(&canonical).map_err(read_failure)? {
            Some(coupon) => coupon,
            None => {
                return Err(SettlementError::CouponInvalid {
                    code: canonical,
                    reason: crate::coupon::CouponRejection::UnknownCode,
                })
            }
        };
        check_coupon_currency(&coupon, subtotal.currency)?;

        let discount = assess(Some(&coupon), subtotal).map_err(|reason| {
            SettlementError::CouponInvalid {
                code: canonical.clone(),
                reason,
            }
        })?;
        Ok((discount, Some((coupon.id, canonical))))
    }
}

/// Money fields on a coupon must share the order currency, or the caps
/// cannot be compared.
fn check_coupon_currency(coupon: &Coupon, expected: Currency) -> Result<(), SettlementError> {
    let fields = [
        match &coupon.value {
            crate::coupon::DiscountValue::Fixed(amount) => Some(*amount),
            crate::coupon::DiscountValue::Percentage(_) => None,
        },
        coupon.minimum_order_amount,
        coupon.maximum_discount,
    ];
    for field in fields.into_iter().flatten() {
        if field.currency != expected {
            return Err(SettlementError::CurrencyMismatch {
                expected,
                got: field.currency,
            });
        }
    }
    Ok(())
}

/// A failed store read is a determinate failure: nothing was written.
fn read_failure(err: StoreError) -> SettlementError {
    SettlementError::PersistenceFailure {
        detail: err.to_string(),
        outcome_known: true,
    }
}
