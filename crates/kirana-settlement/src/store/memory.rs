//! In-memory reference store.
//!
//! All mutable state sits behind one `parking_lot::Mutex`, so every
//! commit observes and updates stock, coupon usage, and the order table
//! in a single critical section. That is the serialization contract a
//! production store provides with transactions or conditional writes;
//! here it falls out of the lock.

use crate::coupon::{canonical_code, Coupon};
use crate::ids::{AttemptId, CouponId, ProductId};
use crate::money::{Currency, Money};
use crate::shipping::{ShippingSettings, ShippingZone};
use crate::checkout::{Order, OrderDraft};
use crate::store::{ProductSnapshot, SettlementStore, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, ProductSnapshot>,
    coupons: HashMap<String, Coupon>,
    settings: Option<ShippingSettings>,
    zones: Vec<ShippingZone>,
    orders: Vec<Order>,
    order_seq: u64,
    drop_next_commit_ack: bool,
}

/// In-memory [`SettlementStore`] used as the reference implementation
/// and test double.
pub struct MemoryStore {
    currency: Currency,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store for the given currency.
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed a product.
    pub fn add_product(
        &self,
        id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        price: Money,
        stock_quantity: i64,
    ) {
        let snapshot = ProductSnapshot {
            price,
            stock_quantity,
            is_active: true,
            name: name.into(),
            sku: sku.into(),
        };
        self.inner.lock().products.insert(id.into(), snapshot);
    }

    /// Activate or deactivate a seeded product.
    pub fn set_product_active(&self, id: &ProductId, is_active: bool) {
        if let Some(product) = self.inner.lock().products.get_mut(id) {
            product.is_active = is_active;
        }
    }

    /// Change a seeded product's catalog price.
    pub fn set_product_price(&self, id: &ProductId, price: Money) {
        if let Some(product) = self.inner.lock().products.get_mut(id) {
            product.price = price;
        }
    }

    /// Current stock for a product, for assertions.
    pub fn stock_of(&self, id: &ProductId) -> Option<i64> {
        self.inner.lock().products.get(id).map(|p| p.stock_quantity)
    }

    /// Seed a coupon. The code is stored canonically.
    pub fn add_coupon(&self, coupon: Coupon) {
        self.inner
            .lock()
            .coupons
            .insert(canonical_code(&coupon.code), coupon);
    }

    /// Current redemption count for a coupon code, for assertions.
    pub fn coupon_used_count(&self, code: &str) -> Option<i64> {
        self.inner
            .lock()
            .coupons
            .get(&canonical_code(code))
            .map(|c| c.used_count)
    }

    /// Configure shipping settings.
    pub fn set_shipping_settings(&self, settings: ShippingSettings) {
        self.inner.lock().settings = Some(settings);
    }

    /// Add a shipping zone.
    pub fn add_zone(&self, zone: ShippingZone) {
        self.inner.lock().zones.push(zone);
    }

    /// Number of committed orders, for assertions.
    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }

    /// Chaos hook: the next commit applies its writes but reports
    /// [`StoreError::OutcomeUnknown`], simulating a lost acknowledgement.
    pub fn drop_next_commit_ack(&self) {
        self.inner.lock().drop_next_commit_ack = true;
    }
}

impl SettlementStore for MemoryStore {
    fn shipping_config(&self) -> Result<(ShippingSettings, Vec<ShippingZone>), StoreError> {
        let inner = self.inner.lock();
        let settings = match &inner.settings {
            Some(settings) => settings.clone(),
            None => {
                tracing::warn!("no shipping settings configured, using platform defaults");
                ShippingSettings::defaults(self.currency)
            }
        };
        Ok((settings, inner.zones.clone()))
    }

    fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.inner.lock().coupons.get(&canonical_code(code)).cloned())
    }

    fn products_for_order(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSnapshot>, StoreError> {
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    fn commit_order(
        &self,
        draft: OrderDraft,
        decrements: &BTreeMap<ProductId, i64>,
        coupon: Option<&CouponId>,
    ) -> Result<Order, StoreError> {
        let mut inner = self.inner.lock();

        // A retried attempt that already landed is returned as-is, so a
        // commit is idempotent per attempt id.
        if let Some(existing) = inner
            .orders
            .iter()
            .find(|o| o.attempt_id == draft.attempt_id)
        {
            return Ok(existing.clone());
        }

        // Check every write before applying any of them.
        for (product_id, quantity) in decrements {
            let available = inner
                .products
                .get(product_id)
                .map(|p| p.stock_quantity)
                .unwrap_or(0);
            if available < *quantity {
                return Err(StoreError::StockConflict {
                    product_id: product_id.clone(),
                    requested: *quantity,
                    available,
                });
            }
        }
        if let Some(coupon_id) = coupon {
            let coupon = inner
                .coupons
                .values()
                .find(|c| &c.id == coupon_id)
                .ok_or_else(|| StoreError::Unavailable(format!("coupon {coupon_id} vanished")))?;
            if coupon.is_exhausted() {
                return Err(StoreError::CouponExhausted {
                    code: coupon.code.clone(),
                });
            }
        }

        for (product_id, quantity) in decrements {
            if let Some(product) = inner.products.get_mut(product_id) {
                product.stock_quantity -= quantity;
            }
        }
        if let Some(coupon_id) = coupon {
            if let Some(coupon) = inner.coupons.values_mut().find(|c| &c.id == coupon_id) {
                coupon.record_usage();
            }
        }

        inner.order_seq += 1;
        let order_number = format!("ORD-{:06}", inner.order_seq);
        let order = draft.into_order(order_number);
        inner.orders.push(order.clone());

        if inner.drop_next_commit_ack {
            inner.drop_next_commit_ack = false;
            return Err(StoreError::OutcomeUnknown(
                "commit acknowledgement lost".to_string(),
            ));
        }

        Ok(order)
    }

    fn order_by_attempt(&self, attempt_id: &AttemptId) -> Result<Option<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .orders
            .iter()
            .find(|o| &o.attempt_id == attempt_id)
            .cloned())
    }
}
