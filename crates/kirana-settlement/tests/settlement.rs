//! End-to-end settlement tests, including the serialization guarantees:
//! no overselling and no coupon over-redemption under concurrent
//! settlement attempts.

use kirana_settlement::prelude::*;
use std::sync::Arc;
use std::thread;

fn inr(major: i64) -> Money {
    Money::from_major(major, Currency::INR)
}

fn address() -> Address {
    Address::new("A. Rao", "12 MG Road", "Bengaluru", "560001", "India")
}

fn guest(n: usize) -> CustomerIdentity {
    CustomerIdentity::guest(format!("buyer{n}@example.com"))
}

fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[test]
fn settles_cart_with_coupon_shipping_and_tax() {
    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 50);
    store.add_product("p-oil", "Groundnut Oil 2L", "SKU-OIL-2", inr(400), 50);
    store.add_coupon(Coupon::percentage("SAVE10", 10.0).with_maximum_discount(inr(500)));

    let coordinator = SettlementCoordinator::new(store.clone()).with_tax_percent(5.0);

    // Subtotal 10×600 + 5×400 = ₹8,000, below the ₹10,000 threshold;
    // 8 km against the 5 km radius: ₹500 base + 3×₹50 = ₹650 shipping.
    // SAVE10 gives min(₹800, ₹500) = ₹500 off. Tax 5% of ₹8,000 = ₹400.
    let request = SettlementRequest::new(
        guest(1),
        vec![CartLine::new("p-rice", 10), CartLine::new("p-oil", 5)],
        address(),
        8.0,
    )
    .with_coupon("Save10");

    let order = coordinator.settle(request).expect("settlement succeeds");
    assert_eq!(order.subtotal, inr(8_000));
    assert_eq!(order.shipping_amount, inr(650));
    assert_eq!(order.discount_amount, inr(500));
    assert_eq!(order.tax_amount, inr(400));
    assert_eq!(order.total_amount, inr(8_550));
    assert!(order.verify_totals());

    // The committed writes all landed together.
    assert_eq!(store.stock_of(&ProductId::new("p-rice")), Some(40));
    assert_eq!(store.stock_of(&ProductId::new("p-oil")), Some(45));
    assert_eq!(store.coupon_used_count("SAVE10"), Some(1));
}

#[test]
fn free_shipping_over_threshold_within_radius() {
    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 50);
    let coordinator = SettlementCoordinator::new(store);

    // 20 × ₹600 = ₹12,000 over the threshold, 3 km inside the radius.
    let request = SettlementRequest::new(
        guest(1),
        vec![CartLine::new("p-rice", 20)],
        address(),
        3.0,
    );
    let order = coordinator.settle(request).unwrap();
    assert_eq!(order.shipping_amount, inr(0));
    assert_eq!(order.total_amount, inr(12_000));
}

#[test]
fn expired_coupon_always_aborts() {
    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 50);
    store.add_coupon(Coupon::percentage("OLD10", 10.0).expiring_at(unix_now() - 3_600));
    let coordinator = SettlementCoordinator::new(store.clone());

    // Subtotal large or small, an expired coupon is rejected.
    for quantity in [1, 30] {
        let request = SettlementRequest::new(
            guest(1),
            vec![CartLine::new("p-rice", quantity)],
            address(),
            1.0,
        )
        .with_coupon("OLD10");

        match coordinator.settle(request) {
            Err(SettlementError::CouponInvalid { reason, .. }) => {
                assert_eq!(reason, CouponRejection::Expired);
            }
            other => panic!("expected CouponInvalid, got {other:?}"),
        }
    }
    assert_eq!(store.order_count(), 0);
    assert_eq!(store.stock_of(&ProductId::new("p-rice")), Some(50));
}

#[test]
fn last_unit_has_exactly_one_winner() {
    const CONTENDERS: usize = 8;

    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-last", "Pressure Cooker 5L", "SKU-COOK-5", inr(2_500), 1);
    let coordinator = Arc::new(SettlementCoordinator::new(store.clone()));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let request = SettlementRequest::new(
                    guest(n),
                    vec![CartLine::new("p-last", 1)],
                    address(),
                    2.0,
                );
                coordinator.settle(request)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    let stockouts = outcomes
        .iter()
        .filter(|o| matches!(o, Err(SettlementError::InsufficientStock { .. })))
        .count();

    assert_eq!(successes, 1, "exactly one contender wins the last unit");
    assert_eq!(stockouts, CONTENDERS - 1);
    assert_eq!(store.stock_of(&ProductId::new("p-last")), Some(0));
    assert_eq!(store.order_count(), 1);
}

#[test]
fn coupon_usage_limit_has_exactly_one_winner() {
    const CONTENDERS: usize = 6;

    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 100);
    store.add_coupon(Coupon::fixed("ONCE", inr(100)).with_usage_limit(1));
    let coordinator = Arc::new(SettlementCoordinator::new(store.clone()));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|n| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let request = SettlementRequest::new(
                    guest(n),
                    vec![CartLine::new("p-rice", 1)],
                    address(),
                    2.0,
                )
                .with_coupon("ONCE");
                coordinator.settle(request)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    let rejected = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                Err(SettlementError::CouponInvalid {
                    reason: CouponRejection::UsageExhausted,
                    ..
                })
            )
        })
        .count();

    assert_eq!(successes, 1, "the coupon is redeemed exactly once");
    assert_eq!(rejected, CONTENDERS - 1);
    assert_eq!(store.coupon_used_count("ONCE"), Some(1));
}

#[test]
fn indeterminate_commit_resolves_without_duplicates() {
    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 10);
    let coordinator = SettlementCoordinator::new(store.clone());

    // First call: commit lands but the ack is lost; the coordinator
    // reconciles by attempt id and still returns the order.
    store.drop_next_commit_ack();
    let attempt = AttemptId::generate();
    let request = SettlementRequest::new(
        guest(1),
        vec![CartLine::new("p-rice", 2)],
        address(),
        2.0,
    )
    .with_attempt_id(attempt.clone());

    let first = coordinator.settle(request.clone()).expect("reconciled");

    // Client-side retry with the same idempotency key: same order back,
    // no second decrement.
    let second = coordinator.settle(request).expect("idempotent retry");
    assert_eq!(first.id, second.id);
    assert_eq!(first.order_number, second.order_number);
    assert_eq!(store.order_count(), 1);
    assert_eq!(store.stock_of(&ProductId::new("p-rice")), Some(8));
}

#[test]
fn zone_override_shapes_the_quote() {
    let store = Arc::new(MemoryStore::new(Currency::INR));
    store.add_product("p-rice", "Basmati Rice 5kg", "SKU-RICE-5", inr(600), 50);

    let mut zone = ShippingZone::new("hill-stations", inr(900));
    zone.per_km_rate = Some(inr(80));
    zone.max_shipping_distance_km = Some(20.0);
    store.add_zone(zone);

    let coordinator = SettlementCoordinator::new(store);
    // Below threshold, 60 km clamps to 20: ₹900 + (20 − 5) × ₹80 = ₹2,100.
    let request = SettlementRequest::new(
        guest(1),
        vec![CartLine::new("p-rice", 1)],
        address(),
        60.0,
    );
    let order = coordinator.settle(request).unwrap();
    assert_eq!(order.shipping_amount, inr(2_100));
}
