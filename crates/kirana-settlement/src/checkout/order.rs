//! Order types.

use crate::checkout::Address;
use crate::error::SettlementError;
use crate::ids::{AttemptId, OrderId, OrderItemId, ProductId, UserId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Order status. Settlement only ever creates `Pending` orders; the
/// remaining transitions belong to fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed, awaiting processing.
    #[default]
    Pending,
    /// Order confirmed and processing.
    Confirmed,
    /// Order being prepared.
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
    /// Order refunded.
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Check if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Check if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }
}

/// Payment status, independent of the order status. The payment gateway
/// flips this after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Payment pending.
    #[default]
    Pending,
    /// Payment authorized but not captured.
    Authorized,
    /// Payment captured.
    Paid,
    /// Partially refunded.
    PartiallyRefunded,
    /// Fully refunded.
    Refunded,
    /// Payment voided.
    Voided,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Paid => "paid",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Voided => "voided",
        }
    }
}

/// Who is placing the order: a registered user or a guest identified by
/// email. Exactly one of the two, by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CustomerIdentity {
    /// A registered user.
    Registered(UserId),
    /// A guest checkout, identified by email.
    Guest(String),
}

impl CustomerIdentity {
    /// Guest checkout with a shape-checked email.
    pub fn guest(email: impl Into<String>) -> Self {
        Self::Guest(email.into())
    }

    /// The user id, for registered customers.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            CustomerIdentity::Registered(id) => Some(id),
            CustomerIdentity::Guest(_) => None,
        }
    }

    /// The guest email, for guest checkouts.
    pub fn guest_email(&self) -> Option<&str> {
        match self {
            CustomerIdentity::Registered(_) => None,
            CustomerIdentity::Guest(email) => Some(email),
        }
    }

    /// Reject a malformed guest email before any store access.
    pub fn validate(&self) -> Result<(), SettlementError> {
        if let CustomerIdentity::Guest(email) = self {
            let well_formed = email
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            if !well_formed {
                return Err(SettlementError::InvalidGuestEmail(email.clone()));
            }
        }
        Ok(())
    }
}

/// A line of a committed order. Immutable once created: `unit_price` is
/// the catalog price captured at settlement time, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Unique line identifier.
    pub id: OrderItemId,
    /// Product ordered.
    pub product_id: ProductId,
    /// Product name at time of order.
    pub product_name: String,
    /// SKU at time of order.
    pub product_sku: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at time of order.
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub total_price: Money,
}

impl OrderItem {
    /// Capture a line at settlement time.
    pub fn capture(
        product_id: ProductId,
        product_name: impl Into<String>,
        product_sku: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Result<Self, SettlementError> {
        let total_price = unit_price
            .checked_mul(quantity)
            .ok_or(SettlementError::Overflow)?;
        Ok(Self {
            id: OrderItemId::generate(),
            product_id,
            product_name: product_name.into(),
            product_sku: product_sku.into(),
            quantity,
            unit_price,
            total_price,
        })
    }
}

/// Everything the atomic commit needs to persist an order. The store
/// assigns the order id, order number, and creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDraft {
    /// Client-supplied idempotency key for this settlement attempt.
    pub attempt_id: AttemptId,
    /// Who is buying.
    pub customer: CustomerIdentity,
    /// Delivery address.
    pub shipping_address: Address,
    /// Captured line items.
    pub items: Vec<OrderItem>,
    /// Coupon code applied, canonical uppercase.
    pub coupon_code: Option<String>,
    /// Order currency.
    pub currency: Currency,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Tax charged.
    pub tax_amount: Money,
    /// Shipping charged.
    pub shipping_amount: Money,
    /// Discount applied.
    pub discount_amount: Money,
    /// `subtotal + tax + shipping − discount`, clamped ≥ 0.
    pub total_amount: Money,
}

impl OrderDraft {
    /// Materialize the committed order. Called by the store inside its
    /// atomic commit, with the order number it allocated.
    pub fn into_order(self, order_number: impl Into<String>) -> Order {
        Order {
            id: OrderId::generate(),
            order_number: order_number.into(),
            attempt_id: self.attempt_id,
            customer: self.customer,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            items: self.items,
            shipping_address: self.shipping_address,
            coupon_code: self.coupon_code,
            currency: self.currency,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            tracking_number: None,
            created_at: current_timestamp(),
            shipped_at: None,
            delivered_at: None,
        }
    }
}

/// A committed order. Created atomically with its items; afterwards only
/// the status fields and fulfillment stamps are touched, by external
/// collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number, unique per store.
    pub order_number: String,
    /// Idempotency key of the settlement attempt that created this order.
    pub attempt_id: AttemptId,
    /// Who bought.
    pub customer: CustomerIdentity,
    /// Order status.
    pub status: OrderStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Items in the order.
    pub items: Vec<OrderItem>,
    /// Delivery address.
    pub shipping_address: Address,
    /// Coupon code applied, if any.
    pub coupon_code: Option<String>,
    /// Order currency.
    pub currency: Currency,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Tax charged.
    pub tax_amount: Money,
    /// Shipping charged.
    pub shipping_amount: Money,
    /// Discount applied.
    pub discount_amount: Money,
    /// Grand total.
    pub total_amount: Money,
    /// Carrier tracking number, set by fulfillment.
    pub tracking_number: Option<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp when shipped, set by fulfillment.
    pub shipped_at: Option<i64>,
    /// Unix timestamp when delivered, set by fulfillment.
    pub delivered_at: Option<i64>,
}

impl Order {
    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if the order is paid.
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded
        )
    }

    /// Verify the totals invariant:
    /// `total = subtotal + tax + shipping − discount`, clamped ≥ 0, and
    /// every line's `total_price = unit_price × quantity`.
    pub fn verify_totals(&self) -> bool {
        let expected = self.subtotal.amount_minor
            + self.tax_amount.amount_minor
            + self.shipping_amount.amount_minor
            - self.discount_amount.amount_minor;
        if self.total_amount.amount_minor != expected.max(0) {
            return false;
        }
        if self.total_amount.is_negative() {
            return false;
        }
        self.items
            .iter()
            .all(|i| i.total_price.amount_minor == i.unit_price.amount_minor * i.quantity)
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

    fn inr(major: i64) -> Money {
        Money::from_major(major, Currency::INR)
    }

    fn draft() -> OrderDraft {
        let item = OrderItem::capture(
            ProductId::new("p-1"),
            "Basmati Rice 5kg",
            "SKU-RICE-5",
            2,
            inr(600),
        )
        .unwrap();
        OrderDraft {
            attempt_id: AttemptId::generate(),
            customer: CustomerIdentity::guest("a.rao@example.com"),
            shipping_address: Address::new("A. Rao", "12 MG Road", "Bengaluru", "560001", "India"),
            items: vec![item],
            coupon_code: None,
            currency: Currency::INR,
            subtotal: inr(1_200),
            tax_amount: inr(0),
            shipping_amount: inr(500),
            discount_amount: inr(100),
            total_amount: inr(1_600),
        }
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }

    #[test]
    fn test_identity_exactly_one_of() {
        let user = CustomerIdentity::Registered(UserId::new("u-1"));
        assert!(user.user_id().is_some());
        assert!(user.guest_email().is_none());

        let guest = CustomerIdentity::guest("a@b.com");
        assert!(guest.user_id().is_none());
        assert_eq!(guest.guest_email(), Some("a@b.com"));
    }

    #[test]
    fn test_guest_email_validation() {
        assert!(CustomerIdentity::guest("a.rao@example.com").validate().is_ok());
        assert!(CustomerIdentity::guest("not-an-email").validate().is_err());
        assert!(CustomerIdentity::guest("@example.com").validate().is_err());
        assert!(CustomerIdentity::Registered(UserId::new("u-1"))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_order_item_capture() {
        let item = OrderItem::capture(ProductId::new("p-1"), "Tea", "SKU-TEA", 3, inr(150)).unwrap();
        assert_eq!(item.total_price, inr(450));
    }

    #[test]
    fn test_order_item_capture_overflow() {
        let item = OrderItem::capture(
            ProductId::new("p-1"),
            "Tea",
            "SKU-TEA",
            i64::MAX,
            Money::new(2, Currency::INR),
        );
        assert_eq!(item.unwrap_err(), SettlementError::Overflow);
    }

    #[test]
    fn test_into_order_is_pending() {
        let order = draft().into_order("ORD-000042");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.order_number, "ORD-000042");
        assert_eq!(order.item_count(), 2);
        assert!(order.verify_totals());
    }

    #[test]
    fn test_verify_totals_catches_drift() {
        let mut order = draft().into_order("ORD-000043");
        order.total_amount = inr(9_999);
        assert!(!order.verify_totals());
    }
}
