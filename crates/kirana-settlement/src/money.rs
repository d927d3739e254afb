//! Money type for representing monetary values.
//!
//! Amounts are stored in the currency's minor unit (paise for INR, cents
//! for USD) as signed integers, so all settlement arithmetic is exact.
//! The single place rounding happens is when a fractional factor is
//! applied (percentage discounts, per-kilometre surcharges), and that
//! rounding is always round-half-up, applied once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Get the currency code (e.g., "INR").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// Get the currency symbol (e.g., "₹").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "\u{20b9}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "INR" => Some(Currency::INR),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Stored in the smallest unit of the currency (e.g., paise for INR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in smallest currency unit (e.g., paise).
    pub amount_minor: i64,
    /// The currency.
    pub currency: Currency,
}

/// Round a non-negative fractional minor-unit amount half-up.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Create a Money value from whole major units (e.g., rupees).
    ///
    /// ```
    /// use kirana_settlement::money::{Currency, Money};
    /// let price = Money::from_major(500, Currency::INR);
    /// assert_eq!(price.amount_minor, 50_000);
    /// ```
    pub fn from_major(amount: i64, currency: Currency) -> Self {
        let multiplier = 10_i64.pow(currency.decimal_places());
        Self::new(amount * multiplier, currency)
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Check if this is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Try to add another Money value, returning None if currencies differ.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_minor + other.amount_minor,
            self.currency,
        ))
    }

    /// Try to subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_minor - other.amount_minor,
            self.currency,
        ))
    }

    /// Multiply by a quantity, returning None on overflow.
    pub fn checked_mul(&self, factor: i64) -> Option<Money> {
        self.amount_minor
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Add, returning None on overflow. Currencies must match.
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Calculate a percentage of this amount, rounding half-up once.
    ///
    /// The percentage is resolved to basis points so the computation stays
    /// in integer arithmetic.
    pub fn percentage(&self, percent: f64) -> Money {
        let basis_points = (percent * 100.0).round() as i128;
        let scaled = self.amount_minor as i128 * basis_points;
        // Round half-up: floor((x + 5000) / 10000) for non-negative x.
        let amount = (scaled + 5_000).div_euclid(10_000) as i64;
        Money::new(amount, self.currency)
    }

    /// Scale by a non-negative fractional factor, rounding half-up once.
    ///
    /// Used for distance-based charges (rate × kilometres).
    pub fn scale_half_up(&self, factor: f64) -> Money {
        let amount = round_half_up(self.amount_minor as f64 * factor);
        Money::new(amount, self.currency)
    }

    /// Clamp a negative amount to zero.
    pub fn clamp_non_negative(&self) -> Money {
        Money::new(self.amount_minor.max(0), self.currency)
    }

    /// Format as a display string (e.g., "₹499.00").
    pub fn display(&self) -> String {
        let divisor = 10_i64.pow(self.currency.decimal_places()) as f64;
        let places = self.currency.decimal_places() as usize;
        format!(
            "{}{:.places$}",
            self.currency.symbol(),
            self.amount_minor as f64 / divisor
        )
    }
}

impl Add for Money {
    type Output = Money;

    /// # Panics
    /// Panics if currencies don't match. Use `try_add` for fallible addition.
    fn add(self, other: Money) -> Money {
        self.try_add(&other).expect("currency mismatch in addition")
    }
}

impl Sub for Money {
    type Output = Money;

    /// # Panics
    /// Panics if currencies don't match.
    fn sub(self, other: Money) -> Money {
        self.try_subtract(&other)
            .expect("currency mismatch in subtraction")
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, factor: i64) -> Money {
        Money::new(self.amount_minor * factor, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
