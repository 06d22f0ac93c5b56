use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from whole major units.
    ///
    /// The cents portion is calculated as units * 100.
    pub fn from_major(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Converts a decimal amount (e.g. a price read from storage) to Money,
    /// rounding to the nearest cent.
    ///
    /// Returns `None` for non-finite input. Negative amounts are preserved;
    /// rejecting them is a normalization policy, not a Money invariant.
    pub fn try_from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self {
            cents: (value * 100.0).round() as i64,
        })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a decimal value.
    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Returns the major-unit portion (whole number).
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after major units).
    pub fn subunits(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, saturating on overflow.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(quantity as i64),
        }
    }

    /// Subtracts another amount, clamping the result at zero.
    pub fn saturating_sub_to_zero(&self, other: Money) -> Money {
        Money {
            cents: (self.cents - other.cents).max(0),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.units().abs(), self.subunits())
        } else {
            write!(f, "{}.{:02}", self.units(), self.subunits())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

/// Normalized 3-letter uppercase currency code.
///
/// Construction always normalizes: input is trimmed, uppercased, and
/// truncated to 3 characters; anything shorter than 3 characters falls back
/// to the default `EUR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// The storefront default currency.
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// Normalizes a raw currency string into a 3-letter uppercase code.
    pub fn normalize(raw: &str) -> Self {
        let cleaned: String = raw.trim().chars().take(3).collect::<String>().to_uppercase();
        if cleaned.chars().count() < 3 {
            Self::eur()
        } else {
            Self(cleaned)
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::eur()
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shopper locale tag (e.g. `en`, `es`), lowercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Creates a locale from a raw tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_lowercase())
    }

    /// Returns the locale tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats an amount with its currency symbol, falling back to a code
/// suffix for currencies without a dedicated symbol.
pub fn format_money(amount: Money, currency: &CurrencyCode) -> String {
    match currency.as_str() {
        "EUR" => format!("€{amount}"),
        "USD" => format!("${amount}"),
        "GBP" => format!("£{amount}"),
        _ => format!("{amount} {currency}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.subunits(), 34);
    }

    #[test]
    fn test_money_from_major() {
        let money = Money::from_major(50);
        assert_eq!(money.cents(), 5000);
    }

    #[test]
    fn test_money_try_from_decimal_rounds_to_cents() {
        assert_eq!(Money::try_from_decimal(10.004).unwrap().cents(), 1000);
        assert_eq!(Money::try_from_decimal(10.005).unwrap().cents(), 1001);
        assert_eq!(Money::try_from_decimal(0.0).unwrap().cents(), 0);
    }

    #[test]
    fn test_money_try_from_decimal_rejects_non_finite() {
        assert!(Money::try_from_decimal(f64::NAN).is_none());
        assert!(Money::try_from_decimal(f64::INFINITY).is_none());
        assert!(Money::try_from_decimal(f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(100).to_string(), "1.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn test_money_saturating_sub_to_zero() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(1500);
        assert_eq!(a.saturating_sub_to_zero(b), Money::zero());
        assert_eq!(b.saturating_sub_to_zero(a).cents(), 500);
    }

    #[test]
    fn test_money_comparison() {
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(0).is_zero());
        assert!(Money::from_cents(-100).is_negative());
    }

    #[test]
    fn test_currency_normalize_uppercases() {
        assert_eq!(CurrencyCode::normalize("eur").as_str(), "EUR");
        assert_eq!(CurrencyCode::normalize(" usd ").as_str(), "USD");
    }

    #[test]
    fn test_currency_normalize_truncates() {
        assert_eq!(CurrencyCode::normalize("euros").as_str(), "EUR");
    }

    #[test]
    fn test_currency_normalize_defaults_short_input() {
        assert_eq!(CurrencyCode::normalize("").as_str(), "EUR");
        assert_eq!(CurrencyCode::normalize("eu").as_str(), "EUR");
    }

    #[test]
    fn test_locale_normalizes_case() {
        assert_eq!(Locale::new(" EN ").as_str(), "en");
        assert_eq!(Locale::default().as_str(), "en");
    }

    #[test]
    fn test_format_money_known_symbols() {
        assert_eq!(
            format_money(Money::from_cents(1234), &CurrencyCode::eur()),
            "€12.34"
        );
        assert_eq!(
            format_money(Money::from_cents(1234), &CurrencyCode::normalize("usd")),
            "$12.34"
        );
        assert_eq!(
            format_money(Money::from_cents(1234), &CurrencyCode::normalize("sek")),
            "12.34 SEK"
        );
    }

    #[test]
    fn test_money_serialization_roundtrip() {
        let money = Money::from_cents(999);
        let json = serde_json::to_string(&money).unwrap();
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, deserialized);
    }
}
