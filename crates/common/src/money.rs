//! Currency-tagged money amounts.

use serde::{Deserialize, Serialize};

/// An amount in minor units tagged with a currency code.
///
/// Arithmetic never converts between currencies; callers are expected to
/// check [`Money::same_currency`] before combining two values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
}

impl Money {
    /// Creates a money value.
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Returns true if both values carry the same currency code.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Multiplies the amount by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: i64) -> Option<Money> {
        self.amount
            .checked_mul(quantity)
            .map(|amount| Money::new(amount, self.currency.clone()))
    }

    /// Adds an amount in the same currency, returning `None` on overflow.
    pub fn checked_add_amount(&self, amount: i64) -> Option<Money> {
        self.amount
            .checked_add(amount)
            .map(|amount| Money::new(amount, self.currency.clone()))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
