//! Money arithmetic for laundry orders.
//!
//! All amounts are `rust_decimal::Decimal` with two decimal places. Prices
//! are quoted in rupees and GST is charged on top of the item subtotal.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// GST charged on every iron/wash order (18%).
pub const GST_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

const MONEY_SCALE: u32 = 2;

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Subtotal, tax and grand total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals from the pre-tax amount.
    ///
    /// Tax is rounded half-to-even to two places and the total is the exact
    /// sum of the rounded subtotal and tax, so `subtotal + tax == total`
    /// always holds for stored rows.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let subtotal = round_money(subtotal);
        let tax = round_money(subtotal * GST_RATE);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Price of `quantity` units, rounded to two places.
#[must_use]
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_gst_rate() {
        assert_eq!(GST_RATE, dec("0.18"));
    }

    #[test]
    fn test_totals_for_whole_amount() {
        let totals = OrderTotals::from_subtotal(dec("100"));
        assert_eq!(totals.tax, dec("18.00"));
        assert_eq!(totals.total, dec("118.00"));
    }

    #[test]
    fn test_totals_round_tax_to_two_places() {
        let totals = OrderTotals::from_subtotal(dec("7"));
        assert_eq!(totals.tax, dec("1.26"));
        assert_eq!(totals.total, dec("8.26"));

        let totals = OrderTotals::from_subtotal(dec("33.33"));
        // 33.33 * 0.18 = 5.9994
        assert_eq!(totals.tax, dec("6.00"));
        assert_eq!(totals.total, dec("39.33"));
    }

    #[test]
    fn test_tax_midpoint_rounds_to_even() {
        // 0.25 * 0.18 = 0.045
        let totals = OrderTotals::from_subtotal(dec("0.25"));
        assert_eq!(totals.tax, dec("0.04"));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        for raw in ["1", "49.99", "150", "1234.56", "0.01"] {
            let totals = OrderTotals::from_subtotal(dec(raw));
            assert_eq!(totals.subtotal + totals.tax, totals.total);
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(dec("7.00"), 3), dec("21.00"));
        assert_eq!(line_total(dec("50"), 0), Decimal::ZERO);
    }

    #[test]
    fn test_totals_serialize_as_strings() {
        let totals = OrderTotals::from_subtotal(dec("100.00"));
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["total"], "118.00");
    }
}
