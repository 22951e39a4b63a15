//! Arithmetic consistency between subtotal, taxes and total.

use rust_decimal::Decimal;

use crate::models::invoice::Invoice;

use super::Verdict;

/// Difference between the computed and declared total, always non-negative.
///
/// `None` when the amounts are too large to add up.
pub fn delta(invoice: &Invoice) -> Option<Decimal> {
    invoice
        .subtotal
        .checked_add(invoice.tax_total)?
        .checked_sub(invoice.total)
        .map(|d| d.abs())
}

/// Check `|subtotal + tax - total| < tolerance`.
///
/// The tolerance is absolute, in currency units, whatever the invoice size.
pub fn check(invoice: &Invoice, tolerance: Decimal) -> Verdict {
    let Some(delta) = delta(invoice) else {
        return Verdict::anomaly("amounts overflow");
    };

    if delta < tolerance {
        Verdict::Ok
    } else {
        Verdict::violation(format!("totals differ by ${:.2}", delta))
    }
}
