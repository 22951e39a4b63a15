//! Payment method (PUE/PPD) versus payment form consistency.

use crate::models::invoice::Invoice;

use super::Verdict;

/// Single payment at issue time.
pub const SINGLE_PAYMENT: &str = "PUE";

/// Deferred or partial payments.
pub const DEFERRED_PAYMENT: &str = "PPD";

/// Payment form "to be defined".
pub const FORM_TO_BE_DEFINED: &str = "99";

pub fn check(invoice: &Invoice) -> Verdict {
    check_pair(&invoice.payment_method, &invoice.payment_form)
}

/// PPD requires form 99; PUE forbids it. Other methods are not constrained.
pub fn check_pair(method: &str, form: &str) -> Verdict {
    let method = method.trim().to_uppercase();
    let form = form.trim();

    match method.as_str() {
        "" => Verdict::anomaly("payment method missing"),
        DEFERRED_PAYMENT if form != FORM_TO_BE_DEFINED => Verdict::violation(format!(
            "PPD requires payment form 99, found {}",
            if form.is_empty() { "none" } else { form }
        )),
        SINGLE_PAYMENT if form == FORM_TO_BE_DEFINED => {
            Verdict::violation("PUE cannot use payment form 99")
        }
        _ => Verdict::Ok,
    }
}
