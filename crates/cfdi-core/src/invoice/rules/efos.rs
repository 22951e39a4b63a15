//! EFOS blacklist membership of the issuer.

use crate::models::invoice::Invoice;
use crate::reference::Blacklist;

use super::Verdict;

/// Check the issuer RFC against the definitive EFOS list.
///
/// An unusable list never yields `Ok`: the verdict is inconclusive.
pub fn check(invoice: &Invoice, blacklist: &Blacklist) -> Verdict {
    if !blacklist.is_usable() {
        return Verdict::inconclusive(format!("not verified ({})", blacklist.status()));
    }

    let rfc = &invoice.issuer.rfc;
    if rfc.is_empty() {
        return Verdict::anomaly("issuer RFC missing");
    }

    if blacklist.contains(rfc) {
        Verdict::violation(format!("issuer {} is a definitive EFOS", rfc))
    } else {
        Verdict::Ok
    }
}
