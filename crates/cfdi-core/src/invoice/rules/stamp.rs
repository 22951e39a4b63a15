//! Digital stamp (TimbreFiscalDigital) presence.
//!
//! Only presence and shape are checked; the seal is not verified.

use crate::models::invoice::Invoice;

use super::patterns::UUID_PATTERN;
use super::Verdict;

pub fn check(invoice: &Invoice) -> Verdict {
    let Some(stamp) = &invoice.stamp else {
        return Verdict::violation("not stamped");
    };

    let uuid = stamp.uuid.trim();
    if uuid.is_empty() {
        return Verdict::violation("stamp without UUID");
    }

    if !UUID_PATTERN.is_match(uuid) {
        return Verdict::anomaly(format!("UUID {:?} is not in 8-4-4-4-12 form", uuid));
    }

    Verdict::Ok
}
