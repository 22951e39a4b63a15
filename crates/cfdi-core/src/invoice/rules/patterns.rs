//! Common regex patterns for CFDI field validation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // RFC: 3 letters (legal entity) or 4 (individual), YYMMDD, 2-char homoclave,
    // check digit 0-9 or A.
    pub static ref RFC_PATTERN: Regex = Regex::new(
        r"^[A-ZÑ&]{3,4}[0-9]{6}[A-Z0-9]{2}[0-9A]$"
    ).unwrap();

    // Fiscal folio UUID, 8-4-4-4-12 hex.
    pub static ref UUID_PATTERN: Regex = Regex::new(
        r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$"
    ).unwrap();

    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"^[A-Z]{3}$"
    ).unwrap();
}
