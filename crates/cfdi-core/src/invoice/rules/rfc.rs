//! RFC (Mexican tax ID) structural validation.

use crate::models::invoice::Invoice;

use super::patterns::RFC_PATTERN;
use super::Verdict;

/// Kind of taxpayer, derived from RFC length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfcKind {
    /// Persona moral: 3-letter prefix, 12 characters.
    LegalEntity,
    /// Persona física: 4-letter prefix, 13 characters.
    Individual,
}

/// Validate the structure of an RFC.
///
/// Format: 3-4 letters (including Ñ and &), YYMMDD, two homoclave
/// characters and a check digit (0-9 or A). The check digit is not
/// recomputed.
pub fn validate_rfc(rfc: &str) -> bool {
    RFC_PATTERN.is_match(&normalize(rfc))
}

/// Classify a structurally valid RFC.
pub fn rfc_kind(rfc: &str) -> Option<RfcKind> {
    let rfc = normalize(rfc);
    if !RFC_PATTERN.is_match(&rfc) {
        return None;
    }

    match rfc.chars().count() {
        12 => Some(RfcKind::LegalEntity),
        13 => Some(RfcKind::Individual),
        _ => None,
    }
}

/// Check the issuer RFC of an invoice.
pub fn check(invoice: &Invoice) -> Verdict {
    check_rfc(&invoice.issuer.rfc)
}

/// Verdict for a single RFC, with a length hint on failure.
pub fn check_rfc(rfc: &str) -> Verdict {
    let rfc = normalize(rfc);

    if rfc.is_empty() {
        return Verdict::anomaly("RFC empty (length 0)");
    }

    if RFC_PATTERN.is_match(&rfc) {
        Verdict::Ok
    } else {
        Verdict::violation(format!(
            "invalid RFC format (length {}, expected 12 or 13)",
            rfc.chars().count()
        ))
    }
}

fn normalize(rfc: &str) -> String {
    rfc.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rfcs() {
        assert!(validate_rfc("AAA010101AAA"));
        assert!(validate_rfc("GOMJ880101L99"));
        assert!(validate_rfc("SAT970701NN3"));
        assert!(validate_rfc("ÑAÑ850505AB1"));
        assert!(validate_rfc("  gomj880101l99 "));
        assert_eq!(check_rfc("AAA010101AAA"), Verdict::Ok);
        assert_eq!(check_rfc("GOMJ880101L99"), Verdict::Ok);
    }

    #[test]
    fn test_invalid_rfcs() {
        assert!(!validate_rfc("123"));
        assert!(!validate_rfc(""));
        assert!(!validate_rfc("AAA01010AAA"));
        assert!(!validate_rfc("QUAN260101XYZ"));
        assert!(!validate_rfc("AAAAA010101AA1"));
    }

    #[test]
    fn test_failure_hints() {
        assert_eq!(
            check_rfc("123"),
            Verdict::violation("invalid RFC format (length 3, expected 12 or 13)")
        );

        let empty = check_rfc("");
        assert!(!empty.is_ok());
        assert_eq!(empty.detail(), Some("RFC empty (length 0)"));
    }

    #[test]
    fn test_rfc_kind() {
        assert_eq!(rfc_kind("AAA010101AAA"), Some(RfcKind::LegalEntity));
        assert_eq!(rfc_kind("GOMJ880101L99"), Some(RfcKind::Individual));
        assert_eq!(rfc_kind("123"), None);
    }
}
