//! Document age relative to the processing date.

use chrono::NaiveDate;

use crate::models::invoice::Invoice;

use super::Verdict;

/// Flag documents issued more than `max_age_days` before `today`.
pub fn check(invoice: &Invoice, today: NaiveDate, max_age_days: i64) -> Verdict {
    let Some(issued) = invoice.issue_date() else {
        return if invoice.issued_at.is_empty() {
            Verdict::anomaly("issue date missing")
        } else {
            Verdict::anomaly(format!("malformed issue date {:?}", invoice.issued_at))
        };
    };

    let age = (today - issued).num_days();
    if age > max_age_days {
        Verdict::flagged(format!("issued {} days ago (limit {})", age, max_age_days))
    } else {
        Verdict::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::rules::WarningKind;
    use crate::test_support;

    fn issued(at: &str) -> Invoice {
        let mut invoice = test_support::invoice();
        invoice.issued_at = at.to_string();
        invoice
    }

    #[test]
    fn test_recent_document() {
        let today = test_support::today();
        assert_eq!(check(&issued("2025-06-01T10:00:00"), today, 365), Verdict::Ok);
        // Exactly at the limit is still within the window.
        assert_eq!(check(&issued("2024-06-30T00:00:00"), today, 365), Verdict::Ok);
    }

    #[test]
    fn test_old_document() {
        let today = test_support::today();
        assert_eq!(
            check(&issued("2024-06-29T23:59:59"), today, 365),
            Verdict::flagged("issued 366 days ago (limit 365)")
        );
    }

    #[test]
    fn test_bad_dates_are_anomalies() {
        let today = test_support::today();

        for at in ["", "30/06/2025", "2025-13-01T00:00:00"] {
            assert!(matches!(
                check(&issued(at), today, 365),
                Verdict::Warning { kind: WarningKind::Anomaly, .. }
            ));
        }
    }
}
