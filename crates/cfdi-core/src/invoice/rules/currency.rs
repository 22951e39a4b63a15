//! Currency / exchange-rate consistency.

use rust_decimal::Decimal;

use crate::models::invoice::Invoice;

use super::patterns::CURRENCY_CODE;
use super::Verdict;

/// Home-currency documents must use a rate of 1 (or none); foreign-currency
/// documents must declare a rate other than 1.
pub fn check(invoice: &Invoice, home_currency: &str) -> Verdict {
    let currency = invoice.currency.trim().to_uppercase();
    if !CURRENCY_CODE.is_match(&currency) {
        return Verdict::anomaly(format!("malformed currency code {:?}", currency));
    }

    let home = home_currency.trim().to_uppercase();
    let rate = invoice.exchange_rate;

    if currency == home {
        match rate {
            Some(rate) if rate != Decimal::ONE => {
                Verdict::violation(format!("{} with exchange rate {}", currency, rate))
            }
            _ => Verdict::Ok,
        }
    } else {
        match rate {
            None => Verdict::flagged(format!("{} without exchange rate", currency)),
            Some(rate) if rate == Decimal::ONE => {
                Verdict::flagged(format!("{} with exchange rate 1", currency))
            }
            Some(_) => Verdict::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn invoice(currency: &str, rate: Option<Decimal>) -> Invoice {
        let mut invoice = test_support::invoice();
        invoice.currency = currency.to_string();
        invoice.exchange_rate = rate;
        invoice
    }

    #[test]
    fn test_home_currency() {
        assert_eq!(check(&invoice("MXN", None), "MXN"), Verdict::Ok);
        assert_eq!(check(&invoice("MXN", Some(Decimal::new(1000000, 6))), "MXN"), Verdict::Ok);
        assert_eq!(
            check(&invoice("MXN", Some(Decimal::new(1725, 2))), "MXN"),
            Verdict::violation("MXN with exchange rate 17.25")
        );
    }

    #[test]
    fn test_foreign_currency() {
        assert_eq!(check(&invoice("USD", Some(Decimal::new(1725, 2))), "MXN"), Verdict::Ok);

        let missing = check(&invoice("USD", None), "MXN");
        assert!(missing.is_issue());
        assert_eq!(missing.detail(), Some("USD without exchange rate"));

        assert!(check(&invoice("EUR", Some(Decimal::ONE)), "MXN").is_issue());
    }

    #[test]
    fn test_home_currency_is_configurable() {
        assert_eq!(check(&invoice("USD", None), "usd"), Verdict::Ok);
    }

    #[test]
    fn test_malformed_code() {
        let verdict = check(&invoice("PESOS", None), "MXN");
        assert!(!verdict.is_ok());
        assert!(!verdict.is_issue());
    }
}
