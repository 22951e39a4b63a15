//! Invoice data model for CFDI 4.0 documents.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency assumed when a document omits `Moneda`.
pub const DEFAULT_CURRENCY: &str = "MXN";

/// A parsed CFDI invoice.
///
/// Produced by [`crate::invoice::CfdiParser`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Originating file name or handle.
    pub source: String,

    /// Invoice series (`Serie`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    /// Invoice folio (`Folio`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folio: Option<String>,

    /// Raw issue timestamp (`Fecha`), empty when absent.
    pub issued_at: String,

    /// Issuer (emisor).
    pub issuer: Party,

    /// Receiver (receptor).
    pub receiver: Party,

    /// ISO-style currency code, uppercase.
    pub currency: String,

    /// Exchange rate (`TipoCambio`); absent or unparseable yields `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,

    /// Amount before taxes.
    pub subtotal: Decimal,

    /// Declared or derived transferred-tax total.
    pub tax_total: Decimal,

    /// Where `tax_total` came from.
    pub tax_source: TaxSource,

    /// Amount after taxes.
    pub total: Decimal,

    /// Payment method code (`MetodoPago`, e.g. PUE or PPD).
    pub payment_method: String,

    /// Payment form code (`FormaPago`, e.g. 01 or 99).
    pub payment_form: String,

    /// Digital stamp; `None` means the document was never stamped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp: Option<Stamp>,
}

/// A party (issuer or receiver) on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Tax ID (RFC), uppercase and trimmed.
    pub rfc: String,

    /// Legal name.
    pub name: String,
}

/// Digital stamp (`TimbreFiscalDigital`) presence data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Fiscal folio UUID; may be empty on damaged documents.
    pub uuid: String,

    /// Stamping timestamp (`FechaTimbrado`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamped_at: Option<String>,
}

/// Origin of the invoice tax total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxSource {
    /// `TotalImpuestosTrasladados` on the document-level `Impuestos` node.
    Declared,
    /// Sum of per-concept `Traslado` amounts.
    LineItems,
    /// Sum of document-level `Traslado` amounts.
    Transfers,
    /// No tax information found; total is zero.
    #[default]
    Missing,
}

impl Invoice {
    /// Create an empty invoice for the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            series: None,
            folio: None,
            issued_at: String::new(),
            issuer: Party::default(),
            receiver: Party::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            exchange_rate: None,
            subtotal: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            tax_source: TaxSource::Missing,
            total: Decimal::ZERO,
            payment_method: String::new(),
            payment_form: String::new(),
            stamp: None,
        }
    }

    /// Calendar date of issue, taken from the first 10 characters of `Fecha`.
    pub fn issue_date(&self) -> Option<NaiveDate> {
        let date = self.issued_at.get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// Stamp UUID, if the document carries a non-empty one.
    pub fn uuid(&self) -> Option<&str> {
        self.stamp
            .as_ref()
            .map(|s| s.uuid.as_str())
            .filter(|u| !u.is_empty())
    }

    /// Series and folio joined as `SERIE-FOLIO`, when any is present.
    pub fn reference(&self) -> Option<String> {
        match (&self.series, &self.folio) {
            (Some(s), Some(f)) => Some(format!("{}-{}", s, f)),
            (Some(s), None) => Some(s.clone()),
            (None, Some(f)) => Some(f.clone()),
            (None, None) => None,
        }
    }
}
