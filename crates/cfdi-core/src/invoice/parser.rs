//! Streaming CFDI 4.0 parser.

use std::collections::HashMap;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::ParseError;
use crate::models::invoice::{Invoice, Party, Stamp, TaxSource, DEFAULT_CURRENCY};

use super::{DocumentParser, Result};

/// CFDI parser.
///
/// Elements are matched by local name, so any namespace prefix is accepted.
/// Missing optional attributes fall back to empty strings or zero.
pub struct CfdiParser {
    /// Currency assumed when `Moneda` is absent.
    default_currency: String,
}

impl CfdiParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Set the currency assumed when a document omits `Moneda`.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into().trim().to_uppercase();
        self
    }
}

impl Default for CfdiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for CfdiParser {
    fn parse(&self, bytes: &[u8], source: &str) -> Result<Invoice> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut state = DocumentState::new(source, &self.default_currency);

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e);
                    state.element(&path, &name, &e)?;
                    path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(&e);
                    state.element(&path, &name, &e)?;
                }
                Ok(Event::End(_)) => {
                    path.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError::Malformed(format!(
                        "{} (at byte {})",
                        e,
                        reader.error_position()
                    )));
                }
            }
            buf.clear();
        }

        if let Some(open) = path.last() {
            return Err(ParseError::Malformed(format!(
                "unexpected end of document inside <{}>",
                open
            )));
        }

        let invoice = state.finish()?;

        debug!(
            "Parsed {}: issuer {:?}, total {} {}, tax {} ({:?})",
            invoice.source,
            invoice.issuer.rfc,
            invoice.total,
            invoice.currency,
            invoice.tax_total,
            invoice.tax_source
        );

        Ok(invoice)
    }
}

/// Accumulates invoice fields while the document streams past.
struct DocumentState {
    invoice: Invoice,
    default_currency: String,
    root_seen: bool,
    issuer_seen: bool,
    receiver_seen: bool,
    declared_tax: Option<Decimal>,
    line_item_tax: Option<Decimal>,
    transfer_tax: Option<Decimal>,
}

impl DocumentState {
    fn new(source: &str, default_currency: &str) -> Self {
        Self {
            invoice: Invoice::new(source),
            default_currency: default_currency.to_string(),
            root_seen: false,
            issuer_seen: false,
            receiver_seen: false,
            declared_tax: None,
            line_item_tax: None,
            transfer_tax: None,
        }
    }

    fn element(&mut self, path: &[String], name: &str, e: &BytesStart<'_>) -> Result<()> {
        if path.is_empty() {
            if self.root_seen {
                return Err(ParseError::Malformed(format!(
                    "multiple root elements (found <{}>)",
                    name
                )));
            }
            if name != "Comprobante" {
                return Err(ParseError::NotCfdi(name.to_string()));
            }
            self.root_seen = true;
            return self.comprobante(&attributes(e)?);
        }

        let top_level = path.len() == 1;

        match name {
            "Emisor" if top_level => {
                self.invoice.issuer = party(&attributes(e)?);
                self.issuer_seen = true;
            }
            "Receptor" if top_level => {
                self.invoice.receiver = party(&attributes(e)?);
                self.receiver_seen = true;
            }
            "Impuestos" if top_level => {
                let attrs = attributes(e)?;
                if has_value(&attrs, "TotalImpuestosTrasladados") {
                    self.declared_tax =
                        Some(parse_amount("TotalImpuestosTrasladados", attrs.get("TotalImpuestosTrasladados"))?);
                }
            }
            "Traslado" => {
                let attrs = attributes(e)?;
                let amount = parse_amount("Traslado.Importe", attrs.get("Importe"))?;

                if path.iter().any(|p| p == "Concepto") {
                    accumulate(&mut self.line_item_tax, amount, &attrs)?;
                } else if path.get(1).is_some_and(|p| p == "Impuestos") {
                    accumulate(&mut self.transfer_tax, amount, &attrs)?;
                } else {
                    trace!("Ignoring Traslado outside concepts and document taxes");
                }
            }
            "TimbreFiscalDigital" => {
                let attrs = attributes(e)?;
                self.invoice.stamp = Some(Stamp {
                    uuid: text(&attrs, "UUID").to_uppercase(),
                    stamped_at: optional(&attrs, "FechaTimbrado"),
                });
            }
            _ => {}
        }

        Ok(())
    }

    fn comprobante(&mut self, attrs: &HashMap<String, String>) -> Result<()> {
        let invoice = &mut self.invoice;

        invoice.series = optional(attrs, "Serie");
        invoice.folio = optional(attrs, "Folio");
        invoice.issued_at = text(attrs, "Fecha");
        invoice.subtotal = parse_amount("SubTotal", attrs.get("SubTotal"))?;
        invoice.total = parse_amount("Total", attrs.get("Total"))?;
        invoice.payment_method = text(attrs, "MetodoPago").to_uppercase();
        invoice.payment_form = text(attrs, "FormaPago");

        let currency = text(attrs, "Moneda").to_uppercase();
        invoice.currency = if currency.is_empty() {
            self.default_currency.clone()
        } else {
            currency
        };

        // Unparseable exchange rates degrade to absent.
        invoice.exchange_rate = attrs
            .get("TipoCambio")
            .and_then(|v| Decimal::from_str(v.trim()).ok());

        Ok(())
    }

    fn finish(mut self) -> Result<Invoice> {
        if !self.root_seen {
            return Err(ParseError::Malformed("no root element".to_string()));
        }

        if !self.issuer_seen && !self.receiver_seen {
            return Err(ParseError::MissingParties);
        }

        let (tax_total, tax_source) = match (self.declared_tax, self.line_item_tax, self.transfer_tax) {
            (Some(declared), _, _) => (declared, TaxSource::Declared),
            (None, Some(lines), _) => (lines, TaxSource::LineItems),
            (None, None, Some(transfers)) => (transfers, TaxSource::Transfers),
            (None, None, None) => (Decimal::ZERO, TaxSource::Missing),
        };

        self.invoice.tax_total = tax_total.round_dp(2);
        self.invoice.tax_source = tax_source;

        Ok(self.invoice)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Collect attributes keyed by local name.
fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::Malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::Malformed(err.to_string()))?;
        attrs.insert(key, value.into_owned());
    }

    Ok(attrs)
}

fn party(attrs: &HashMap<String, String>) -> Party {
    Party {
        rfc: text(attrs, "Rfc").to_uppercase(),
        name: text(attrs, "Nombre"),
    }
}

fn text(attrs: &HashMap<String, String>, key: &str) -> String {
    attrs.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional(attrs: &HashMap<String, String>, key: &str) -> Option<String> {
    Some(text(attrs, key)).filter(|v| !v.is_empty())
}

fn has_value(attrs: &HashMap<String, String>, key: &str) -> bool {
    attrs.get(key).is_some_and(|v| !v.trim().is_empty())
}

/// Add a transferred tax to a running sum, rejecting overflow.
fn accumulate(
    sum: &mut Option<Decimal>,
    amount: Decimal,
    attrs: &HashMap<String, String>,
) -> Result<()> {
    let total = sum
        .unwrap_or(Decimal::ZERO)
        .checked_add(amount)
        .ok_or_else(|| ParseError::InvalidAmount {
            field: "Traslado.Importe".to_string(),
            value: text(attrs, "Importe"),
        })?;
    *sum = Some(total);
    Ok(())
}

/// Parse a monetary amount; absent or blank values are zero.
fn parse_amount(field: &str, raw: Option<&String>) -> Result<Decimal> {
    let Some(raw) = raw.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(Decimal::ZERO);
    };

    let invalid = || ParseError::InvalidAmount {
        field: field.to_string(),
        value: raw.to_string(),
    };

    let amount = Decimal::from_str(raw).map_err(|_| invalid())?;
    if amount < Decimal::ZERO {
        return Err(invalid());
    }

    Ok(amount.round_dp(2))
}
