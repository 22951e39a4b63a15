//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::invoice::{Invoice, Party, Stamp, TaxSource};

/// Processing date used by rule tests.
pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

/// A consistent, stamped MXN invoice issued shortly before [`today`].
pub(crate) fn invoice() -> Invoice {
    Invoice {
        source: "factura_1.xml".to_string(),
        series: Some("A".to_string()),
        folio: Some("1001".to_string()),
        issued_at: "2025-06-01T10:00:00".to_string(),
        issuer: Party {
            rfc: "AAA010101AAA".to_string(),
            name: "Empresa Demo SA de CV".to_string(),
        },
        receiver: Party {
            rfc: "XAXX010101000".to_string(),
            name: "Cliente Generico SA de CV".to_string(),
        },
        currency: "MXN".to_string(),
        exchange_rate: None,
        subtotal: Decimal::new(100000, 2),
        tax_total: Decimal::new(16000, 2),
        tax_source: TaxSource::Declared,
        total: Decimal::new(116000, 2),
        payment_method: "PUE".to_string(),
        payment_form: "01".to_string(),
        stamp: Some(Stamp {
            uuid: "6F1A2B3C-4D5E-4F60-8A7B-9C0D1E2F3A4B".to_string(),
            stamped_at: Some("2025-06-01T10:05:00".to_string()),
        }),
    }
}

/// Builder for CFDI 4.0 XML test documents.
pub(crate) struct XmlFixture {
    pub issuer_rfc: &'static str,
    pub subtotal: &'static str,
    pub total: &'static str,
    pub declared_tax: Option<&'static str>,
    pub line_taxes: Vec<&'static str>,
    pub transfer_taxes: Vec<&'static str>,
    pub currency: Option<&'static str>,
    pub exchange_rate: Option<&'static str>,
    pub method: &'static str,
    pub form: &'static str,
    pub issued_at: &'static str,
    pub uuid: Option<&'static str>,
}

impl Default for XmlFixture {
    fn default() -> Self {
        Self {
            issuer_rfc: "AAA010101AAA",
            subtotal: "1000.00",
            total: "1160.00",
            declared_tax: Some("160.00"),
            line_taxes: vec!["160.00"],
            transfer_taxes: vec!["160.00"],
            currency: Some("MXN"),
            exchange_rate: None,
            method: "PUE",
            form: "01",
            issued_at: "2025-06-01T10:00:00",
            uuid: Some("6f1a2b3c-4d5e-4f60-8a7b-9c0d1e2f3a4b"),
        }
    }
}

impl XmlFixture {
    pub fn build(&self) -> String {
        let mut root_attrs = format!(
            r#"Version="4.0" Serie="A" Folio="1001" Fecha="{}" FormaPago="{}" SubTotal="{}" Total="{}" MetodoPago="{}""#,
            self.issued_at, self.form, self.subtotal, self.total, self.method
        );
        if let Some(currency) = self.currency {
            root_attrs.push_str(&format!(r#" Moneda="{}""#, currency));
        }
        if let Some(rate) = self.exchange_rate {
            root_attrs.push_str(&format!(r#" TipoCambio="{}""#, rate));
        }

        let concepts: String = self
            .line_taxes
            .iter()
            .map(|tax| {
                format!(
                    r#"
    <cfdi:Concepto ClaveProdServ="80101500" Cantidad="1" Descripcion="Servicio" Importe="{subtotal}">
      <cfdi:Impuestos>
        <cfdi:Traslados>
          <cfdi:Traslado Base="{subtotal}" Impuesto="002" TipoFactor="Tasa" TasaOCuota="0.160000" Importe="{tax}"/>
        </cfdi:Traslados>
      </cfdi:Impuestos>
    </cfdi:Concepto>"#,
                    subtotal = self.subtotal,
                    tax = tax
                )
            })
            .collect();

        let transfers: String = self
            .transfer_taxes
            .iter()
            .map(|tax| {
                format!(
                    r#"
      <cfdi:Traslado Impuesto="002" TipoFactor="Tasa" TasaOCuota="0.160000" Importe="{}"/>"#,
                    tax
                )
            })
            .collect();

        let declared = self
            .declared_tax
            .map(|t| format!(r#" TotalImpuestosTrasladados="{}""#, t))
            .unwrap_or_default();

        let complement = self
            .uuid
            .map(|uuid| {
                format!(
                    r#"
  <cfdi:Complemento>
    <tfd:TimbreFiscalDigital xmlns:tfd="http://www.sat.gob.mx/TimbreFiscalDigital" Version="1.1" UUID="{}" FechaTimbrado="2025-06-01T10:05:00"/>
  </cfdi:Complemento>"#,
                    uuid
                )
            })
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" {root_attrs}>
  <cfdi:Emisor Rfc="{issuer}" Nombre="Empresa Demo SA de CV" RegimenFiscal="601"/>
  <cfdi:Receptor Rfc="XAXX010101000" Nombre="CLIENTE GENERICO SA DE CV" UsoCFDI="G03"/>
  <cfdi:Conceptos>{concepts}
  </cfdi:Conceptos>
  <cfdi:Impuestos{declared}>
    <cfdi:Traslados>{transfers}
    </cfdi:Traslados>
  </cfdi:Impuestos>{complement}
</cfdi:Comprobante>"#,
            root_attrs = root_attrs,
            issuer = self.issuer_rfc,
            concepts = concepts,
            declared = declared,
            transfers = transfers,
            complement = complement
        )
    }
}
