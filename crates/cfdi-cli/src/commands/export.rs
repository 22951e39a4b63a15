//! Report rendering and export formats.

use std::io::Write;
use std::path::Path;

use console::style;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use serde_json::{json, Map, Value};

use cfdi_core::audit::{AuditReport, Cell, ReportTable, Summary};
use cfdi_core::invoice::rules::{RuleId, Severity};

/// Invoice columns shown in the terminal view: File, UUID, Issuer RFC, Total.
const TERMINAL_COLUMNS: [usize; 4] = [0, 1, 3, 9];

const MAX_COLUMN_WIDTH: usize = 60;

/// Output format for the audit command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned table for the terminal
    Table,
    /// JSON document with summary and rows
    Json,
    /// CSV, one row per document
    Csv,
    /// Excel workbook with highlighted findings
    Xlsx,
}

/// Short mark for a verdict cell in the terminal view.
fn mark(severity: Severity) -> &'static str {
    match severity {
        Severity::Clean => "OK",
        Severity::Warning => "WARN",
        Severity::Violation => "FAIL",
    }
}

fn paint(text: String, severity: Severity, colored: bool) -> String {
    if !colored {
        return text;
    }
    match severity {
        Severity::Clean => style(text).green().to_string(),
        Severity::Warning => style(text).yellow().to_string(),
        Severity::Violation => style(text).red().bold().to_string(),
    }
}

/// Render the table for the terminal, followed by every non-OK finding.
pub fn render_text(table: &ReportTable, colored: bool) -> String {
    let columns: Vec<usize> = TERMINAL_COLUMNS
        .iter()
        .copied()
        .filter(|&col| col < table.headers.len())
        .chain(table.rule_columns())
        .collect();

    let cell_text = |cell: &Cell| -> String {
        if cell.rule.is_some() {
            mark(cell.severity).to_string()
        } else {
            cell.text.clone()
        }
    };

    let widths: Vec<usize> = columns
        .iter()
        .map(|&col| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell_text(cell).chars().count())
                .chain(std::iter::once(table.headers[col].chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(&col, &width)| format!("{:<width$}", table.headers[col], width = width))
        .collect();
    let header = header.join("  ");
    out.push_str(header.trim_end());
    out.push('\n');

    for row in &table.rows {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .filter_map(|(&col, &width)| {
                let cell = row.get(col)?;
                let padded = format!("{:<width$}", cell_text(cell), width = width);
                Some(paint(padded, cell.severity, colored && cell.rule.is_some()))
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    let findings: Vec<String> = table
        .rows
        .iter()
        .flat_map(|row| {
            let source = row.first().map(|c| c.text.as_str()).unwrap_or("");
            table
                .rule_columns()
                .filter_map(move |col| row.get(col).map(|cell| (col, cell)))
                .filter(|(_, cell)| cell.severity != Severity::Clean)
                .map(move |(col, cell)| (source, col, cell))
        })
        .map(|(source, col, cell)| {
            format!(
                "  {}  {}: {}",
                source,
                table.headers[col],
                paint(cell.text.clone(), cell.severity, colored)
            )
        })
        .collect();

    if !findings.is_empty() {
        out.push('\n');
        out.push_str("Findings:\n");
        for finding in findings {
            out.push_str(&finding);
            out.push('\n');
        }
    }

    out
}

/// Write the table as CSV: every column as text, then one severity column per rule.
pub fn write_csv<W: Write>(table: &ReportTable, writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = table.headers.clone();
    header.extend(
        table
            .rule_columns()
            .map(|col| format!("{} severity", table.headers[col])),
    );
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record: Vec<String> = row.iter().map(|cell| cell.text.clone()).collect();
        record.extend(
            row.iter()
                .filter(|cell| cell.rule.is_some())
                .map(|cell| cell.severity.label().to_string()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Build the JSON export. With `summary_only`, rows and failures are omitted.
pub fn to_json(report: &AuditReport, summary: &Summary, summary_only: bool) -> Value {
    let mut doc = json!({
        "plan": report.plan(),
        "reference_status": report.reference_status(),
        "submitted": report.submitted(),
        "rules": report.rules(),
        "summary": summary,
    });

    if summary_only {
        return doc;
    }

    let rows: Vec<Value> = report
        .rows()
        .iter()
        .map(|row| {
            let verdicts: Map<String, Value> = row
                .verdicts
                .iter()
                .map(|(rule, verdict)| {
                    (
                        rule.name().to_string(),
                        json!({ "verdict": verdict, "severity": verdict.severity() }),
                    )
                })
                .collect();

            json!({
                "source": row.source,
                "severity": row.worst_severity(),
                "invoice": row.invoice,
                "verdicts": verdicts,
            })
        })
        .collect();

    doc["rows"] = Value::Array(rows);
    doc["failures"] = json!(report.failures());
    doc
}

/// Spreadsheet highlight for a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Highlight {
    None,
    Warning,
    Violation,
    /// Blacklist hit: violation fill, bold.
    Listed,
}

/// Map a cell's severity onto the three-tier spreadsheet highlighting.
fn highlight(severity: Severity, rule: Option<RuleId>) -> Highlight {
    match (severity, rule) {
        (Severity::Clean, _) => Highlight::None,
        (Severity::Warning, _) => Highlight::Warning,
        (Severity::Violation, Some(RuleId::Blacklist)) => Highlight::Listed,
        (Severity::Violation, _) => Highlight::Violation,
    }
}

/// Cell formats used on the audit sheets.
struct Palette {
    header: Format,
    warning: Format,
    violation: Format,
    listed: Format,
    amount: Format,
}

impl Palette {
    fn new() -> Self {
        let violation = Format::new()
            .set_background_color(Color::RGB(0xFFC7CE))
            .set_font_color(Color::RGB(0x9C0006));

        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xD9E1F2))
                .set_border(FormatBorder::Thin),
            warning: Format::new()
                .set_background_color(Color::RGB(0xFFEB9C))
                .set_font_color(Color::RGB(0x9C5700)),
            listed: violation.clone().set_bold(),
            violation,
            amount: Format::new().set_num_format("#,##0.00"),
        }
    }

    fn format(&self, highlight: Highlight) -> Option<&Format> {
        match highlight {
            Highlight::None => None,
            Highlight::Warning => Some(&self.warning),
            Highlight::Violation => Some(&self.violation),
            Highlight::Listed => Some(&self.listed),
        }
    }
}

/// Write the Excel workbook: audit sheet, summary sheet and, if any, failures.
pub fn write_xlsx(
    report: &AuditReport,
    table: &ReportTable,
    summary: &Summary,
    path: &Path,
) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();

    let palette = Palette::new();
    let header = &palette.header;
    let amount = &palette.amount;

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Audit")?;

        for (col, title) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, title, header)?;
        }

        for (i, cells) in table.rows.iter().enumerate() {
            let row = (i + 1) as u32;
            let worst = cells
                .iter()
                .map(|cell| cell.severity)
                .max()
                .unwrap_or(Severity::Clean);

            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;

                if let Some(value) = cell.amount.and_then(|a| a.to_f64()) {
                    sheet.write_number_with_format(row, col, value, amount)?;
                    continue;
                }

                // The file name carries the row's worst severity.
                let severity = if col == 0 { worst } else { cell.severity };
                match palette.format(highlight(severity, cell.rule)) {
                    Some(format) => sheet.write_string_with_format(row, col, &cell.text, format)?,
                    None => sheet.write_string(row, col, &cell.text)?,
                };
            }
        }

        for col in 0..table.headers.len() {
            let width = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.text.chars().count())
                .chain(std::iter::once(table.headers[col].chars().count()))
                .max()
                .unwrap_or(8)
                .clamp(8, MAX_COLUMN_WIDTH);
            sheet.set_column_width(col as u16, width as f64 + 2.0)?;
        }

        sheet.set_freeze_panes(1, 0)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        sheet.write_string_with_format(0, 0, "Metric", header)?;
        sheet.write_string_with_format(0, 1, "Value", header)?;

        let mut rows: Vec<(String, String)> = vec![
            ("Plan".to_string(), report.plan().to_string()),
            ("Reference list".to_string(), report.reference_status().to_string()),
            ("Submitted".to_string(), report.submitted().to_string()),
            ("Processed".to_string(), summary.processed.to_string()),
            ("Failed".to_string(), summary.failed.to_string()),
            ("Dropped by quota".to_string(), summary.dropped.to_string()),
            ("Unique issuers".to_string(), summary.unique_issuers.to_string()),
            ("Clean documents".to_string(), summary.clean_rows.to_string()),
        ];
        for rule in report.rules().iter() {
            rows.push((
                format!("{} issues", rule.title()),
                summary.issue_count(rule).to_string(),
            ));
            rows.push((
                format!("{} warnings", rule.title()),
                summary.warning_count(rule).to_string(),
            ));
        }

        let mut row = 1u32;
        for (metric, value) in &rows {
            sheet.write_string(row, 0, metric)?;
            sheet.write_string(row, 1, value)?;
            row += 1;
        }

        sheet.write_string(row, 0, "Total amount")?;
        sheet.write_number_with_format(
            row,
            1,
            summary.total_amount.to_f64().unwrap_or(0.0),
            amount,
        )?;

        sheet.set_column_width(0, 24)?;
        sheet.set_column_width(1, 48)?;
    }

    if !report.failures().is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Failures")?;
        sheet.write_string_with_format(0, 0, "File", header)?;
        sheet.write_string_with_format(0, 1, "Reason", header)?;

        for (i, failure) in report.failures().iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string_with_format(row, 0, &failure.source, &palette.violation)?;
            sheet.write_string(row, 1, &failure.reason)?;
        }

        sheet.set_column_width(0, 32)?;
        sheet.set_column_width(1, 80)?;
    }

    workbook.save(path)?;
    Ok(())
}
