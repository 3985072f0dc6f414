use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::models::invoice::{InvoiceLine, LogicalInvoice, REQUIRED_HEADERS};
use crate::utils::error_handling::{AppError, Result};
use crate::utils::log_sanitizer::sanitize_for_log;

pub fn parse_invoice_file(path: &Path) -> Result<Vec<InvoiceLine>> {
    let file = std::fs::File::open(path)?;
    parse_invoice_lines(file)
}

/// Read vendor invoice lines. Header names must match exactly; rows without
/// an invoice number are skipped.
pub fn parse_invoice_lines<R: Read>(source: R) -> Result<Vec<InvoiceLine>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .collect();

    if !missing.is_empty() {
        return Err(AppError::InvalidData(format!(
            "invoice file is missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut lines = Vec::new();
    for (index, result) in reader.deserialize::<InvoiceLine>().enumerate() {
        let line = result?;
        if line.invoice_num.trim().is_empty() {
            // Header row is line 1
            tracing::warn!("Skipping row {} without an invoice number", index + 2);
            continue;
        }
        lines.push(line);
    }

    Ok(lines)
}

/// Partition lines by invoice number, keeping the order invoices first appear in
pub fn group_invoices(lines: Vec<InvoiceLine>) -> Vec<LogicalInvoice> {
    let mut invoices: Vec<LogicalInvoice> = Vec::new();

    for line in lines {
        let invoice_num = line.invoice_num.trim().to_string();
        match invoices.iter_mut().find(|inv| inv.invoice_num == invoice_num) {
            Some(invoice) => invoice.lines.push(line),
            None => invoices.push(LogicalInvoice {
                invoice_num,
                lines: vec![line],
            }),
        }
    }

    tracing::debug!(
        "Grouped into {} invoice(s): {}",
        invoices.len(),
        sanitize_for_log(
            &invoices
                .iter()
                .map(|i| i.invoice_num.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    );

    invoices
}
