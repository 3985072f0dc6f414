use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::models::ap_invoice::{same_part, UninvoicedRcptLine};
use crate::utils::error_handling::{AppError, Result};
use crate::utils::value_parsing::{parse_decimal, parse_flexible_date};

// ============================================================================
// Vendor CSV Line
// ============================================================================

/// Headers that must appear verbatim in every vendor invoice file.
/// The vendor's casing is inconsistent between exports, so these are matched
/// exactly rather than normalized.
pub const REQUIRED_HEADERS: &[&str] = &[
    "Entity",
    "Vendor ID",
    "Post Date",
    "Invoice Date",
    "Due Date",
    "G/L Account",
    "Invoice Number",
    "Invoice Amount",
    "Description",
    "Cost Center",
    "Sub Account",
    "PO#",
    "Product code",
    "Product label",
    "Invoiced quantity",
    "Unit price",
    "PO line#",
];

/// One row of a vendor invoice CSV. The format is flat: header fields repeat
/// (or are blank) on every line of the same invoice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvoiceLine {
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Vendor ID")]
    pub vendor_id: String,
    #[serde(rename = "Post Date", default, deserialize_with = "de_optional_date")]
    pub post_date: Option<NaiveDate>,
    #[serde(rename = "Invoice Date", default, deserialize_with = "de_optional_date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(rename = "Due Date", default, deserialize_with = "de_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "G/L Account")]
    pub gl_account: String,
    #[serde(rename = "Invoice Number")]
    pub invoice_num: String,
    #[serde(rename = "Invoice Amount", default, deserialize_with = "de_optional_decimal")]
    pub invoice_amount: Option<Decimal>,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Cost Center")]
    pub cost_center: String,
    #[serde(rename = "Sub Account")]
    pub sub_account: String,
    #[serde(rename = "PO#")]
    pub po_number: String,
    #[serde(rename = "Product code")]
    pub product_code: String,
    #[serde(rename = "Product label")]
    pub product_label: String,
    #[serde(rename = "Invoiced quantity", default, deserialize_with = "de_optional_decimal")]
    pub invoice_qty: Option<Decimal>,
    #[serde(rename = "Unit price", default, deserialize_with = "de_optional_decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(rename = "PO line#", default, deserialize_with = "de_optional_int")]
    pub po_line: Option<i32>,
    #[serde(rename = "Document ID", default)]
    pub document_id: String,
}

impl InvoiceLine {
    /// PO number when the PO# column holds a positive integer
    pub fn po_num(&self) -> Option<i32> {
        self.po_number
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|po| *po > 0)
    }

    /// The line's own PO number, else the invoice header's. Continuation lines
    /// of a PO invoice often leave PO# blank.
    pub fn po_num_or(&self, header_po_num: Option<i32>) -> Option<i32> {
        self.po_num().or(header_po_num)
    }

    /// Part number for a miscellaneous line: product label, product code,
    /// description, then the invoice number
    pub fn misc_part_num(&self) -> &str {
        [
            self.product_label.as_str(),
            self.product_code.as_str(),
            self.description.as_str(),
            self.invoice_num.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or("")
    }
}

fn de_optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_flexible_date(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", value))),
    }
}

fn de_optional_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_decimal(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid number '{}'", value))),
    }
}

fn de_optional_int<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid integer '{}'", value))),
    }
}

// ============================================================================
// Logical Invoice
// ============================================================================

/// All lines of one vendor file sharing an invoice number, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalInvoice {
    pub invoice_num: String,
    pub lines: Vec<InvoiceLine>,
}

/// Header values taken from the first line of a logical invoice
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceHeader {
    pub invoice_num: String,
    pub vendor_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub invoice_amount: Decimal,
    pub po_num: Option<i32>,
    pub document_id: String,
}

impl InvoiceHeader {
    pub fn from_lines(lines: &[InvoiceLine]) -> Result<Self> {
        let first = lines
            .first()
            .ok_or_else(|| AppError::InvalidData("invoice has no lines".to_string()))?;

        let invoice_amount = first.invoice_amount.ok_or_else(|| {
            AppError::InvalidData(format!(
                "invoice '{}' has no invoice amount on its first line",
                first.invoice_num
            ))
        })?;

        Ok(Self {
            invoice_num: first.invoice_num.trim().to_string(),
            vendor_id: first.vendor_id.trim().to_string(),
            invoice_date: first.invoice_date,
            due_date: first.due_date,
            invoice_amount,
            po_num: first.po_num(),
            document_id: first.document_id.trim().to_string(),
        })
    }
}

// ============================================================================
// Line Routing
// ============================================================================

/// How one invoice line is created in the ERP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRoute {
    /// PO line with an open receipt: select and invoice the receipt line
    PoReceipt { po_num: i32, receipt_index: usize },
    /// PO line with no receipt yet: unreceived detail line
    PoUnreceived { po_num: i32, po_line: Option<i32> },
    /// No usable PO number: miscellaneous expense line
    Misc,
}

impl LineRoute {
    /// `header_po_num` is the invoice header's PO number, used when the line
    /// has none of its own. `open_receipts` are the uninvoiced receipt lines
    /// returned for that PO; pass an empty slice for lines without a PO number.
    pub fn classify(
        line: &InvoiceLine,
        header_po_num: Option<i32>,
        open_receipts: &[UninvoicedRcptLine],
    ) -> Self {
        let Some(po_num) = line.po_num_or(header_po_num) else {
            return LineRoute::Misc;
        };

        let matching = open_receipts.iter().position(|receipt| {
            receipt.po_num == po_num
                && match line.po_line {
                    Some(po_line) => receipt.po_line == po_line,
                    None => same_part(&receipt.part_num, &line.product_code),
                }
        });

        match matching {
            Some(receipt_index) => LineRoute::PoReceipt { po_num, receipt_index },
            None => LineRoute::PoUnreceived {
                po_num,
                po_line: line.po_line,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineRoute::PoReceipt { .. } => "receipt",
            LineRoute::PoUnreceived { .. } => "unreceived",
            LineRoute::Misc => "misc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(invoice_num: &str, po: &str) -> InvoiceLine {
        InvoiceLine {
            invoice_num: invoice_num.to_string(),
            po_number: po.to_string(),
            ..Default::default()
        }
    }

    fn receipt(po_num: i32, po_line: i32, part: &str) -> UninvoicedRcptLine {
        UninvoicedRcptLine {
            po_num,
            po_line,
            part_num: part.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_po_num_requires_positive_integer() {
        assert_eq!(line("A", "1001").po_num(), Some(1001));
        assert_eq!(line("A", " 42 ").po_num(), Some(42));
        assert_eq!(line("A", "").po_num(), None);
        assert_eq!(line("A", "0").po_num(), None);
        assert_eq!(line("A", "-5").po_num(), None);
        assert_eq!(line("A", "PO-1001").po_num(), None);
    }

    #[test]
    fn test_misc_part_num_fallback_order() {
        let mut l = line("INV2", "");
        assert_eq!(l.misc_part_num(), "INV2");
        l.description = "Office Supplies".to_string();
        assert_eq!(l.misc_part_num(), "Office Supplies");
        l.product_code = "OS-1".to_string();
        assert_eq!(l.misc_part_num(), "OS-1");
        l.product_label = "Paper".to_string();
        assert_eq!(l.misc_part_num(), "Paper");
    }

    #[test]
    fn test_header_comes_from_first_line() {
        let first = InvoiceLine {
            invoice_num: "INV1".to_string(),
            vendor_id: "ACME".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 31),
            invoice_amount: Some(dec!(150.00)),
            po_number: "1001".to_string(),
            ..Default::default()
        };
        let second = InvoiceLine {
            invoice_num: "INV1".to_string(),
            vendor_id: "OTHER".to_string(),
            invoice_date: None,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            invoice_amount: Some(dec!(99.00)),
            po_number: "".to_string(),
            ..Default::default()
        };

        let header = InvoiceHeader::from_lines(&[first, second]).unwrap();

        assert_eq!(header.vendor_id, "ACME");
        assert_eq!(header.invoice_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(header.due_date, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(header.invoice_amount, dec!(150.00));
        assert_eq!(header.po_num, Some(1001));
    }

    #[test]
    fn test_header_requires_amount() {
        let result = InvoiceHeader::from_lines(&[line("INV1", "")]);
        assert!(matches!(result, Err(AppError::InvalidData(_))));
        assert!(InvoiceHeader::from_lines(&[]).is_err());
    }

    #[test]
    fn test_classify_receipt_by_po_line() {
        let mut l = line("INV1", "1001");
        l.po_line = Some(1);
        l.product_code = "W100".to_string();
        let receipts = vec![receipt(1001, 2, "W200"), receipt(1001, 1, "W100")];

        assert_eq!(
            LineRoute::classify(&l, None, &receipts),
            LineRoute::PoReceipt { po_num: 1001, receipt_index: 1 }
        );
    }

    #[test]
    fn test_classify_unreceived_when_no_matching_receipt() {
        let mut l = line("INV1", "1001");
        l.po_line = Some(3);
        let receipts = vec![receipt(1001, 1, "W100")];

        assert_eq!(
            LineRoute::classify(&l, None, &receipts),
            LineRoute::PoUnreceived { po_num: 1001, po_line: Some(3) }
        );
        assert_eq!(
            LineRoute::classify(&l, None, &[]),
            LineRoute::PoUnreceived { po_num: 1001, po_line: Some(3) }
        );
    }

    #[test]
    fn test_classify_misc_for_non_numeric_po() {
        let receipts = vec![receipt(1001, 1, "W100")];
        assert_eq!(LineRoute::classify(&line("INV2", ""), None, &receipts), LineRoute::Misc);
        assert_eq!(LineRoute::classify(&line("INV2", "N/A"), None, &receipts), LineRoute::Misc);
    }

    #[test]
    fn test_classify_blank_po_falls_back_to_header_po() {
        let mut continuation = line("INV9", "");
        continuation.po_line = Some(3);
        let receipts = vec![receipt(1001, 1, "W100")];

        assert_eq!(
            LineRoute::classify(&continuation, Some(1001), &receipts),
            LineRoute::PoUnreceived { po_num: 1001, po_line: Some(3) }
        );
        assert_eq!(LineRoute::classify(&continuation, None, &receipts), LineRoute::Misc);

        // The line's own PO wins over the header's
        let mut other_po = line("INV9", "2002");
        other_po.po_line = Some(1);
        assert_eq!(
            LineRoute::classify(&other_po, Some(1001), &[receipt(2002, 1, "W100")]),
            LineRoute::PoReceipt { po_num: 2002, receipt_index: 0 }
        );
    }

    #[test]
    fn test_classify_part_match_is_case_insensitive() {
        let mut l = line("INV3", "1001");
        l.product_code = "abc-123".to_string();
        let receipts = vec![receipt(1001, 4, "W100"), receipt(1001, 5, "ABC-123")];

        assert_eq!(
            LineRoute::classify(&l, None, &receipts),
            LineRoute::PoReceipt { po_num: 1001, receipt_index: 1 }
        );
    }

    #[test]
    fn test_classify_ignores_receipts_for_other_pos() {
        let mut l = line("INV1", "1001");
        l.po_line = Some(1);
        let receipts = vec![receipt(2002, 1, "W100")];

        assert!(matches!(
            LineRoute::classify(&l, None, &receipts),
            LineRoute::PoUnreceived { .. }
        ));
    }
}
