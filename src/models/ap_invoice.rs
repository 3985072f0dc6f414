// Epicor AP invoice dataset (Erp.BO.APInvoiceSvc tableset)
// Typed fields are the ones the import workflow reads or proposes changes to.
// Every other column the server sends is kept in `extra` and sent back as-is,
// since business-object methods expect whole rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ROW_MOD_UPDATED: &str = "U";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApInvoiceDataset {
    #[serde(rename = "APInvHed", default)]
    pub headers: Vec<ApInvHed>,

    #[serde(rename = "APInvDtl", default)]
    pub details: Vec<ApInvDtl>,

    #[serde(rename = "APInvExpTGLC", default)]
    pub gl_allocations: Vec<ApInvExpGl>,

    #[serde(rename = "APUninvoicedRcptLines", default)]
    pub receipt_lines: Vec<UninvoicedRcptLine>,

    #[serde(flatten)]
    pub other_tables: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApInvHed {
    pub company: String,
    #[serde(rename = "GroupID")]
    pub group_id: String,
    pub vendor_num: i32,
    #[serde(rename = "VendorNumVendorID")]
    pub vendor_id: String,
    pub invoice_num: String,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub invoice_vendor_amt: Decimal,
    #[serde(rename = "REFPONum")]
    pub ref_po_num: i32,
    /// Only present when the company has the Yooz document field configured
    #[serde(rename = "YoozDocumentID_c", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub row_mod: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApInvDtl {
    pub company: String,
    pub vendor_num: i32,
    pub invoice_num: String,
    pub invoice_line: i32,
    pub line_type: String,
    pub part_num: String,
    pub description: String,
    #[serde(rename = "PONum")]
    pub po_num: i32,
    #[serde(rename = "POLine")]
    pub po_line: i32,
    pub vendor_qty: Decimal,
    pub unit_cost: Decimal,
    pub ext_cost: Decimal,
    pub row_mod: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GL distribution row for an invoice line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApInvExpGl {
    pub company: String,
    pub vendor_num: i32,
    pub invoice_num: String,
    pub invoice_line: i32,
    pub inv_expense_seq: i32,
    #[serde(rename = "GLAccount")]
    pub gl_account: String,
    pub seg_value1: String,
    pub seg_value2: String,
    pub seg_value3: String,
    pub row_mod: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Received-but-not-invoiced PO receipt line offered for selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UninvoicedRcptLine {
    pub vendor_num: i32,
    pub pack_slip: String,
    pub pack_line: i32,
    #[serde(rename = "PONum")]
    pub po_num: i32,
    #[serde(rename = "POLine")]
    pub po_line: i32,
    pub part_num: String,
    pub select_line: bool,
    pub row_mod: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Case-insensitive part number comparison; blank never matches
pub fn same_part(left: &str, right: &str) -> bool {
    let left = left.trim();
    let right = right.trim();
    !left.is_empty() && left.to_lowercase() == right.to_lowercase()
}

impl ApInvoiceDataset {
    pub fn header(&self) -> Option<&ApInvHed> {
        self.headers.first()
    }

    pub fn header_mut(&mut self) -> Option<&mut ApInvHed> {
        self.headers.first_mut()
    }

    /// Index of the detail line produced for a PO line, falling back to a
    /// case-insensitive part number match, then to the newest line
    pub fn find_detail(&self, po_num: Option<i32>, po_line: Option<i32>, part_num: &str) -> Option<usize> {
        let by_po_line = match (po_num, po_line) {
            (Some(po), Some(line)) => self
                .details
                .iter()
                .rposition(|d| d.po_num == po && d.po_line == line),
            _ => None,
        };

        by_po_line
            .or_else(|| self.details.iter().rposition(|d| same_part(&d.part_num, part_num)))
            .or_else(|| self.details.len().checked_sub(1))
    }

    /// Flag one detail line as the row being changed. Rows the server has
    /// marked as added keep their flag.
    pub fn focus_detail(&mut self, index: usize) {
        for (i, detail) in self.details.iter_mut().enumerate() {
            if i == index {
                if detail.row_mod.is_empty() {
                    detail.row_mod = ROW_MOD_UPDATED.to_string();
                }
            } else if detail.row_mod == ROW_MOD_UPDATED {
                detail.row_mod.clear();
            }
        }
    }

    /// The most recently added GL distribution row
    pub fn latest_gl_allocation_mut(&mut self) -> Option<&mut ApInvExpGl> {
        self.gl_allocations.last_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_columns_round_trip() {
        let raw = json!({
            "APInvHed": [{
                "Company": "EPIC06",
                "GroupID": "Y_031524",
                "VendorNum": 12,
                "InvoiceNum": "INV1",
                "InvoiceVendorAmt": 42.5,
                "TermsCode": "N30",
                "SysRowID": "abc"
            }],
            "APInvDtl": [],
            "ExtraTable": [{"Key": 1}]
        });

        let ds: ApInvoiceDataset = serde_json::from_value(raw).unwrap();
        let head = ds.header().unwrap();
        assert_eq!(head.vendor_num, 12);
        assert_eq!(head.extra.get("TermsCode"), Some(&json!("N30")));
        assert!(head.document_id.is_none());

        let back = serde_json::to_value(&ds).unwrap();
        assert_eq!(back["APInvHed"][0]["SysRowID"], "abc");
        assert_eq!(back["ExtraTable"][0]["Key"], 1);
        assert!(back["APInvHed"][0].get("YoozDocumentID_c").is_none());
    }

    #[test]
    fn test_find_detail_prefers_po_line_then_part() {
        let mut ds = ApInvoiceDataset::default();
        ds.details.push(ApInvDtl { po_num: 1001, po_line: 1, part_num: "W100".into(), ..Default::default() });
        ds.details.push(ApInvDtl { po_num: 1001, po_line: 2, part_num: "ABC-123".into(), ..Default::default() });
        ds.details.push(ApInvDtl { part_num: "MISC".into(), ..Default::default() });

        assert_eq!(ds.find_detail(Some(1001), Some(1), ""), Some(0));
        assert_eq!(ds.find_detail(Some(1001), None, "abc-123"), Some(1));
        assert_eq!(ds.find_detail(None, None, "unknown"), Some(2));
        assert_eq!(ApInvoiceDataset::default().find_detail(None, None, "x"), None);
    }

    #[test]
    fn test_focus_detail_marks_single_row() {
        let mut ds = ApInvoiceDataset::default();
        ds.details.push(ApInvDtl::default());
        ds.details.push(ApInvDtl::default());

        ds.focus_detail(1);
        assert_eq!(ds.details[0].row_mod, "");
        assert_eq!(ds.details[1].row_mod, "U");

        ds.focus_detail(0);
        assert_eq!(ds.details[0].row_mod, "U");
        assert_eq!(ds.details[1].row_mod, "");
    }

    #[test]
    fn test_focus_detail_keeps_added_flag() {
        let mut ds = ApInvoiceDataset::default();
        ds.details.push(ApInvDtl { row_mod: "U".into(), ..Default::default() });
        ds.details.push(ApInvDtl { row_mod: "A".into(), ..Default::default() });

        ds.focus_detail(1);

        assert_eq!(ds.details[0].row_mod, "");
        assert_eq!(ds.details[1].row_mod, "A");
    }

    #[test]
    fn test_same_part_ignores_case_and_blank() {
        assert!(same_part("ABC-123", "abc-123"));
        assert!(same_part(" w100 ", "W100"));
        assert!(!same_part("", ""));
        assert!(!same_part("W100", "W101"));
    }
}
