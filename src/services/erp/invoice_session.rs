// AP Invoice Session
// Threads one invoice's server-side dataset through the APInvoiceSvc call chain.
// Every step takes the session by value and hands back the dataset the server
// returned, so a step can never run against a stale copy.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::ap_invoice_service::AP_INVOICE_SERVICE;
use super::epicor_client::{EpicorClient, EpicorError, Result};
use crate::models::ap_invoice::{
    ApInvDtl, ApInvExpGl, ApInvHed, ApInvoiceDataset, UninvoicedRcptLine, ROW_MOD_UPDATED,
};

/// Date layout the business objects accept for proposed dates
pub fn epicor_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00").to_string()
}

fn mark_updated(row_mod: &mut String) {
    if row_mod.is_empty() {
        *row_mod = ROW_MOD_UPDATED.to_string();
    }
}

pub struct InvoiceSession<'a> {
    client: &'a EpicorClient,
    dataset: ApInvoiceDataset,
}

impl<'a> InvoiceSession<'a> {
    // ========================================================================
    // Opening a Session
    // ========================================================================

    /// Start a new invoice header inside `group_id`
    pub async fn open_new(client: &'a EpicorClient, group_id: &str) -> Result<Self> {
        let session = Self {
            client,
            dataset: ApInvoiceDataset::default(),
        };
        session
            .propose("GetNewAPInvHedInvoice", json!({ "cGroupID": group_id }))
            .await
    }

    /// Load an existing invoice by its key
    pub async fn fetch(client: &'a EpicorClient, vendor_num: i32, invoice_num: &str) -> Result<Self> {
        let session = Self {
            client,
            dataset: ApInvoiceDataset::default(),
        };
        session.get_by_id(vendor_num, invoice_num).await
    }

    /// Reload the full invoice so newly created lines and allocations are present
    pub async fn reload(self) -> Result<Self> {
        let (vendor_num, invoice_num) = {
            let header = self.header()?;
            (header.vendor_num, header.invoice_num.clone())
        };
        self.get_by_id(vendor_num, &invoice_num).await
    }

    async fn get_by_id(self, vendor_num: i32, invoice_num: &str) -> Result<Self> {
        let response = self
            .client
            .call_method(
                AP_INVOICE_SERVICE,
                "GetByID",
                &json!({ "vendorNum": vendor_num, "invoiceNum": invoice_num }),
            )
            .await?;

        let ds = response.into_dataset().ok_or_else(|| EpicorError::MissingDataset {
            service: AP_INVOICE_SERVICE.to_string(),
            method: "GetByID".to_string(),
        })?;

        Ok(Self {
            client: self.client,
            dataset: serde_json::from_value(ds)?,
        })
    }

    // ========================================================================
    // Dataset Access
    // ========================================================================

    pub fn dataset(&self) -> &ApInvoiceDataset {
        &self.dataset
    }

    pub fn header(&self) -> Result<&ApInvHed> {
        self.dataset
            .header()
            .ok_or_else(|| EpicorError::MissingRow("APInvHed row".to_string()))
    }

    pub fn receipt_lines(&self) -> &[UninvoicedRcptLine] {
        &self.dataset.receipt_lines
    }

    /// Apply a local change without a server round trip; fails when the row it
    /// needs is absent
    fn try_edit(mut self, change: impl FnOnce(&mut ApInvoiceDataset) -> Result<()>) -> Result<Self> {
        change(&mut self.dataset)?;
        Ok(self)
    }

    /// Change header columns directly and flag the header as updated
    pub fn edit_header(self, change: impl FnOnce(&mut ApInvHed)) -> Result<Self> {
        self.try_edit(|ds| {
            let header = ds
                .header_mut()
                .ok_or_else(|| EpicorError::MissingRow("APInvHed row".to_string()))?;
            change(header);
            mark_updated(&mut header.row_mod);
            Ok(())
        })
    }

    /// Change one detail line directly, making it the only flagged row
    pub fn edit_detail(self, index: usize, change: impl FnOnce(&mut ApInvDtl)) -> Result<Self> {
        self.try_edit(|ds| {
            if index >= ds.details.len() {
                return Err(EpicorError::MissingRow(format!("APInvDtl row {}", index)));
            }
            ds.focus_detail(index);
            change(&mut ds.details[index]);
            Ok(())
        })
    }

    /// Change the newest GL distribution row
    pub fn edit_latest_gl_allocation(self, change: impl FnOnce(&mut ApInvExpGl)) -> Result<Self> {
        self.try_edit(|ds| {
            let allocation = ds
                .latest_gl_allocation_mut()
                .ok_or_else(|| EpicorError::MissingRow("APInvExpTGLC row".to_string()))?;
            change(allocation);
            mark_updated(&mut allocation.row_mod);
            Ok(())
        })
    }

    // ========================================================================
    // Remote Calls
    // ========================================================================

    /// Send the dataset plus method arguments and adopt the dataset that comes back
    async fn propose(self, method: &str, arguments: Value) -> Result<Self> {
        let mut body = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("ds".to_string(), serde_json::to_value(&self.dataset)?);

        let response = self
            .client
            .call_method(AP_INVOICE_SERVICE, method, &Value::Object(body))
            .await?;

        let ds = response.into_dataset().ok_or_else(|| EpicorError::MissingDataset {
            service: AP_INVOICE_SERVICE.to_string(),
            method: method.to_string(),
        })?;

        Ok(Self {
            client: self.client,
            dataset: serde_json::from_value(ds)?,
        })
    }

    fn invoice_key(&self) -> Result<Value> {
        let header = self.header()?;
        Ok(json!({
            "vendorNum": header.vendor_num,
            "invoiceNum": header.invoice_num,
        }))
    }

    fn newest_detail(&self) -> Result<usize> {
        self.dataset
            .details
            .len()
            .checked_sub(1)
            .ok_or_else(|| EpicorError::MissingRow("APInvDtl row".to_string()))
    }

    pub async fn update(self) -> Result<Self> {
        self.propose("Update", json!({})).await
    }

    // ---- header ----

    pub async fn change_ref_po_num(self, po_num: i32) -> Result<Self> {
        self.edit_header(|h| h.ref_po_num = po_num)?
            .propose("ChangeRefPONum", json!({ "ProposedRefPONum": po_num }))
            .await
    }

    pub async fn change_vendor_id(self, vendor_num: i32, vendor_id: &str) -> Result<Self> {
        self.edit_header(|h| {
            h.vendor_num = vendor_num;
            h.vendor_id = vendor_id.to_string();
        })?
        .propose("ChangeVendorID", json!({ "ProposedVendorID": vendor_id }))
        .await
    }

    pub async fn change_invoice_date(self, date: NaiveDate) -> Result<Self> {
        let proposed = epicor_date(date);
        self.edit_header(|h| h.invoice_date = Some(proposed.clone()))?
            .propose(
                "ChangeInvoiceDateEx",
                json!({ "ProposedInvoiceDate": proposed, "RecalcAmts": "" }),
            )
            .await
    }

    pub async fn change_invoice_amount(self, amount: Decimal) -> Result<Self> {
        self.edit_header(|h| h.invoice_vendor_amt = amount)?
            .propose("ChangeInvoiceVendorAmt", json!({ "ProposedInvoiceVendorAmt": amount }))
            .await
    }

    // ---- receipt lines ----

    pub async fn get_uninvoiced_receipts(self, po_num: i32) -> Result<Self> {
        let mut arguments = self.invoice_key()?;
        arguments["poNum"] = json!(po_num);
        self.propose("GetAPUninvoicedReceipts", arguments).await
    }

    pub fn select_receipt_line(self, index: usize) -> Result<Self> {
        self.try_edit(|ds| {
            let receipt = ds
                .receipt_lines
                .get_mut(index)
                .ok_or_else(|| EpicorError::MissingRow(format!("APUninvoicedRcptLines row {}", index)))?;
            receipt.select_line = true;
            receipt.row_mod = ROW_MOD_UPDATED.to_string();
            Ok(())
        })
    }

    pub async fn select_uninvoiced_receipt_lines(self) -> Result<Self> {
        self.propose("SelectUninvoicedRcptLines", json!({})).await
    }

    pub async fn invoice_selected_lines(self) -> Result<Self> {
        self.propose("InvoiceSelectedLines", json!({})).await
    }

    // ---- unreceived PO lines ----

    pub async fn new_unreceived_line(self) -> Result<Self> {
        let arguments = self.invoice_key()?;
        self.propose("GetNewAPInvDtlUnreceived", arguments).await
    }

    pub async fn change_unreceived_po_num(self, po_num: i32) -> Result<Self> {
        let index = self.newest_detail()?;
        self.edit_detail(index, |d| d.po_num = po_num)?
            .propose("ChangeUnrcvPONum", json!({ "ProposedPONum": po_num }))
            .await
    }

    pub async fn change_unreceived_po_line(self, po_line: i32) -> Result<Self> {
        let index = self.newest_detail()?;
        self.edit_detail(index, |d| d.po_line = po_line)?
            .propose("ChangeUnrcvPOLine", json!({ "ProposedPOLine": po_line }))
            .await
    }

    // ---- line amounts ----

    pub async fn change_vendor_qty(self, index: usize, quantity: Decimal) -> Result<Self> {
        self.edit_detail(index, |d| d.vendor_qty = quantity)?
            .propose("ChangeVendorQty", json!({ "ProposedVendorQty": quantity }))
            .await
    }

    pub async fn change_unit_cost(self, index: usize, unit_cost: Decimal) -> Result<Self> {
        self.edit_detail(index, |d| d.unit_cost = unit_cost)?
            .propose("ChangeUnitCost", json!({ "ProposedUnitCost": unit_cost }))
            .await
    }

    // ---- miscellaneous lines ----

    pub async fn new_misc_line(self) -> Result<Self> {
        let arguments = self.invoice_key()?;
        self.propose("GetNewAPInvDtlMiscellaneous", arguments).await
    }

    pub async fn change_ext_cost(self, index: usize, ext_cost: Decimal) -> Result<Self> {
        self.edit_detail(index, |d| d.ext_cost = ext_cost)?
            .propose("ChangeExtCost", json!({ "ProposedExtCost": ext_cost }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epicor_date_has_midnight_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(epicor_date(date), "2024-03-15T00:00:00");
    }

    #[test]
    fn test_mark_updated_keeps_added_rows() {
        let mut added = "A".to_string();
        mark_updated(&mut added);
        assert_eq!(added, "A");

        let mut unchanged = String::new();
        mark_updated(&mut unchanged);
        assert_eq!(unchanged, "U");
    }
}
