// AP invoice group and lookup calls
// Entity-set queries used before and around the per-invoice workflow

use serde::Deserialize;
use serde_json::json;

use super::epicor_client::{odata_quote, EpicorClient, EpicorError, Result};
use crate::utils::log_sanitizer::sanitize_for_log;

pub const AP_INVOICE_SERVICE: &str = "Erp.BO.APInvoiceSvc";
pub const AP_GROUP_SERVICE: &str = "Erp.BO.APInvGrpSvc";
pub const VENDOR_SERVICE: &str = "Erp.BO.VendorSvc";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApInvoiceGroup {
    #[serde(rename = "GroupID")]
    pub group_id: String,
    #[serde(default)]
    pub company: String,
}

/// Identity of an AP invoice header already in the ERP
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExistingInvoice {
    pub vendor_num: i32,
    pub invoice_num: String,
    #[serde(rename = "GroupID", default)]
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorRef {
    vendor_num: i32,
}

pub struct ApInvoiceService<'a> {
    client: &'a EpicorClient,
}

impl<'a> ApInvoiceService<'a> {
    pub fn new(client: &'a EpicorClient) -> Self {
        Self { client }
    }

    /// Fetch the invoice group, creating it when it does not exist yet
    pub async fn ensure_group(&self, group_id: &str) -> Result<ApInvoiceGroup> {
        tracing::info!("Looking for invoice group {}", group_id);

        let filter = format!("GroupID eq {}", odata_quote(group_id));
        let existing: Vec<ApInvoiceGroup> = self
            .client
            .list(AP_GROUP_SERVICE, "APInvGrps", &filter, None)
            .await?;

        if let Some(group) = existing.into_iter().next() {
            tracing::info!("Found invoice group {}", group_id);
            return Ok(group);
        }

        tracing::info!("Creating invoice group {}", group_id);
        self.client
            .create(
                AP_GROUP_SERVICE,
                "APInvGrps",
                &json!({
                    "Company": self.client.company(),
                    "GroupID": group_id,
                }),
            )
            .await?;

        Ok(ApInvoiceGroup {
            group_id: group_id.to_string(),
            company: self.client.company().to_string(),
        })
    }

    /// Release the group so it can be posted from the ERP client
    pub async fn unlock_group(&self, group_id: &str) -> Result<()> {
        tracing::info!("Unlocking invoice group {}", group_id);
        self.client
            .call_method(AP_GROUP_SERVICE, "UnlockGroup", &json!({ "groupID": group_id }))
            .await?;
        Ok(())
    }

    pub async fn find_invoice_header(&self, invoice_num: &str, group_id: &str) -> Result<Option<ExistingInvoice>> {
        let filter = format!(
            "InvoiceNum eq {} and GroupID eq {}",
            odata_quote(invoice_num),
            odata_quote(group_id)
        );
        let found: Vec<ExistingInvoice> = self
            .client
            .list(
                AP_INVOICE_SERVICE,
                "APInvHeds",
                &filter,
                Some("VendorNum,InvoiceNum,GroupID"),
            )
            .await?;

        Ok(found.into_iter().next())
    }

    pub async fn vendor_num_by_id(&self, vendor_id: &str) -> Result<i32> {
        let vendor_label = sanitize_for_log(vendor_id);
        tracing::info!("Looking up VendorNum for vendor '{}'", vendor_label);

        let filter = format!("VendorID eq {}", odata_quote(vendor_id));
        let vendors: Vec<VendorRef> = self
            .client
            .list(VENDOR_SERVICE, "Vendors", &filter, Some("VendorNum,VendorID"))
            .await?;

        vendors
            .first()
            .map(|v| v.vendor_num)
            .ok_or_else(|| EpicorError::NotFound(format!("vendor with ID '{}'", vendor_label)))
    }
}
