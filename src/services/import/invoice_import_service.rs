// Invoice Import Service
// Replays one logical vendor invoice as APInvoiceSvc calls: header first
// (unless it already exists in the group), then each line by its route.

use chrono::Local;

use crate::models::invoice::{InvoiceHeader, InvoiceLine, LineRoute, LogicalInvoice};
use crate::services::erp::invoice_session::{epicor_date, InvoiceSession};
use crate::services::erp::{ApInvoiceService, EpicorClient, EpicorError};
use crate::utils::error_handling::Result;
use crate::utils::log_sanitizer::sanitize_for_log;

/// Result of importing one logical invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedInvoice {
    pub invoice_num: String,
    pub vendor_num: i32,
    pub header_created: bool,
    pub lines_imported: usize,
}

/// `SegValue1|SegValue2|SegValue3`; inner blank segments keep their position,
/// trailing blank segments are dropped
pub fn gl_account_code(segments: &[&str]) -> String {
    let trimmed: Vec<&str> = segments.iter().map(|s| s.trim()).collect();
    let used = trimmed
        .iter()
        .rposition(|s| !s.is_empty())
        .map_or(0, |last| last + 1);
    trimmed[..used].join("|")
}

pub struct InvoiceImportService<'a> {
    client: &'a EpicorClient,
    lookups: ApInvoiceService<'a>,
    group_id: String,
}

impl<'a> InvoiceImportService<'a> {
    pub fn new(client: &'a EpicorClient, group_id: impl Into<String>) -> Self {
        Self {
            client,
            lookups: ApInvoiceService::new(client),
            group_id: group_id.into(),
        }
    }

    pub async fn import_invoice(&self, invoice: &LogicalInvoice) -> Result<ImportedInvoice> {
        let header = InvoiceHeader::from_lines(&invoice.lines)?;
        let invoice_label = sanitize_for_log(&header.invoice_num);

        tracing::info!("Adding invoice '{}' to group '{}'", invoice_label, self.group_id);

        let existing = self
            .lookups
            .find_invoice_header(&header.invoice_num, &self.group_id)
            .await?;

        let (vendor_num, header_created) = match existing {
            Some(found) => {
                tracing::info!(
                    "Invoice '{}' already exists for vendor {}, adding lines only",
                    invoice_label,
                    found.vendor_num
                );
                (found.vendor_num, false)
            }
            None => (self.create_header(&header).await?, true),
        };

        for (index, line) in invoice.lines.iter().enumerate() {
            self.import_line(vendor_num, &header, line).await?;
            tracing::debug!("Invoice '{}' line {} imported", invoice_label, index + 1);
        }

        tracing::info!(
            "Invoice '{}' imported with {} line(s)",
            invoice_label,
            invoice.lines.len()
        );

        Ok(ImportedInvoice {
            invoice_num: header.invoice_num,
            vendor_num,
            header_created,
            lines_imported: invoice.lines.len(),
        })
    }

    // ========================================================================
    // Header
    // ========================================================================

    async fn create_header(&self, header: &InvoiceHeader) -> Result<i32> {
        let mut session = InvoiceSession::open_new(self.client, &self.group_id).await?;

        session = match header.po_num {
            Some(po_num) => session.change_ref_po_num(po_num).await?,
            None => {
                let vendor_num = self.lookups.vendor_num_by_id(&header.vendor_id).await?;
                session.change_vendor_id(vendor_num, &header.vendor_id).await?
            }
        };

        let invoice_date = header.invoice_date.unwrap_or_else(|| Local::now().date_naive());
        session = session
            .change_invoice_date(invoice_date)
            .await?
            .change_invoice_amount(header.invoice_amount)
            .await?;

        session = session.edit_header(|h| {
            h.invoice_num = header.invoice_num.clone();
            if !header.document_id.is_empty() {
                h.document_id = Some(header.document_id.clone());
            }
            if let Some(due_date) = header.due_date {
                h.due_date = Some(epicor_date(due_date));
            }
        })?;

        let session = session.update().await?;
        let vendor_num = session.header()?.vendor_num;

        tracing::info!(
            "Invoice '{}' created for vendor {}",
            sanitize_for_log(&header.invoice_num),
            vendor_num
        );
        Ok(vendor_num)
    }

    // ========================================================================
    // Lines
    // ========================================================================

    async fn import_line(&self, vendor_num: i32, header: &InvoiceHeader, line: &InvoiceLine) -> Result<()> {
        let session = InvoiceSession::fetch(self.client, vendor_num, &header.invoice_num).await?;

        let (route, session) = match line.po_num_or(header.po_num) {
            Some(po_num) => {
                let session = session.get_uninvoiced_receipts(po_num).await?;
                (LineRoute::classify(line, header.po_num, session.receipt_lines()), session)
            }
            None => (LineRoute::Misc, session),
        };

        tracing::info!(
            "Adding {} line for '{}'",
            route.label(),
            sanitize_for_log(line.misc_part_num())
        );

        let session = match route {
            LineRoute::PoReceipt { po_num, receipt_index } => {
                let session = session
                    .select_receipt_line(receipt_index)?
                    .select_uninvoiced_receipt_lines()
                    .await?
                    .invoice_selected_lines()
                    .await?;
                self.finish_po_line(session, po_num, line).await?
            }
            LineRoute::PoUnreceived { po_num, po_line } => {
                let mut session = session
                    .new_unreceived_line()
                    .await?
                    .change_unreceived_po_num(po_num)
                    .await?;
                if let Some(po_line) = po_line {
                    session = session.change_unreceived_po_line(po_line).await?;
                }
                // Save the new line so the re-fetch below returns it
                let session = session.update().await?;
                self.finish_po_line(session, po_num, line).await?
            }
            LineRoute::Misc => self.add_misc_line(session, header, line).await?,
        };

        session
            .edit_latest_gl_allocation(|gl| {
                gl.seg_value1 = line.gl_account.trim().to_string();
                gl.seg_value2 = line.entity.trim().to_string();
                gl.seg_value3 = line.cost_center.trim().to_string();
                gl.gl_account = gl_account_code(&[
                    gl.seg_value1.as_str(),
                    gl.seg_value2.as_str(),
                    gl.seg_value3.as_str(),
                ]);
            })?
            .update()
            .await?;

        Ok(())
    }

    /// Locate the line the server produced for this PO line and set its amounts
    async fn finish_po_line<'s>(
        &self,
        session: InvoiceSession<'s>,
        po_num: i32,
        line: &InvoiceLine,
    ) -> Result<InvoiceSession<'s>> {
        let mut session = session.reload().await?;

        let index = session
            .dataset()
            .find_detail(Some(po_num), line.po_line, &line.product_code)
            .ok_or_else(|| EpicorError::MissingRow("APInvDtl row for PO line".to_string()))?;

        if let Some(quantity) = line.invoice_qty {
            session = session.change_vendor_qty(index, quantity).await?;
        }
        if let Some(unit_price) = line.unit_price {
            session = session.change_unit_cost(index, unit_price).await?;
        }

        Ok(session.update().await?)
    }

    async fn add_misc_line<'s>(
        &self,
        session: InvoiceSession<'s>,
        header: &InvoiceHeader,
        line: &InvoiceLine,
    ) -> Result<InvoiceSession<'s>> {
        let session = session.new_misc_line().await?;
        let index = session
            .dataset()
            .details
            .len()
            .checked_sub(1)
            .ok_or_else(|| EpicorError::MissingRow("new miscellaneous APInvDtl row".to_string()))?;

        let ext_cost = line.invoice_amount.unwrap_or(header.invoice_amount);

        let session = session
            .edit_detail(index, |d| {
                d.part_num = line.misc_part_num().to_string();
                d.description = line.description.trim().to_string();
            })?
            .change_ext_cost(index, ext_cost)
            .await?
            .update()
            .await?;

        Ok(session)
    }
}
