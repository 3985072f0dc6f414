pub mod ap_invoice;
pub mod export;
pub mod invoice;

pub use ap_invoice::ApInvoiceDataset;
pub use export::{BaqRow, ColumnSpec, ExportKind, ExportProfile, ExportRecord, FieldValue, Preamble};
pub use invoice::{InvoiceHeader, InvoiceLine, LineRoute, LogicalInvoice};
