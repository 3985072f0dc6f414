pub mod invoice_import_service;
pub mod invoice_parser;

pub use invoice_import_service::{ImportedInvoice, InvoiceImportService};
pub use invoice_parser::{group_invoices, parse_invoice_file, parse_invoice_lines};
