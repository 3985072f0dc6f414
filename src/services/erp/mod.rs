// ERP Integration Module
// Epicor REST client, AP invoice group lookups and the per-invoice session

pub mod ap_invoice_service;
pub mod epicor_client;
pub mod invoice_session;

pub use ap_invoice_service::{ApInvoiceGroup, ApInvoiceService, ExistingInvoice};
pub use epicor_client::{EpicorClient, EpicorConfig, EpicorError, MethodResponse};
pub use invoice_session::InvoiceSession;
