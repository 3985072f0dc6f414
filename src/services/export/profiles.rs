// Export column layouts
// Column order here is the vendor's fixed import layout; labels are only
// written when a header row or default preamble header is requested.

use crate::models::export::{ColumnSpec, ExportProfile};

// ============================================================================
// Chart of Accounts
// ============================================================================

/// Action and classification resolved by calculated BAQ fields
pub const CHART_OF_ACCOUNTS_CALCULATED: ExportProfile = ExportProfile {
    name: "calculated",
    columns: &[
        ColumnSpec::text("GL Account Number", "Calculated_Account"),
        ColumnSpec::text("GL Account Label", "Calculated_Description"),
        ColumnSpec::text("Classification", "Calculated_Classification"),
        ColumnSpec::text("Action", "Calculated_Action"),
    ],
};

/// Raw GL account columns, prefixed with the owning company
pub const CHART_OF_ACCOUNTS_RAW: ExportProfile = ExportProfile {
    name: "raw",
    columns: &[
        ColumnSpec::text("Company", "GLAccount_Company"),
        ColumnSpec::text("GL Account Number", "GLAccount_GLAccount"),
        ColumnSpec::text("GL Account Label", "GLAccount_AccountDesc"),
        ColumnSpec::text("Classification", "GLAccount_Classification"),
        ColumnSpec::text("Action", "GLAccount_Action"),
    ],
};

pub fn chart_of_accounts_profile(name: &str) -> Option<ExportProfile> {
    match name.trim().to_ascii_lowercase().as_str() {
        "calculated" => Some(CHART_OF_ACCOUNTS_CALCULATED),
        "raw" => Some(CHART_OF_ACCOUNTS_RAW),
        _ => None,
    }
}

// ============================================================================
// Vendors
// ============================================================================

pub const VENDOR_FILLER_COLUMNS: usize = 16;

pub const VENDORS: ExportProfile = ExportProfile {
    name: "vendors",
    columns: &[
        ColumnSpec::text("Third_Party_Code", "Vendor_VendorID"),
        ColumnSpec::text("Third_Party_Name", "Vendor_Name"),
        ColumnSpec::text("USA_EIN_or_TIN", "Vendor_TaxPayerID"),
        ColumnSpec::text("Phone_Number", "Vendor_PhoneNum"),
        ColumnSpec::text("Fax_Number", "Vendor_FaxNum"),
        ColumnSpec::text("Website", "Vendor_VendURL"),
        ColumnSpec::text("Address", "Vendor_Address1"),
        ColumnSpec::text("Address2", "Vendor_Address2"),
        ColumnSpec::text("Zip_Code", "Vendor_ZIP"),
        ColumnSpec::text("City", "Vendor_City"),
        ColumnSpec::text("Country_ISO_Code", "Country_ISOCode"),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::blank(),
        ColumnSpec::text("State_Code", "Vendor_State"),
    ],
};

// ============================================================================
// Purchase Orders
// ============================================================================

pub const PURCHASE_ORDERS: ExportProfile = ExportProfile {
    name: "purchase_orders",
    columns: &[
        ColumnSpec::text("Action", "Calculated_Action"),
        ColumnSpec::text("VendorCode", "Vendor_VendorID"),
        ColumnSpec::text("VendorName", "Vendor_Name"),
        ColumnSpec::text("OrderNumber", "POHeader_PONum"),
        ColumnSpec::date("OrderDate", "Calculated_OrderDate"),
        ColumnSpec::amount("Amount", "POHeader_TotalOrder"),
        ColumnSpec::amount("AmountExlTax", "Calculated_AmountExlTax"),
        ColumnSpec::text("Currency", "POHeader_CurrencyCode"),
        ColumnSpec::text("OrderCreator", "UserFile_Name"),
        ColumnSpec::text("OrderApprover", "PurAgent_BuyerID"),
        ColumnSpec::text("Status", "Calculated_Status"),
        // ItemNumber carries the calculated item code and ItemCode the part number
        ColumnSpec::text("ItemNumber", "Calculated_ItemCode"),
        ColumnSpec::text("ItemCode", "PODetail_PartNum"),
        ColumnSpec::text("ItemDescription", "PODetail_LineDesc"),
        ColumnSpec::text("ItemUnitPrice", "PODetail_UnitCost"),
        ColumnSpec::text("QuantityOrdered", "PODetail_OrderQty"),
        ColumnSpec::text("QuantityReceived", "Calculated_QtyReceived"),
        ColumnSpec::text("QuantityCharged", "Calculated_QtyCharged"),
        ColumnSpec::amount("AmountExlTax_Dtl", "Calculated_AmountExlTax_Dtl"),
        ColumnSpec::amount("DiscountedAmount", "Calculated_DiscountedAmount_Dtl"),
        ColumnSpec::text("TaxProfileCode", "Calculated_TaxProfileCode"),
        ColumnSpec::amount("TaxAmount", "Calculated_TaxAmount"),
        ColumnSpec::text("GLAccount", "Calculated_GLAccount"),
        ColumnSpec::text("CostCenterDims", "Calculated_CostCenterDims"),
        ColumnSpec::text("CostCenters", "Calculated_CostCenters"),
        ColumnSpec::text("Subsidiary", "Calculated_Subsidiary"),
        ColumnSpec::text("VendorItemCode", "Calculated_VendorItemCode"),
        ColumnSpec::optional_text("HeaderCustomData", "Calculated_HeaderCustomData"),
        ColumnSpec::optional_text("AccountingCustomData", "Calculated_AccountingCustomData"),
    ],
};

// ============================================================================
// Payments
// ============================================================================

/// The first column becomes the XML document id, the rest become fields
pub const PAYMENTS: ExportProfile = ExportProfile {
    name: "payments",
    columns: &[
        ColumnSpec::text("DOCUMENT_ID", "Calculated_DocumentID"),
        ColumnSpec::text("PAYMENT_REFERENCE", "APTran_CheckNum"),
        ColumnSpec::strict_date("PAYMENT_DATE", "APTran_TranDate"),
        ColumnSpec::strict_amount("PAYMENT_AMOUNT", "Calculated_Amount"),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::export::{ColumnSource, FieldFormat};

    fn position(profile: &ExportProfile, label: &str) -> Option<usize> {
        profile.labels().iter().position(|l| *l == label)
    }

    #[test]
    fn test_vendor_layout() {
        assert_eq!(VENDORS.columns.len(), 11 + VENDOR_FILLER_COLUMNS + 1);
        assert_eq!(position(&VENDORS, "Country_ISO_Code"), Some(10));
        assert_eq!(position(&VENDORS, "State_Code"), Some(27));

        let fillers = VENDORS.columns[11..27]
            .iter()
            .filter(|c| c.source == ColumnSource::Blank)
            .count();
        assert_eq!(fillers, VENDOR_FILLER_COLUMNS);
    }

    #[test]
    fn test_purchase_order_layout() {
        assert_eq!(PURCHASE_ORDERS.columns.len(), 29);
        assert_eq!(position(&PURCHASE_ORDERS, "TaxProfileCode"), Some(20));
        assert_eq!(position(&PURCHASE_ORDERS, "TaxAmount"), Some(21));
        assert_eq!(position(&PURCHASE_ORDERS, "AccountingCustomData"), Some(28));

        let amounts: Vec<_> = PURCHASE_ORDERS
            .columns
            .iter()
            .filter(|c| c.format == FieldFormat::Amount)
            .map(|c| c.label)
            .collect();
        assert_eq!(
            amounts,
            vec!["Amount", "AmountExlTax", "AmountExlTax_Dtl", "DiscountedAmount", "TaxAmount"]
        );
    }

    #[test]
    fn test_chart_of_accounts_profiles() {
        assert_eq!(chart_of_accounts_profile("calculated"), Some(CHART_OF_ACCOUNTS_CALCULATED));
        assert_eq!(chart_of_accounts_profile(" RAW "), Some(CHART_OF_ACCOUNTS_RAW));
        assert_eq!(chart_of_accounts_profile("other"), None);

        assert_eq!(CHART_OF_ACCOUNTS_RAW.labels()[0], "Company");
        assert_eq!(
            CHART_OF_ACCOUNTS_CALCULATED.labels(),
            vec!["GL Account Number", "GL Account Label", "Classification", "Action"]
        );
    }

    #[test]
    fn test_payment_values_are_strict() {
        assert!(PAYMENTS.columns[2..].iter().all(|c| !c.allow_empty));
    }
}
