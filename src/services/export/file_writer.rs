// Export file serialization
// Tab-delimited text for master data, GENERIC_FIELDS XML for payments.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::models::export::{ExportProfile, ExportRecord, Preamble};
use crate::utils::error_handling::{AppError, Result};

const LINE_END: &[u8] = b"\r\n";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

// ============================================================================
// Delimited Text
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DelimitedLayout {
    pub preamble: Option<Preamble>,
    /// Label row before the data. Ignored when a preamble is set, since the
    /// preamble's second line already carries the header.
    pub header_row: bool,
}

impl DelimitedLayout {
    fn writes_label_row(&self) -> bool {
        self.header_row && self.preamble.is_none()
    }
}

pub fn write_delimited<W: Write>(
    mut out: W,
    profile: &ExportProfile,
    layout: &DelimitedLayout,
    records: &[ExportRecord],
) -> Result<()> {
    // Preamble lines are vendor tags, never quoted
    if let Some(preamble) = &layout.preamble {
        out.write_all(preamble.version.as_bytes())?;
        out.write_all(LINE_END)?;
        out.write_all(preamble.header_text(profile).as_bytes())?;
        out.write_all(LINE_END)?;
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .has_headers(false)
        .from_writer(out);

    if layout.writes_label_row() {
        writer.write_record(profile.labels())?;
    }

    for record in records {
        writer.write_record(record.rendered())?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_delimited_file(
    path: &Path,
    profile: &ExportProfile,
    layout: &DelimitedLayout,
    records: &[ExportRecord],
) -> Result<()> {
    let file = File::create(path)?;
    write_delimited(BufWriter::new(file), profile, layout, records)
}

// ============================================================================
// Document XML
// ============================================================================

/// Render records as `<message type="GENERIC_FIELDS">`, one `<document>` per
/// record keyed by the first column, remaining columns as `<field>` elements
pub fn render_document_xml(profile: &ExportProfile, records: &[ExportRecord]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(AppError::xml)?;

    let mut message = BytesStart::new("message");
    message.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    message.push_attribute(("xmlns:xsd", XSD_NAMESPACE));
    message.push_attribute(("type", "GENERIC_FIELDS"));
    writer.write_event(Event::Start(message)).map_err(AppError::xml)?;

    for record in records {
        let values = record.rendered();
        let Some((document_id, fields)) = values.split_first() else {
            continue;
        };

        let mut document = BytesStart::new("document");
        document.push_attribute(("id", document_id.as_str()));
        writer.write_event(Event::Start(document)).map_err(AppError::xml)?;

        for (column, value) in profile.columns.iter().skip(1).zip(fields) {
            let mut field = BytesStart::new("field");
            field.push_attribute(("name", column.label));
            field.push_attribute(("value", value.as_str()));
            writer.write_event(Event::Empty(field)).map_err(AppError::xml)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("document")))
            .map_err(AppError::xml)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("message")))
        .map_err(AppError::xml)?;

    Ok(writer.into_inner())
}

/// The document is rendered in full before the file is created
pub fn write_document_xml(path: &Path, profile: &ExportProfile, records: &[ExportRecord]) -> Result<()> {
    let document = render_document_xml(profile, records)?;
    std::fs::write(path, document)?;
    Ok(())
}
