// ============================================================================
// Log Sanitization - Vendor-supplied values in log lines
// ============================================================================
//
// Invoice files come from an external vendor and BAQ rows carry free text
// typed by ERP users. Invoice numbers, descriptions and remote file names all
// end up in log lines, so they are flattened to a single printable line first:
//
// - newlines / carriage returns / tabs become spaces
// - ANSI escape sequences are dropped
// - remaining control characters are dropped
// - values are truncated to MAX_LOG_LENGTH characters
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept from a logged value
const MAX_LOG_LENGTH: usize = 200;

static ANSI_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("ANSI escape pattern is valid")
});

/// Flatten an untrusted value to one printable log-safe line.
///
/// ```
/// use yooz_bridge::utils::log_sanitizer::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("INV-1\nINFO fake"), "INV-1 INFO fake");
/// assert_eq!(sanitize_for_log("test\x1b[31mred\x1b[0m"), "testred");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let no_ansi = ANSI_ESCAPE_REGEX.replace_all(input, "");

    let printable: String = no_ansi
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    if printable.chars().count() > MAX_LOG_LENGTH {
        let truncated: String = printable.chars().take(MAX_LOG_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        printable
    }
}
