//! Content-Disposition handling for downloaded reports.

/// Extracts the suggested filename from a `Content-Disposition` header.
///
/// `filename*=UTF-8''...` (RFC 5987) takes precedence over `filename=...`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;

    for part in header.split(';').map(str::trim) {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();

        if name == "filename*" {
            let encoded = value
                .split_once("''")
                .map_or(value, |(_, rest)| rest);
            if let Some(decoded) = percent_decode(encoded.trim_matches('"'))
                && !decoded.is_empty()
            {
                return Some(decoded);
            }
        } else if name == "filename" {
            let unquoted = value.trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }
    plain
}

/// Fallback filename when the server suggests none.
pub(super) fn default_filename(content_type: &str) -> String {
    let ext = if content_type.contains("pdf") {
        "pdf"
    } else if content_type.contains("spreadsheet") || content_type.contains("excel") {
        "xlsx"
    } else if content_type.contains("csv") {
        "csv"
    } else {
        "bin"
    };
    format!("report.{ext}")
}

fn percent_decode(input: &str) -> Option<String> {
    percent_encoding::percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}
