use crate::types::{EntryFields, EntryRow, ParsedEntries};
use csv::{ReaderBuilder, StringRecord};

/// Parse a comma-delimited export into entry rows, in document order.
///
/// The first line names the columns. Rows missing either required field
/// (absent or blank after trimming) are counted in `dropped` and skipped.
/// An empty source, or a header that lacks one of the fields, produces no
/// rows rather than an error.
pub fn parse_entry_rows(text: &str, fields: &EntryFields) -> ParsedEntries {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            tracing::debug!("entry header unreadable: {e}");
            return ParsedEntries::default();
        }
    };
    let username_idx = column_index(&headers, &fields.username);
    let code_idx = column_index(&headers, &fields.code);

    let mut parsed = ParsedEntries::default();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("unreadable entry row: {e}");
                parsed.dropped += 1;
                continue;
            }
        };
        if is_blank(&record) {
            continue;
        }
        let username = username_idx.and_then(|idx| field(&record, idx));
        let code = code_idx.and_then(|idx| field(&record, idx));
        match (username, code) {
            (Some(username), Some(code)) => parsed.rows.push(EntryRow::new(username, code)),
            _ => parsed.dropped += 1,
        }
    }
    parsed
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    let wanted = name.trim();
    headers.iter().position(|header| header.trim() == wanted)
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() <= 1 && record.get(0).map(|v| v.trim().is_empty()).unwrap_or(true)
}
