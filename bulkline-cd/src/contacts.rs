//! Contact list parsing
//!
//! Reads delimited tabular data with a header row and extracts one raw
//! number value per data row, in file order. The number column is found by
//! probing a fixed priority list of header aliases; the first alias present
//! is used uniformly for every row.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Header aliases probed in priority order (case-insensitive)
const NUMBER_COLUMN_ALIASES: &[&str] =
    &["phone", "phone_number", "mobile", "number", "mobile_number"];

/// Parse a contact list file into raw number values.
///
/// Rows missing the number column, or whose digit content is shorter than
/// `min_digits`, are silently dropped. The source is re-read from the path
/// on every call, so a run can be restarted from the same upload.
pub fn parse_contact_list(path: &Path, min_digits: usize) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::Parse(format!("unreadable header row: {}", e)))?
        .clone();

    if headers.is_empty() {
        return Err(Error::Parse("contact list has no header row".to_string()));
    }

    let column = NUMBER_COLUMN_ALIASES
        .iter()
        .find_map(|alias| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias))
        })
        .ok_or_else(|| {
            Error::Parse(format!(
                "no number column found (looked for {})",
                NUMBER_COLUMN_ALIASES.join(", ")
            ))
        })?;

    let mut numbers = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed row: {}", e);
                dropped += 1;
                continue;
            }
        };

        let value = record.get(column).map(str::trim).unwrap_or("");
        let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();

        if value.is_empty() || digit_count < min_digits {
            dropped += 1;
            continue;
        }

        numbers.push(value.to_string());
    }

    debug!(
        "Parsed {} numbers from {} ({} rows dropped)",
        numbers.len(),
        path.display(),
        dropped
    );

    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn extracts_numbers_in_file_order() {
        let file = write_csv("name,phone\nA,9876543210\nB,9123456780\n");
        let numbers = parse_contact_list(file.path(), 10).unwrap();
        assert_eq!(numbers, vec!["9876543210", "9123456780"]);
    }

    #[test]
    fn first_matching_alias_wins() {
        // `phone` outranks `mobile_number` even though both are present
        let file = write_csv("mobile_number,phone\n1111111111,9876543210\n");
        let numbers = parse_contact_list(file.path(), 10).unwrap();
        assert_eq!(numbers, vec!["9876543210"]);
    }

    #[test]
    fn alias_match_is_case_insensitive() {
        let file = write_csv("Phone_Number\n9876543210\n");
        let numbers = parse_contact_list(file.path(), 10).unwrap();
        assert_eq!(numbers, vec!["9876543210"]);
    }

    #[test]
    fn short_rows_are_silently_dropped() {
        let file = write_csv("phone\n9876543210\n12345\n\n9123456780\n999\n9988776655\n");
        let numbers = parse_contact_list(file.path(), 10).unwrap();
        // 5 data rows, 2 fail the digit-length check (plus the blank)
        assert_eq!(numbers, vec!["9876543210", "9123456780", "9988776655"]);
    }

    #[test]
    fn punctuated_values_count_digits_only() {
        let file = write_csv("phone\n+91 98765-43210\n+91 12\n");
        let numbers = parse_contact_list(file.path(), 10).unwrap();
        assert_eq!(numbers, vec!["+91 98765-43210"]);
    }

    #[test]
    fn missing_number_column_is_parse_error() {
        let file = write_csv("name,email\nA,a@example.com\n");
        let err = parse_contact_list(file.path(), 10).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn unreadable_file_is_parse_error() {
        let err = parse_contact_list(Path::new("/nonexistent/contacts.csv"), 10).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
