//! JSONL export
//!
//! One JSON object per record and line:
//!
//! ```text
//! {"content":"<table>..</table>","file_name":"q1.xlsx","id":"rec-000001","title":"q1"}
//! ```

use serde_json::{json, Value};

use crate::features::records::Record;
use crate::utils::error::ExportError;

/// Fallback download name
pub const DEFAULT_JSONL_NAME: &str = "converted.jsonl";

/// One JSONL line for `record`, without the trailing newline
pub fn export_record(record: &Record) -> String {
    json!({
        "id": record.id,
        "file_name": record.file_name,
        "title": record.original_title,
        "content": record.content,
    })
    .to_string()
}

/// Newline-joined lines for `records`
pub fn export_records(records: &[Record]) -> String {
    records
        .iter()
        .map(export_record)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Concatenate JSONL sources, validating every line
///
/// Blank lines are dropped. At least two sources are required.
pub fn merge_jsonl<S: AsRef<str>>(sources: &[S]) -> Result<String, ExportError> {
    if sources.len() < 2 {
        return Err(ExportError::TooFewSources {
            count: sources.len(),
        });
    }

    let mut out = String::new();
    for (file_idx, source) in sources.iter().enumerate() {
        for (line_idx, line) in source.as_ref().lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            serde_json::from_str::<Value>(line).map_err(|e| ExportError::InvalidLine {
                file: file_idx + 1,
                line: line_idx + 1,
                message: e.to_string(),
            })?;
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Download name for a record title: last extension replaced by `.jsonl`
pub fn jsonl_file_name(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return DEFAULT_JSONL_NAME.to_string();
    }
    let stem = match title.rfind('.') {
        Some(idx) if idx > 0 => &title[..idx],
        _ => title,
    };
    format!("{}.jsonl", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(id: &str, content: &str) -> Record {
        Record {
            id: id.to_string(),
            file_name: "sheet.xlsx".to_string(),
            original_title: "sheet".to_string(),
            file_type: "xlsx".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_export_record_is_one_json_line() {
        let line = export_record(&record("r1", "<table>\n<tr><td>\"q\"</td></tr></table>"));
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], "r1");
        assert_eq!(value["title"], "sheet");
        assert_eq!(
            value["content"],
            "<table>\n<tr><td>\"q\"</td></tr></table>"
        );
    }

    #[test]
    fn test_export_records_joins_lines() {
        let out = export_records(&[record("a", "<p/>"), record("b", "<p/>")]);
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_merge_jsonl() {
        let merged = merge_jsonl(&["{\"a\":1}\n\n", "{\"b\":2}\r\n{\"c\":3}"]).unwrap();
        assert_eq!(merged, "{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n");
    }

    #[test]
    fn test_merge_jsonl_needs_two_sources() {
        assert_eq!(
            merge_jsonl(&["{}"]),
            Err(ExportError::TooFewSources { count: 1 })
        );
    }

    #[test]
    fn test_merge_jsonl_reports_bad_line() {
        let err = merge_jsonl(&["{}", "{}\nnot json"]).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidLine {
                file: 2,
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_jsonl_file_name() {
        assert_eq!(jsonl_file_name("report.xlsx"), "report.jsonl");
        assert_eq!(jsonl_file_name("a.b.c"), "a.b.jsonl");
        assert_eq!(jsonl_file_name(".env"), ".env.jsonl");
        assert_eq!(jsonl_file_name("plain"), "plain.jsonl");
        assert_eq!(jsonl_file_name("  "), "converted.jsonl");
    }
}
