//! Input discovery and decoding of source files.
//!
//! A source is a JSON array of paper objects or JSON-Lines (one object per
//! line), as produced by the bulk search export.

use crate::error::IngestError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const SOURCE_EXTENSIONS: &[&str] = &["json", "jsonl"];

/// A file path is returned as-is; a directory yields its `.json` / `.jsonl`
/// files in directory iteration order.
pub fn collect_input_files(path: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(source_error(path, "no such file or directory"));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| source_error(path, e))? {
        let entry = entry.map_err(|e| source_error(path, e))?;
        let file = entry.path();
        let matches = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if file.is_file() && matches {
            files.push(file);
        }
    }

    info!("📂 Found {} source files in {:?}", files.len(), path);
    Ok(files)
}

pub fn read_records(path: &Path) -> Result<Vec<Value>, IngestError> {
    let content = fs::read_to_string(path).map_err(|e| source_error(path, e))?;
    parse_records(&content).map_err(|e| source_error(path, e))
}

/// `[...]` is parsed as one JSON array, anything else as JSON-Lines.
/// A leading UTF-8 byte order mark is ignored.
pub fn parse_records(content: &str) -> Result<Vec<Value>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<Value>>(content).map_err(|e| e.to_string());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Value>(line).map_err(|e| format!("line {}: {}", n + 1, e))
        })
        .collect()
}

fn source_error(path: &Path, err: impl std::fmt::Display) -> IngestError {
    IngestError::Source {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_json_array() {
        let records = parse_records(r#"[{"paperId": "P1"}, {"paperId": "P2"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["paperId"], "P2");
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let content = "{\"paperId\": \"P1\"}\n\n{\"paperId\": \"P2\"}\n";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["paperId"], "P1");
    }

    #[test]
    fn test_parse_json_lines_reports_line() {
        let err = parse_records("{\"paperId\": \"P1\"}\n{broken\n").unwrap_err();
        assert!(err.starts_with("line 2"), "unexpected error: {}", err);
    }

    #[test]
    fn test_parse_ignores_byte_order_mark() {
        let records = parse_records("\u{feff}[{\"paperId\": \"P1\"}]").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["paperId"], "P1");

        let records = parse_records("\u{feff}{\"paperId\": \"P1\"}\n{\"paperId\": \"P2\"}\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_bom_json_array_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("papers.json");
        fs::write(&file, "\u{feff}[{\"paperId\": \"P1\"}, {\"paperId\": \"P2\"}]").unwrap();

        assert_eq!(read_records(&file).unwrap().len(), 2);
    }

    #[test]
    fn test_collect_directory_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let mut files = collect_input_files(dir.path()).unwrap();
        files.sort();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.jsonl"]);
    }

    #[test]
    fn test_collect_single_file_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("papers.json");
        fs::write(&file, "[]").unwrap();

        assert_eq!(collect_input_files(&file).unwrap(), vec![file.clone()]);
        assert!(read_records(&file).unwrap().is_empty());

        let missing = dir.path().join("missing");
        assert!(matches!(
            collect_input_files(&missing),
            Err(IngestError::Source { .. })
        ));
    }
}
