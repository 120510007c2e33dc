use std::path::Path;

use serde_json::Value;

use super::types::{Document, SourceEntry};
use crate::error::MemoryError;

/// Default maximum input file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Records of one input file, each validated independently.
#[derive(Debug)]
pub struct ParsedSource {
    pub file_hash: String,
    pub entries: Vec<Result<Document, MemoryError>>,
}

/// Read and parse a JSON input file. Documents are attributed to
/// `source_file`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, exceeds `max_size`, or is not
/// valid JSON of a supported shape. Invalid individual records are reported
/// inside [`ParsedSource::entries`] instead.
pub async fn load_source(
    path: &Path,
    source_file: &str,
    max_size: u64,
) -> Result<ParsedSource, MemoryError> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() > max_size {
        return Err(MemoryError::Input(format!(
            "{} is too large: {} bytes",
            path.display(),
            meta.len()
        )));
    }
    let bytes = tokio::fs::read(path).await?;
    let file_hash = super::fingerprint::file_hash(&bytes);
    let entries = parse_source(&bytes, source_file)?;
    Ok(ParsedSource { file_hash, entries })
}

/// Parse input JSON in any supported shape: a bare list of records, an
/// object with a `chunks` list (pre-chunked), an object with a `data`
/// wrapper, or a single record.
///
/// # Errors
///
/// Returns an error if `bytes` is not JSON or the top level is not an object
/// or array.
pub fn parse_source(
    bytes: &[u8],
    source_file: &str,
) -> Result<Vec<Result<Document, MemoryError>>, MemoryError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let mut out = Vec::new();
    collect(root, source_file, None, false, &mut out)?;
    Ok(out)
}

fn collect(
    value: Value,
    source_file: &str,
    fallback_url: Option<&str>,
    pre_chunked: bool,
    out: &mut Vec<Result<Document, MemoryError>>,
) -> Result<(), MemoryError> {
    match value {
        Value::Array(items) => {
            for item in items {
                out.push(to_document(item, source_file, fallback_url, pre_chunked));
            }
            Ok(())
        }
        Value::Object(mut map) => {
            let url = map
                .get("source_url")
                .and_then(Value::as_str)
                .map(str::to_owned);
            let url = url.as_deref().or(fallback_url);
            if let Some(chunks) = map.remove("chunks") {
                collect_list(chunks, source_file, url, true, out)
            } else if let Some(data) = map.remove("data") {
                match data {
                    Value::Array(_) | Value::Object(_) => {
                        collect(data, source_file, url, pre_chunked, out)
                    }
                    _ => Err(MemoryError::Input(format!(
                        "{source_file}: `data` must be an object or array"
                    ))),
                }
            } else {
                out.push(to_document(
                    Value::Object(map),
                    source_file,
                    fallback_url,
                    pre_chunked,
                ));
                Ok(())
            }
        }
        _ => Err(MemoryError::Input(format!(
            "{source_file}: top level must be an object or array"
        ))),
    }
}

fn collect_list(
    value: Value,
    source_file: &str,
    fallback_url: Option<&str>,
    pre_chunked: bool,
    out: &mut Vec<Result<Document, MemoryError>>,
) -> Result<(), MemoryError> {
    let Value::Array(items) = value else {
        return Err(MemoryError::Input(format!(
            "{source_file}: `chunks` must be an array"
        )));
    };
    for item in items {
        out.push(to_document(item, source_file, fallback_url, pre_chunked));
    }
    Ok(())
}

fn to_document(
    value: Value,
    source_file: &str,
    fallback_url: Option<&str>,
    pre_chunked: bool,
) -> Result<Document, MemoryError> {
    let entry: SourceEntry = serde_json::from_value(value)?;
    Document::from_entry(entry, source_file, fallback_url, pre_chunked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_docs(json: &str) -> Vec<Document> {
        parse_source(json.as_bytes(), "in.json")
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn bare_list() {
        let docs = ok_docs(r#"[{"content": "a"}, {"content": "b"}]"#);
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.preset.is_none()));
    }

    #[test]
    fn chunks_wrapper_is_pre_chunked() {
        let docs = ok_docs(r#"{"chunks": [{"content": "a"}]}"#);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].preset.is_some());
    }

    #[test]
    fn data_wrapper_single_object() {
        let docs = ok_docs(
            r#"{"source_url": "https://x.dev/page", "data": {"content": "a", "title": "T"}}"#,
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_url, "https://x.dev/page");
        assert_eq!(docs[0].title, "T");
    }

    #[test]
    fn single_object() {
        let docs = ok_docs(r#"{"content": "A. B. C."}"#);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "A. B. C.");
        assert_eq!(docs[0].source_file, "in.json");
    }

    #[test]
    fn invalid_entry_reported_individually() {
        let entries =
            parse_source(br#"[{"content": "ok"}, {"content": 5}, {}]"#, "in.json").unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_ok());
        assert!(entries[1].is_err());
        assert!(entries[2].is_err());
    }

    #[test]
    fn scalar_top_level_rejected() {
        assert!(parse_source(b"42", "in.json").is_err());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            parse_source(b"{not json", "in.json"),
            Err(MemoryError::Json(_))
        ));
    }

    #[tokio::test]
    async fn load_source_hashes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kb.json");
        std::fs::write(&file, r#"[{"content": "x"}]"#).unwrap();

        let parsed = load_source(&file, "/kb/kb.json", DEFAULT_MAX_FILE_SIZE)
            .await
            .unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.file_hash.len(), 64);
        let doc = parsed.entries[0].as_ref().unwrap();
        assert_eq!(doc.source_file, "/kb/kb.json");
    }

    #[tokio::test]
    async fn load_source_enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kb.json");
        std::fs::write(&file, r#"[{"content": "x"}]"#).unwrap();

        let err = load_source(&file, "kb.json", 4).await.unwrap_err();
        assert!(matches!(err, MemoryError::Input(_)));
    }
}
