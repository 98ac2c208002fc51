//! Document conversion: frontmatter documents to JSON artifacts, and
//! artifact sets to the aggregate index.
//!
//! Everything in here is a pure function over text. All filesystem work
//! stays in the store and pipeline layers.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Split a document into `(header, body)` at the frontmatter delimiters.
///
/// Returns `None` when the text does not begin with `---`, meaning the
/// document carries no structured header at all. With exactly one closing
/// delimiter the body is taken verbatim; any further delimiters inside the
/// body are rejoined with `---` and the result trimmed.
pub fn split_document(text: &str) -> Option<(String, String)> {
    if !text.starts_with("---") {
        return None;
    }

    let parts: Vec<&str> = text.split("---").collect();
    if parts.len() < 2 {
        return None;
    }

    let header = parts[1].to_string();
    let body = if parts.len() == 3 {
        parts[2].to_string()
    } else {
        parts[2..].join("---").trim().to_string()
    };

    Some((header, body))
}

/// Convert a document to its serialized artifact.
///
/// The YAML header becomes a JSON object with the body appended under a
/// `body` field. Returns `Ok(None)` when the document has no header or the
/// header holds no parseable fields; such documents produce no artifact.
/// A present but malformed header is an error.
pub fn document_to_artifact(text: &str) -> Result<Option<String>> {
    let Some((header, body)) = split_document(text) else {
        return Ok(None);
    };

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&header).context("invalid document header")?;

    let mapping = match yaml {
        serde_yaml::Value::Mapping(m) if !m.is_empty() => m,
        _ => return Ok(None),
    };

    let mut record = match serde_json::to_value(&mapping)
        .context("document header is not representable as JSON")?
    {
        serde_json::Value::Object(obj) => obj,
        _ => return Ok(None),
    };
    record.insert("body".to_string(), serde_json::Value::String(body));

    Ok(Some(serde_json::to_string(&record)?))
}

/// One entry of the aggregate index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub reference: String,
    pub content: String,
}

/// Label for an artifact inside the aggregate: relative directory joined
/// with the base name, separators normalized to `/` on every platform.
pub fn doc_reference(relative_dir: &Path, base_name: &str) -> String {
    let dir = relative_dir.to_string_lossy().replace('\\', "/");
    if dir.is_empty() {
        base_name.to_string()
    } else {
        format!("{dir}/{base_name}")
    }
}

/// Serialize the aggregate index.
///
/// Entries arrive in nondeterministic completion order from the parallel
/// read fan-out; sorting by reference here is what makes the aggregate
/// byte-for-byte reproducible across runs.
pub fn render_index(mut entries: Vec<IndexEntry>) -> Result<String> {
    entries.sort_by(|a, b| a.reference.cmp(&b.reference));
    Ok(serde_json::to_string(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_basic_document() {
        let text = "---\ntitle: X\n---\nhello";
        let artifact = document_to_artifact(text).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&artifact).unwrap();
        assert_eq!(value["title"], "X");
        assert_eq!(value["body"], "\nhello");
    }

    #[test]
    fn test_no_leading_delimiter_is_skipped() {
        assert!(document_to_artifact("just a body\n").unwrap().is_none());
        assert!(document_to_artifact("body with --- inside").unwrap().is_none());
    }

    #[test]
    fn test_empty_header_is_skipped() {
        assert!(document_to_artifact("---\n\n---\nbody").unwrap().is_none());
    }

    #[test]
    fn test_scalar_header_is_skipped() {
        assert!(document_to_artifact("---\njust text\n---\nbody")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_header_errors() {
        let text = "---\ntitle: [unclosed\n---\nbody";
        assert!(document_to_artifact(text).is_err());
    }

    #[test]
    fn test_body_verbatim_with_single_closing_delimiter() {
        let (_, body) = split_document("---\nt: 1\n---\n  spaced  ").unwrap();
        assert_eq!(body, "\n  spaced  ");
    }

    #[test]
    fn test_extra_delimiters_rejoined_and_trimmed() {
        let (header, body) = split_document("---\nt: 1\n---\nabove\n---\nbelow\n").unwrap();
        assert_eq!(header, "\nt: 1\n");
        assert_eq!(body, "above\n---\nbelow");
    }

    #[test]
    fn test_unterminated_header_yields_empty_body() {
        let (header, body) = split_document("---\nt: 1\n").unwrap();
        assert_eq!(header, "\nt: 1\n");
        assert_eq!(body, "");
    }

    #[test]
    fn test_doc_reference_normalization() {
        assert_eq!(doc_reference(&PathBuf::from("a/b"), "c"), "a/b/c");
        assert_eq!(doc_reference(&PathBuf::new(), "c"), "c");
    }

    #[test]
    fn test_render_index_sorted_regardless_of_input_order() {
        let entry = |r: &str| IndexEntry {
            reference: r.to_string(),
            content: "{}".to_string(),
        };
        let a = render_index(vec![entry("b"), entry("a"), entry("c")]).unwrap();
        let b = render_index(vec![entry("c"), entry("b"), entry("a")]).unwrap();
        assert_eq!(a, b);

        let parsed: serde_json::Value = serde_json::from_str(&a).unwrap();
        assert_eq!(parsed[0]["reference"], "a");
        assert_eq!(parsed[2]["reference"], "c");
    }
}
