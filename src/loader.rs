//! Loading YAML/JSON files into documents
//!
//! Parsing itself is delegated to `serde_yaml` and `serde_json`; this module
//! only converts their value trees into the [`Document`] model. Anchors,
//! aliases and `<<` merge keys are resolved here, so a loaded document never
//! refers to anything outside itself.

use crate::document::{Document, Mapping, Node, Scalar};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading a document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported mapping key: {0}")]
    UnsupportedKey(String),
}

/// Source format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from the file extension; anything but `.json` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parse document text
pub fn parse_str(content: &str, format: Format) -> Result<Document, ParseError> {
    let mut value: serde_yaml::Value = match format {
        Format::Yaml => serde_yaml::from_str(content)?,
        // Deserializing into a YAML value keeps the key order of the JSON text
        Format::Json => serde_json::from_str(content)?,
    };
    value.apply_merge()?;
    Ok(Document::new(convert(value)?))
}

/// Read and parse a file
pub fn load_document(path: &Path) -> Result<Document, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_str(&content, Format::from_path(path))?;
    log::debug!("loaded document {}", path.display());
    Ok(document.with_source(path))
}

/// Load a set of labelled files.
///
/// A file that fails to load is reported in the error list and does not stop
/// the others from loading.
pub fn load_documents(
    files: &BTreeMap<String, PathBuf>,
) -> (BTreeMap<String, Document>, Vec<(String, ParseError)>) {
    let mut documents = BTreeMap::new();
    let mut errors = Vec::new();

    for (label, path) in files {
        match load_document(path) {
            Ok(doc) => {
                documents.insert(label.clone(), doc);
            }
            Err(e) => {
                log::warn!("failed to load document '{}': {}", label, e);
                errors.push((label.clone(), e));
            }
        }
    }

    (documents, errors)
}

fn convert(value: serde_yaml::Value) -> Result<Node, ParseError> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => Node::null(),
        Value::Bool(b) => Node::from(b),
        Value::Number(n) => Node::Scalar(convert_number(&n)),
        Value::String(s) => Node::from(s),
        Value::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut mapping = Mapping::new();
            for (key, value) in map {
                mapping.insert(convert_key(key)?, convert(value)?);
            }
            Node::Mapping(mapping)
        }
        Value::Tagged(tagged) => convert(tagged.value)?,
    })
}

fn convert_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else {
        // u64 beyond i64::MAX, floats, .inf and .nan
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Mapping keys become strings; YAML allows `1:` or `true:` as keys
fn convert_key(key: serde_yaml::Value) -> Result<String, ParseError> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => convert_key(tagged.value),
        other => Err(ParseError::UnsupportedKey(format!("{:?}", other))),
    }
}
