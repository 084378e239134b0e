//! Compile the `report` configuration node into content items.
//!
//! ```text
//! "report": {
//!   "$query": { "<name>": "<value>" | {...} },   # pre-query content
//!   "<name>": "<value>",                         # string
//!   "<name>": { "path": "...", "truncate": [b, e, "note"] },
//!   "<name>": { "input": "text" | "multiline", "label": "...", ... },
//!   "<name>": { "value": "..." },
//!   "type": "...", "id": "..."                   # identity, not content
//! }
//! ```
//!
//! Unrecognised shapes become string items with a warning rather than
//! failing the report.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::model::{Attachment, ContentItem, Field, Truncation};

use super::ContentStore;

/// Prefix marking metadata keys in the `report` node.
pub const RESERVED_PREFIX: char = '$';

/// Key holding the pre-query content tree.
pub const QUERY_KEY: &str = "$query";

/// Keys holding the report identity.
pub const IDENTITY_KEYS: [&str; 2] = ["type", "id"];

/// Errors that prevent a report from being built.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("the report configuration must be an object")]
    NotAnObject,

    #[error("content `{0}` is declared more than once")]
    Redeclared(String),

    #[error("content names may not be empty")]
    EmptyName,
}

impl ContentStore {
    /// Build the content list from a `report` node.
    ///
    /// The `$query` subtree compiles first with `pre_query` set, then the
    /// main tree. Names must be unique across both.
    pub fn compile(report: &Value) -> Result<Self, CompileError> {
        let Value::Object(tree) = report else {
            return Err(CompileError::NotAnObject);
        };

        let mut store = Self::new();

        match tree.get(QUERY_KEY) {
            Some(Value::Object(query)) => compile_tree(&mut store, query, true)?,
            Some(other) => log::warn!("ignoring non-object `{QUERY_KEY}`: {other}"),
            None => {}
        }
        compile_tree(&mut store, tree, false)?;

        Ok(store)
    }
}

fn compile_tree(
    store: &mut ContentStore,
    tree: &Map<String, Value>,
    pre_query: bool,
) -> Result<(), CompileError> {
    for (name, node) in tree {
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        if !pre_query && IDENTITY_KEYS.contains(&name.as_str())
            && (node.is_string() || node.is_number())
        {
            continue;
        }
        if name.is_empty() {
            return Err(CompileError::EmptyName);
        }

        let mut item = compile_item(name, node);
        item.pre_query = pre_query;
        store.push(item)?;
    }
    Ok(())
}

fn compile_item(name: &str, node: &Value) -> ContentItem {
    let Value::Object(spec) = node else {
        return ContentItem::text(name, scalar_text(name, node));
    };

    if let Some(path) = spec.get("path") {
        if let Some(path) = path.as_str() {
            return ContentItem::file(name, attachment(name, path, spec));
        }
        log::warn!("content `{name}`: `path` is not a string, treating as text");
    }

    let value = spec
        .get("value")
        .map(|v| scalar_text(name, v))
        .unwrap_or_default();

    match spec.get("input").and_then(Value::as_str) {
        Some("text") => ContentItem::field(name, field(spec, false), value),
        Some("multiline") => ContentItem::field(name, field(spec, true), value),
        Some(other) => {
            log::warn!("content `{name}`: unknown input kind `{other}`, treating as text");
            ContentItem::text(name, value)
        }
        None => {
            if !spec.contains_key("value") {
                log::warn!("content `{name}` has no path, input or value, treating as text");
            }
            ContentItem::text(name, value)
        }
    }
}

fn attachment(name: &str, path: &str, spec: &Map<String, Value>) -> Attachment {
    Attachment {
        path: PathBuf::from(path),
        content_type: string_key(spec, "content-type"),
        transfer_encoding: string_key(spec, "content-transfer-encoding"),
        truncate: spec
            .get("truncate")
            .map(|t| truncation(name, t))
            .unwrap_or_default(),
        contents: Vec::new(),
    }
}

/// `[beginBytes, endBytes, "note"]`, each element optional.
fn truncation(name: &str, node: &Value) -> Truncation {
    let Some(parts) = node.as_array() else {
        log::warn!("content `{name}`: `truncate` is not an array, ignoring");
        return Truncation::default();
    };

    let bytes = |i: usize| {
        parts.get(i).map_or(0, |v| {
            v.as_u64().unwrap_or_else(|| {
                log::warn!("content `{name}`: truncate[{i}] is not a byte count, using 0");
                0
            })
        })
    };

    Truncation {
        begin: bytes(0),
        end: bytes(1),
        note: parts
            .get(2)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn field(spec: &Map<String, Value>, multiline: bool) -> Field {
    Field {
        multiline,
        label: string_key(spec, "label").unwrap_or_default(),
        placeholder: string_key(spec, "placeholder").unwrap_or_default(),
        persist: spec
            .get("persist")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        input_warning: string_key(spec, "input_warning").unwrap_or_default(),
    }
}

fn string_key(spec: &Map<String, Value>, key: &str) -> Option<String> {
    spec.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Text for a scalar node. Arrays, objects and null degrade to "".
fn scalar_text(name: &str, node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            log::warn!("content `{name}` has an unreadable value, sending it empty");
            String::new()
        }
    }
}
