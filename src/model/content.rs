//! Content items: the named units of data that make up a report.

use std::path::PathBuf;

/// The kind of a content item, as seen by the encoder and the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A literal string.
    String,
    /// A file attachment.
    File,
    /// A single-line user input.
    Field,
    /// A multi-line user input.
    FieldMulti,
}

/// Head/tail truncation for large attachments.
///
/// When either bound is nonzero and the file is longer than both bounds
/// combined, only the head and tail are attached with `note` between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Truncation {
    pub begin: u64,
    pub end: u64,
    pub note: String,
}

impl Truncation {
    /// Whether a file of `len` bytes should be trimmed.
    pub fn applies_to(&self, len: u64) -> bool {
        (self.begin != 0 || self.end != 0) && self.begin.saturating_add(self.end) < len
    }
}

/// A file-backed content item.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub transfer_encoding: Option<String>,
    pub truncate: Truncation,

    /// Bytes to send, populated once before the workflow starts.
    pub contents: Vec<u8>,
}

/// A user-editable content item.
#[derive(Debug, Clone, Default)]
pub struct Field {
    pub multiline: bool,
    pub label: String,
    pub placeholder: String,

    /// Remember the user's input across runs.
    pub persist: bool,

    /// Shown when the field is left blank at submit time.
    pub input_warning: String,
}

/// What backs a content item.
#[derive(Debug, Clone)]
pub enum Body {
    Text,
    File(Attachment),
    Field(Field),
}

/// One named unit of report data.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub name: String,

    /// Eligible for inclusion in the pre-query request.
    pub pre_query: bool,

    /// Literal value from configuration.
    pub value: String,

    /// Value entered by the user, overriding `value`.
    pub user_input: Option<String>,

    pub body: Body,
}

impl ContentItem {
    /// A literal string item.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre_query: false,
            value: value.into(),
            user_input: None,
            body: Body::Text,
        }
    }

    /// A file attachment item. Contents are loaded later.
    pub fn file(name: impl Into<String>, attachment: Attachment) -> Self {
        Self {
            name: name.into(),
            pre_query: false,
            value: String::new(),
            user_input: None,
            body: Body::File(attachment),
        }
    }

    /// A user input item with an optional default value.
    pub fn field(name: impl Into<String>, field: Field, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre_query: false,
            value: value.into(),
            user_input: None,
            body: Body::Field(field),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match &self.body {
            Body::Text => ContentKind::String,
            Body::File(_) => ContentKind::File,
            Body::Field(f) if f.multiline => ContentKind::FieldMulti,
            Body::Field(_) => ContentKind::Field,
        }
    }

    /// The user's input if set, else the configured value.
    pub fn value(&self) -> &str {
        self.user_input.as_deref().unwrap_or(&self.value)
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match &self.body {
            Body::File(a) => Some(a),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn attachment_mut(&mut self) -> Option<&mut Attachment> {
        match &mut self.body {
            Body::File(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match &self.body {
            Body::Field(f) => Some(f),
            _ => None,
        }
    }

    /// The bytes that go on the wire for this item.
    pub fn payload(&self) -> &[u8] {
        match &self.body {
            Body::File(a) => &a.contents,
            Body::Text | Body::Field(_) => self.value().as_bytes(),
        }
    }
}
