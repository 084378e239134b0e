//! The content store: every item that goes into one report.
//!
//! Built once from the `report` configuration node, then file contents are
//! loaded before the workflow starts. The prompt only ever touches
//! `user_input` afterwards.

mod compile;
mod encode;
mod files;
mod review;

use serde_json::{Map, Value};

use crate::model::{ContentItem, ContentKind, Field};
use crate::persist::PersistentStore;

pub use compile::{CompileError, IDENTITY_KEYS, QUERY_KEY};
pub use encode::{Multipart, random_boundary};
#[cfg(test)]
pub use files::FILE_NOT_FOUND;

/// Ordered, name-unique collection of content items.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    items: Vec<ContentItem>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Names are unique across the whole report.
    pub fn push(&mut self, item: ContentItem) -> Result<(), CompileError> {
        if self.find(&item.name).is_some() {
            return Err(CompileError::Redeclared(item.name));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&ContentItem> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ContentItem> {
        self.items.iter_mut().find(|i| i.name == name)
    }

    #[cfg(test)]
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Items the user can edit, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&ContentItem, &Field)> {
        self.items
            .iter()
            .filter_map(|item| item.as_field().map(|field| (item, field)))
    }

    /// Items eligible for the pre-query request.
    pub fn query_items(&self) -> impl Iterator<Item = &ContentItem> {
        self.items
            .iter()
            .filter(|i| i.pre_query && i.kind() == ContentKind::String)
    }

    /// Seed persisted fields with the values remembered from earlier runs.
    pub fn restore_persisted(&mut self, store: &PersistentStore) {
        for item in &mut self.items {
            let persist = item.as_field().is_some_and(|f| f.persist);
            if persist && let Some(value) = store.get_str(&item.name) {
                item.user_input = Some(value.to_string());
            }
        }
    }

    /// Merge patch holding the current value of every persisted field.
    ///
    /// `None` when no field asks to be remembered.
    pub fn persist_patch(&self) -> Option<Value> {
        let values: Map<String, Value> = self
            .fields()
            .filter(|(_, field)| field.persist)
            .map(|(item, _)| (item.name.clone(), Value::from(item.value())))
            .collect();
        (!values.is_empty()).then_some(Value::Object(values))
    }
}
