//! Plain-text rendering of a report for the "view report" surface.

use std::{fmt::Write, path::Path};

use crate::model::{ContentItem, ContentKind};

use super::ContentStore;

/// Labels are padded to this width so short values line up.
const LABEL_WIDTH: usize = 20;

/// Values longer than this are printed as an indented block.
const INLINE_LIMIT: usize = 35;

impl ContentStore {
    /// Render every item for review.
    ///
    /// Pre-query items come first, then the full report, then attached
    /// files. `review_dir`, when set, is listed at the end.
    pub fn review(&self, review_dir: Option<&Path>) -> String {
        let mut out = String::new();

        let (query, main): (Vec<&ContentItem>, Vec<&ContentItem>) = self
            .items
            .iter()
            .filter(|i| i.kind() != ContentKind::File)
            .partition(|i| i.pre_query);

        if !query.is_empty() {
            out.push_str("Used to check for solutions:\n");
            dump_section(&mut out, &query);
        }
        if !main.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Sent with the full report:\n");
            dump_section(&mut out, &main);
        }

        let files: Vec<_> = self
            .items
            .iter()
            .filter_map(|i| i.attachment().map(|a| (i, a)))
            .collect();
        if !files.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Attached files:\n");
            for (item, attachment) in files {
                let _ = writeln!(
                    out,
                    "{} {} ({} bytes)",
                    label(&item.name),
                    attachment.path.display(),
                    attachment.contents.len()
                );
            }
        }

        if let Some(dir) = review_dir {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "Report folder: {}", dir.display());
            for entry in list_dir(dir) {
                let _ = writeln!(out, "  {entry}");
            }
        }

        out
    }
}

fn dump_section(out: &mut String, items: &[&ContentItem]) {
    for item in items {
        dump_item(out, item);
        out.push('\n');
    }
}

fn dump_item(out: &mut String, item: &ContentItem) {
    let value = item.value();
    if value.chars().count() > INLINE_LIMIT || value.contains(['\r', '\n']) {
        let _ = write!(out, "{}:\n| {}", item.name, value.replace('\n', "\n| "));
    } else {
        let _ = write!(out, "{}{value}", label(&item.name));
    }
}

/// `name: ` padded to [`LABEL_WIDTH`].
fn label(name: &str) -> String {
    format!("{:<LABEL_WIDTH$}", format!("{name}: "))
}

/// File names in `dir`, sorted. Unreadable folders list nothing.
fn list_dir(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("could not list {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
