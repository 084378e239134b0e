//! Workflow journal: one JSON line per workflow event.
//!
//! Optional (`path.log`). Each line carries a timestamp and the event,
//! so an operator can tell afterwards what a silent run did. Write
//! failures are logged and otherwise ignored.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::reply::{Reply, RequestState};

/// Something the workflow did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    /// A pre-query or post finished.
    Exchange {
        stage: String,
        url: String,
        state: RequestState,
        status: u16,
        valid: bool,
    },
    /// Connectivity probe in place of a pre-query.
    Probe { url: String, reachable: bool },
    /// The user submitted the prompt.
    Submit { dont_show_again: bool },
    /// The workflow stopped early.
    Halt { stage: String },
    Done,
}

impl Event {
    pub fn exchange(stage: &str, url: &impl ToString, reply: &Reply) -> Self {
        Self::Exchange {
            stage: stage.to_string(),
            url: url.to_string(),
            state: reply.state,
            status: reply.status_code,
            valid: reply.valid(),
        }
    }
}

/// A journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub at: Timestamp,
    #[serde(flatten)]
    pub event: Event,
}

/// Appends events to the journal file, if one is configured.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    #[cfg(test)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, event: Event) {
        let Some(path) = &self.path else {
            return;
        };
        let entry = Entry {
            at: Timestamp::now(),
            event,
        };
        if let Err(e) = append(path, &entry) {
            log::warn!("failed to write journal {}: {e}", path.display());
        }
    }
}

fn append(path: &Path, entry: &Entry) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut line = serde_json::to_string(entry).map_err(io::Error::other)?;
    line.push('\n');
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn read_entries(path: &Path) -> Vec<Entry> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn appends_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("tattle.jsonl");
        let journal = Journal::new(Some(path.clone()));

        journal.record(Event::Probe {
            url: "http://example.com/".into(),
            reachable: false,
        });
        journal.record(Event::Done);

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].event, Event::Probe { reachable: false, .. }));
        assert_eq!(entries[1].event, Event::Done);
        assert!(entries[0].at <= entries[1].at);
    }

    #[test]
    fn lines_are_tagged_by_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tattle.jsonl");
        let journal = Journal::new(Some(path.clone()));

        journal.record(Event::Halt {
            stage: "prompt".into(),
        });

        let line = fs::read_to_string(&path).unwrap();
        assert!(line.contains(r#""event":"halt""#));
        assert!(line.contains(r#""stage":"prompt""#));
        assert!(line.contains(r#""at":""#));
    }

    #[test]
    fn disabled_journal_writes_nothing() {
        let journal = Journal::default();
        journal.record(Event::Done);
        assert!(journal.path().is_none());
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be.
        let journal = Journal::new(Some(dir.path().to_path_buf()));
        journal.record(Event::Done);
    }
}
