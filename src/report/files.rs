//! Attachment loading with head/tail truncation.
//!
//! Missing or unreadable files never block a report: their buffer holds
//! [`FILE_NOT_FOUND`] instead.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
};

use crate::model::{Attachment, Body};

use super::ContentStore;

/// Buffer contents for an attachment that couldn't be read.
pub const FILE_NOT_FOUND: &[u8] = b"[File not found]";

/// Inserted after the head of a truncated file.
pub const HEAD_MARKER: &[u8] = b" ...\r\n\r\n";

/// Inserted before the tail of a truncated file.
pub const TAIL_MARKER: &[u8] = b"\r\n\r\n... ";

impl ContentStore {
    /// Read every attachment into memory, applying truncation.
    pub fn read_files(&mut self) {
        for item in &mut self.items {
            if let Body::File(attachment) = &mut item.body {
                load(attachment);
                log::debug!(
                    "loaded `{}` from {} ({} bytes)",
                    item.name,
                    attachment.path.display(),
                    attachment.contents.len()
                );
            }
        }
    }
}

/// Populate `attachment.contents` from disk.
pub fn load(attachment: &mut Attachment) {
    attachment.contents = match read(attachment) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("could not read {}: {e}", attachment.path.display());
            FILE_NOT_FOUND.to_vec()
        }
    };
}

fn read(attachment: &Attachment) -> io::Result<Vec<u8>> {
    let mut file = File::open(&attachment.path)?;
    let len = file.metadata()?.len();
    let trim = &attachment.truncate;

    if !trim.applies_to(len) {
        let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.read_to_end(&mut buf)?;
        return Ok(buf);
    }

    let mut buf = Vec::new();
    if trim.begin > 0 {
        (&mut file).take(trim.begin).read_to_end(&mut buf)?;
        buf.extend_from_slice(HEAD_MARKER);
    }
    buf.extend_from_slice(trim.note.as_bytes());
    if trim.end > 0 {
        buf.extend_from_slice(TAIL_MARKER);
        file.seek(SeekFrom::Start(len - trim.end))?;
        file.take(trim.end).read_to_end(&mut buf)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, path::Path};

    use tempfile::TempDir;

    use crate::model::{ContentItem, Truncation};

    fn attachment(path: &Path, begin: u64, end: u64, note: &str) -> Attachment {
        Attachment {
            path: path.to_path_buf(),
            truncate: Truncation {
                begin,
                end,
                note: note.into(),
            },
            ..Attachment::default()
        }
    }

    fn write_log(dir: &TempDir, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("app.log");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_whole_file_without_truncation() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"line one\nline two\n");
        let mut a = attachment(&path, 0, 0, "");

        load(&mut a);

        assert_eq!(a.contents, b"line one\nline two\n");
    }

    #[test]
    fn truncates_head_and_tail_around_note() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"0123456789abcdefghij");
        let mut a = attachment(&path, 4, 3, "(trimmed)");

        load(&mut a);

        let mut expected = b"0123".to_vec();
        expected.extend_from_slice(HEAD_MARKER);
        expected.extend_from_slice(b"(trimmed)");
        expected.extend_from_slice(TAIL_MARKER);
        expected.extend_from_slice(b"hij");
        assert_eq!(a.contents, expected);
    }

    #[test]
    fn head_only_truncation() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"0123456789");
        let mut a = attachment(&path, 2, 0, "");

        load(&mut a);

        let mut expected = b"01".to_vec();
        expected.extend_from_slice(HEAD_MARKER);
        assert_eq!(a.contents, expected);
    }

    #[test]
    fn tail_only_truncation() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"0123456789");
        let mut a = attachment(&path, 0, 2, "cut");

        load(&mut a);

        let mut expected = b"cut".to_vec();
        expected.extend_from_slice(TAIL_MARKER);
        expected.extend_from_slice(b"89");
        assert_eq!(a.contents, expected);
    }

    #[test]
    fn bounds_covering_file_read_it_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"0123456789");

        // Exactly the file length: not shorter, so no trimming.
        let mut a = attachment(&path, 5, 5, "(trimmed)");
        load(&mut a);
        assert_eq!(a.contents, b"0123456789");

        let mut b = attachment(&path, 100, 100, "(trimmed)");
        load(&mut b);
        assert_eq!(b.contents, b"0123456789");
    }

    #[test]
    fn missing_file_becomes_placeholder() {
        let mut a = attachment(Path::new("/nonexistent/tattle/app.log"), 0, 0, "");

        load(&mut a);

        assert_eq!(a.contents, FILE_NOT_FOUND);
    }

    #[test]
    fn read_files_loads_every_attachment() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, b"hello");
        let mut store = ContentStore::new();
        store
            .push(ContentItem::file("log", attachment(&path, 0, 0, "")))
            .unwrap();
        store
            .push(ContentItem::file(
                "gone",
                attachment(&dir.path().join("gone.log"), 0, 0, ""),
            ))
            .unwrap();
        store.push(ContentItem::text("os", "linux")).unwrap();

        store.read_files();

        assert_eq!(store.find("log").unwrap().payload(), b"hello");
        assert_eq!(store.find("gone").unwrap().payload(), FILE_NOT_FOUND);
        assert_eq!(store.find("os").unwrap().payload(), b"linux");
    }
}
