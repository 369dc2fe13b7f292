//! Line-by-line reading of CUPS `page_log` files.
//!
//! Malformed lines are logged and skipped; only failing to open the file is
//! fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use audit_core::error::{AuditError, Result};
use audit_core::models::PageLogEntry;
use tracing::{debug, warn};

use crate::parser::parse_line;

/// Iterator over the parseable entries of a page log.
pub struct PageLogReader<R> {
    inner: R,
    buf: Vec<u8>,
    lines_read: u64,
    lines_skipped: u64,
}

impl<R: BufRead> PageLogReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            lines_read: 0,
            lines_skipped: 0,
        }
    }

    /// Physical lines consumed so far, including blank and skipped ones.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Non-empty lines rejected by the parser.
    pub fn lines_skipped(&self) -> u64 {
        self.lines_skipped
    }
}

impl<R: BufRead> Iterator for PageLogReader<R> {
    type Item = PageLogEntry;

    fn next(&mut self) -> Option<PageLogEntry> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    debug!(
                        "Finished page log: {} lines read, {} skipped",
                        self.lines_read, self.lines_skipped
                    );
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Stopped reading page log after line {}: {}", self.lines_read, e);
                    return None;
                }
            }
            self.lines_read += 1;

            let text = decode_dropping_invalid(&self.buf);
            let line = text.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            match parse_line(line) {
                Ok(entry) => return Some(entry),
                Err(e) => {
                    self.lines_skipped += 1;
                    warn!("Skipping line {}: {}", self.lines_read, e);
                }
            }
        }
    }
}

/// Decode UTF-8, silently dropping invalid byte sequences.
fn decode_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // Everything up to `valid_up_to` is valid UTF-8.
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    None => return out,
                }
            }
        }
    }
}

/// Open `path` for reading.
pub fn open_page_log(path: &Path) -> Result<PageLogReader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| AuditError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Reading page log {}", path.display());
    Ok(PageLogReader::new(BufReader::new(file)))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const VALID_A: &str =
        "Printer01 alice 12345 [01/Apr/2025:09:03:11 -0300] total 5 - 192.168.1.1 doc.pdf - -";
    const VALID_B: &str =
        "Printer02 bob 12346 [01/Apr/2025:10:00:00 -0300] total 10 - 192.168.1.2 report.pdf - -";

    fn read_all(content: &[u8]) -> (Vec<PageLogEntry>, u64, u64) {
        let mut reader = PageLogReader::new(Cursor::new(content.to_vec()));
        let entries: Vec<PageLogEntry> = reader.by_ref().collect();
        (entries, reader.lines_read(), reader.lines_skipped())
    }

    #[test]
    fn test_reader_yields_entries_in_order() {
        let content = format!("{VALID_A}\n{VALID_B}\n");
        let (entries, read, skipped) = read_all(content.as_bytes());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].queue, "Printer01");
        assert_eq!(entries[1].queue, "Printer02");
        assert_eq!(read, 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_reader_skips_invalid_lines() {
        let content = format!("{VALID_A}\nthis is garbage\n{VALID_B}\n");
        let (entries, read, skipped) = read_all(content.as_bytes());

        assert_eq!(entries.len(), 2);
        assert_eq!(read, 3);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_reader_ignores_blank_lines_silently() {
        let content = format!("\n{VALID_A}\r\n\r\n{VALID_B}");
        let (entries, read, skipped) = read_all(content.as_bytes());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sides, None);
        assert_eq!(read, 4);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_reader_drops_invalid_utf8_bytes() {
        let mut content = b"Printer01 alice 1 [01/Apr/2025:09:03:11 -0300] total 2 - host caf\xe9.pdf - -\n".to_vec();
        content.extend_from_slice(VALID_B.as_bytes());
        let (entries, _, skipped) = read_all(&content);

        assert_eq!(entries.len(), 2);
        assert_eq!(skipped, 0);
        assert_eq!(entries[0].job_name.as_deref(), Some("caf.pdf"));
    }

    #[test]
    fn test_decode_dropping_invalid() {
        assert_eq!(decode_dropping_invalid(b"plain"), "plain");
        assert_eq!(decode_dropping_invalid(b"a\xffb\xfe\xfdc"), "abc");
        assert_eq!(decode_dropping_invalid("日本".as_bytes()), "日本");
        // Truncated multi-byte sequence at the end.
        assert_eq!(decode_dropping_invalid(b"ok\xe6\x97"), "ok");
    }

    #[test]
    fn test_reader_empty_input() {
        let (entries, read, skipped) = read_all(b"");
        assert!(entries.is_empty());
        assert_eq!(read, 0);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_open_page_log_from_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("page_log");
        std::fs::write(&path, format!("{VALID_A}\n{VALID_B}\n")).unwrap();

        let entries: Vec<_> = open_page_log(&path).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_open_page_log_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("nope");
        let err = open_page_log(&path).err().unwrap();
        assert!(matches!(err, AuditError::FileRead { .. }));
    }
}
