//! Streaming reader for gzip-compressed, tab-separated dump files.
//!
//! The first line is the header. Data rows are split on raw tabs with no
//! quoting (IMDb titles contain unbalanced quotes), and the file is never
//! held in memory as a whole. Lines are counted physically, so blank lines
//! still advance the line number.

use super::error::{DecodeError, FieldCoercionError};
use csv::{ByteRecord, StringRecord};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

type GzLines = BufReader<MultiGzDecoder<File>>;

/// One data row as it appears in the file.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the decompressed file (the header is line 1).
    pub line: u64,
    pub fields: StringRecord,
}

impl RawRow {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index)
    }
}

pub struct TsvDecoder {
    path: PathBuf,
    header: Vec<String>,
    reader: GzLines,
    buf: Vec<u8>,
    line: u64,
    done: bool,
}

impl TsvDecoder {
    /// Opens the file and consumes its header line. Reopening the same path
    /// restarts the sequence from the first data row.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| unreadable(&path, &e))?;
        let mut reader = BufReader::new(MultiGzDecoder::new(file));

        let mut buf = Vec::new();
        reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| unreadable(&path, &e))?;

        let header_line = String::from_utf8_lossy(strip_line_end(&buf));
        if header_line.trim().is_empty() {
            return Err(DecodeError::EmptyHeader { path });
        }
        let header = header_line
            .split('\t')
            .map(|name| name.trim().to_string())
            .collect();

        Ok(Self {
            path,
            header,
            reader,
            buf,
            line: 1,
            done: false,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_line(&self, line: u64, content: &[u8]) -> Result<RawRow, DecodeError> {
        let record = ByteRecord::from(content.split(|b| *b == b'\t').collect::<Vec<_>>());
        if record.len() != self.header.len() {
            return Err(DecodeError::FieldCount {
                line,
                expected: self.header.len(),
                found: record.len(),
            });
        }

        let fields = StringRecord::from_byte_record(record).map_err(|e| {
            let field = e.utf8_error().field();
            let raw = e.into_byte_record();
            DecodeError::InvalidEncoding {
                line,
                error: FieldCoercionError {
                    column: self.header.get(field).cloned().unwrap_or_default(),
                    raw_value: raw
                        .get(field)
                        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                        .unwrap_or_default(),
                    reason: "invalid UTF-8".to_string(),
                },
            }
        })?;
        Ok(RawRow { line, fields })
    }
}

impl Iterator for TsvDecoder {
    type Item = Result<RawRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let content = strip_line_end(&self.buf);
                    if content.is_empty() {
                        debug!("{}: skipping blank line {}", self.path.display(), self.line);
                        continue;
                    }
                    return Some(self.decode_line(self.line, content));
                }
                Err(e) => {
                    // A broken stream cannot be resynchronized.
                    self.done = true;
                    return Some(Err(unreadable(&self.path, &e)));
                }
            }
        }
        None
    }
}

fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn unreadable(path: &Path, error: &io::Error) -> DecodeError {
    DecodeError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: error.to_string(),
        missing: error.kind() == io::ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_gz_bytes(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn write_gz(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        write_gz_bytes(dir, name, content.as_bytes())
    }

    #[test]
    fn test_reads_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(
            &dir,
            "people.tsv.gz",
            "id\tname\tbirthYear\np1\tAda Lovelace\t1815\np2\tAlan Turing\t1912\n",
        );

        let mut decoder = TsvDecoder::open(&path).unwrap();
        assert_eq!(decoder.header(), &["id", "name", "birthYear"]);

        let first = decoder.next().unwrap().unwrap();
        assert_eq!(first.line, 2);
        assert_eq!(first.get(1), Some("Ada Lovelace"));
        let second = decoder.next().unwrap().unwrap();
        assert_eq!(second.line, 3);
        assert_eq!(second.get(2), Some("1912"));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_quotes_and_null_sentinel_pass_through_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(
            &dir,
            "titles.tsv.gz",
            "id\ttitle\tyear\nt1\t\"Weird\" Title \"\t\\N\n",
        );

        let row = TsvDecoder::open(&path).unwrap().next().unwrap().unwrap();
        assert_eq!(row.get(1), Some("\"Weird\" Title \""));
        assert_eq!(row.get(2), Some("\\N"));
    }

    #[test]
    fn test_crlf_line_endings_are_stripped() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "crlf.tsv.gz", "id\tname\r\np1\tAda\r\n");

        let mut decoder = TsvDecoder::open(&path).unwrap();
        assert_eq!(decoder.header(), &["id", "name"]);
        let row = decoder.next().unwrap().unwrap();
        assert_eq!(row.get(1), Some("Ada"));
    }

    #[test]
    fn test_header_only_file_yields_no_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "empty.tsv.gz", "id\tname\n");

        let mut decoder = TsvDecoder::open(&path).unwrap();
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_blank_first_line_is_empty_header() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "blank.tsv.gz", "\np1\tAda\n");

        assert!(matches!(
            TsvDecoder::open(&path),
            Err(DecodeError::EmptyHeader { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_flagged_as_missing() {
        let dir = TempDir::new().unwrap();
        match TsvDecoder::open(dir.path().join("nope.tsv.gz")) {
            Err(DecodeError::SourceUnreadable { missing, .. }) => assert!(missing),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_plain_text_is_not_a_gzip_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tsv.gz");
        std::fs::write(&path, "id\tname\np1\tAda\n").unwrap();

        match TsvDecoder::open(&path) {
            Err(DecodeError::SourceUnreadable { missing, .. }) => assert!(!missing),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_short_row_reports_field_count() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "short.tsv.gz", "id\tname\tyear\np1\tAda\n");

        let err = TsvDecoder::open(&path).unwrap().next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldCount {
                line: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_reopening_restarts_from_first_row() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "again.tsv.gz", "id\np1\np2\n");

        let first_pass: Vec<String> = TsvDecoder::open(&path)
            .unwrap()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect();
        let second_pass: Vec<String> = TsvDecoder::open(&path)
            .unwrap()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect();
        assert_eq!(first_pass, vec!["p1", "p2"]);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_blank_lines_still_count_toward_line_numbers() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "gaps.tsv.gz", "id\tname\np1\tAda\n\np2\tAlan\n\r\n");

        let rows: Vec<(u64, String)> = TsvDecoder::open(&path)
            .unwrap()
            .map(|r| {
                let row = r.unwrap();
                (row.line, row.get(0).unwrap().to_string())
            })
            .collect();
        assert_eq!(rows, vec![(2, "p1".to_string()), (4, "p2".to_string())]);
    }

    #[test]
    fn test_invalid_utf8_is_a_row_error_not_a_dead_stream() {
        let dir = TempDir::new().unwrap();
        let path = write_gz_bytes(
            &dir,
            "encoding.tsv.gz",
            b"id\tname\np1\tAda\np2\tBad\xFF\xFE\np3\tGrace\n",
        );

        let mut decoder = TsvDecoder::open(&path).unwrap();
        assert_eq!(decoder.next().unwrap().unwrap().get(1), Some("Ada"));
        match decoder.next().unwrap() {
            Err(DecodeError::InvalidEncoding { line, error }) => {
                assert_eq!(line, 3);
                assert_eq!(error.column, "name");
                assert_eq!(error.raw_value, "Bad\u{FFFD}\u{FFFD}");
                assert_eq!(error.reason, "invalid UTF-8");
            }
            other => panic!("unexpected item: {:?}", other.map(|r| r.line)),
        }
        let last = decoder.next().unwrap().unwrap();
        assert_eq!((last.line, last.get(1)), (4, Some("Grace")));
        assert!(decoder.next().is_none());
    }
}
