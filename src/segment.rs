//! Splits an APS text file into per-patent documents.
//!
//! APS files are ISO-8859-1 encoded. The first line is a file header; every
//! following line that begins with the root marker (`PATN`) starts a new
//! document. Documents are produced lazily, one at a time, in file order.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// The raw text of one logical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 1-based line number of the document's first line in the source file
    pub start_line: usize,
    /// Lines joined with `\n`, root marker line first
    pub text: String,
}

impl Document {
    pub fn new(start_line: usize, text: impl Into<String>) -> Self {
        Self {
            start_line,
            text: text.into(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Line-oriented document iterator over one file.
///
/// Lines between the file header and the first root marker do not belong to
/// any document and are discarded.
pub struct DocumentSegmenter<R> {
    reader: R,
    root_marker: String,
    line_no: usize,
    raw: Vec<u8>,
    pending: Option<Document>,
    discarded: usize,
    done: bool,
}

impl DocumentSegmenter<BufReader<File>> {
    /// Open a file for segmentation
    pub fn open<P: AsRef<Path>>(path: P, root_marker: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), root_marker))
    }
}

impl<R: BufRead> DocumentSegmenter<R> {
    pub fn new(reader: R, root_marker: &str) -> Self {
        Self {
            reader,
            root_marker: root_marker.to_string(),
            line_no: 0,
            raw: Vec::new(),
            pending: None,
            discarded: 0,
            done: false,
        }
    }

    /// Read and decode the next line, without its line terminator
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.raw.clear();
        if self.reader.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        while matches!(self.raw.last(), Some(b'\n') | Some(b'\r')) {
            self.raw.pop();
        }
        Ok(Some(decode_latin1(&self.raw)))
    }

    fn report_discarded(&mut self) {
        if self.discarded > 0 {
            tracing::warn!(
                lines = self.discarded,
                "Discarding lines before the first '{}' marker",
                self.root_marker
            );
            self.discarded = 0;
        }
    }
}

impl<R: BufRead> Iterator for DocumentSegmenter<R> {
    type Item = io::Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    self.report_discarded();
                    return self.pending.take().map(Ok);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            // File-level header
            if self.line_no == 1 {
                continue;
            }

            if line.starts_with(&self.root_marker) {
                self.report_discarded();
                let finished = self.pending.replace(Document::new(self.line_no, line));
                if let Some(doc) = finished {
                    return Some(Ok(doc));
                }
                continue;
            }

            match self.pending.as_mut() {
                Some(doc) => {
                    doc.text.push('\n');
                    doc.text.push_str(&line);
                }
                None => self.discarded += 1,
            }
        }
    }
}

/// ISO-8859-1 maps every byte to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn segment(input: &[u8]) -> Vec<Document> {
        DocumentSegmenter::new(Cursor::new(input.to_vec()), "PATN")
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_splits_on_root_marker() {
        let docs = segment(
            b"HHHHHT APS1.5\nPATN\nWKU  039300018\nTTL  First\nPATN\nWKU  039300026\n",
        );

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], Document::new(2, "PATN\nWKU  039300018\nTTL  First"));
        assert_eq!(docs[1], Document::new(5, "PATN\nWKU  039300026"));
    }

    #[test]
    fn test_final_document_without_trailing_newline() {
        let docs = segment(b"header\nPATN\nWKU  1\nPATN\nWKU  2");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text, "PATN\nWKU  2");
    }

    #[test]
    fn test_header_only_file_yields_nothing() {
        assert!(segment(b"HHHHHT APS1.5\n").is_empty());
        assert!(segment(b"").is_empty());
    }

    #[test]
    fn test_discards_preamble_before_first_marker() {
        let docs = segment(b"header\nstray line\nPATN\nWKU  1\n");
        assert_eq!(docs, vec![Document::new(3, "PATN\nWKU  1")]);
    }

    #[test]
    fn test_crlf_and_latin1_decoding() {
        let docs = segment(b"header\r\nPATN\r\nNAM  M\xfcller\r\n");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "PATN\nNAM  M\u{fc}ller");
        assert_eq!(docs[0].lines().count(), 2);
    }

    #[test]
    fn test_header_line_is_never_a_document() {
        let docs = segment(b"PATN header-looking line\nPATN\nWKU  1\n");
        assert_eq!(docs, vec![Document::new(2, "PATN\nWKU  1")]);
    }
}
