//! Splits a byte stream into tab-delimited records.

use encoding_rs::Encoding;
use std::io::BufRead;

use crate::error::ReadError;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line the record started on.
    pub line: usize,
    pub tokens: Vec<String>,
}

impl Record {
    pub fn kind(&self) -> &str {
        self.tokens.first().map(|s| s.as_str()).unwrap_or("")
    }
}

/// Reads one line at a time, decoding each with the configured encoding.
/// Blank lines are skipped.
pub struct Lexer<R> {
    reader: R,
    encoding: &'static Encoding,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> Lexer<R> {
    pub fn new(reader: R, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            encoding,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Line number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn next_record(&mut self) -> Result<Option<Record>, ReadError> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|source| ReadError::Io {
                    line: self.line + 1,
                    source,
                })?;
            if n == 0 {
                return Ok(None);
            }
            self.line += 1;

            while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                self.buf.pop();
            }
            if self.buf.is_empty() {
                continue;
            }

            let text = if self.line == 1 {
                let (text, _, _) = self.encoding.decode(&self.buf);
                text
            } else {
                let (text, _) = self.encoding.decode_without_bom_handling(&self.buf);
                text
            };

            return Ok(Some(Record {
                line: self.line,
                tokens: text.split('\t').map(str::to_string).collect(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(input: &[u8]) -> Vec<Record> {
        let mut lexer = Lexer::new(input, encoding_rs::WINDOWS_1252);
        let mut out = Vec::new();
        while let Some(r) = lexer.next_record().unwrap() {
            out.push(r);
        }
        out
    }

    #[test]
    fn test_split_records() {
        let rs = records(b"ERMHDR\t19.12\r\n%T\tTASK\n\n%F\ttask_id\ttask_name\n");
        assert_eq!(rs.len(), 3);
        assert_eq!(rs[0].tokens, vec!["ERMHDR", "19.12"]);
        assert_eq!(rs[1].kind(), "%T");
        // Blank line still counts
        assert_eq!(rs[2].line, 4);
    }

    #[test]
    fn test_empty_cells_preserved() {
        let rs = records(b"%R\t1\t\t3\t\n");
        assert_eq!(rs[0].tokens, vec!["%R", "1", "", "3", ""]);
    }

    #[test]
    fn test_leading_tab_is_empty_kind() {
        let rs = records(b"\tmore text\n");
        assert_eq!(rs[0].kind(), "");
    }

    #[test]
    fn test_windows_1252_decoding() {
        let rs = records(b"%R\tCaf\xe9\n");
        assert_eq!(rs[0].tokens[1], "Caf\u{e9}");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut lexer = Lexer::new(&b"\xef\xbb\xbfERMHDR\t1\n"[..], encoding_rs::UTF_8);
        let r = lexer.next_record().unwrap().unwrap();
        assert_eq!(r.kind(), "ERMHDR");
    }
}
