//! Recursive-descent parser for structured text.

use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

use super::StructuredTextRecord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuredTextError {
    #[error("Unexpected character: expected {expected:?}, found {found:?}")]
    UnexpectedChar { expected: char, found: char },
    #[error("Missing record number")]
    MissingRecordNumber,
    #[error("Expected '||' after record number, found {0:?}")]
    MissingSeparator(String),
    #[error("Unexpected end of structured text")]
    UnexpectedEof,
}

/// Parse with default settings (tolerant).
pub fn parse(text: &str) -> Result<StructuredTextRecord, StructuredTextError> {
    StructuredTextParser::new(text).parse()
}

pub struct StructuredTextParser<'a> {
    chars: Peekable<Chars<'a>>,
    raise_on_error: bool,
}

impl<'a> StructuredTextParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            raise_on_error: false,
        }
    }

    /// When set, the first malformed record aborts the parse. Otherwise each
    /// record keeps whatever was read before the fault.
    pub fn raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    pub fn parse(mut self) -> Result<StructuredTextRecord, StructuredTextError> {
        self.parse_record()
    }

    fn parse_record(&mut self) -> Result<StructuredTextRecord, StructuredTextError> {
        let mut record = StructuredTextRecord::default();
        match self.parse_into(&mut record) {
            Ok(()) => Ok(record),
            Err(e) if self.raise_on_error => Err(e),
            Err(e) => {
                debug!("Partial structured text record {:?}: {}", record.name, e);
                Ok(record)
            }
        }
    }

    fn parse_into(&mut self, record: &mut StructuredTextRecord) -> Result<(), StructuredTextError> {
        self.expect('(')?;

        // Record number
        self.skip_whitespace();
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        record.number = digits
            .parse()
            .map_err(|_| StructuredTextError::MissingRecordNumber)?;

        self.skip_whitespace();
        let mut separator = String::new();
        while self.chars.peek() == Some(&'|') {
            separator.push('|');
            self.chars.next();
        }
        if separator != "||" {
            return Err(StructuredTextError::MissingSeparator(separator));
        }

        // Name runs up to the attribute list
        self.skip_whitespace();
        let mut name = String::new();
        loop {
            match self.read()? {
                '(' => break,
                c => name.push(c),
            }
        }
        record.name = name;

        // Attributes: name|value|name|value)
        let mut c = self.read()?;
        while c != ')' {
            let mut attr = String::new();
            while c != '|' {
                attr.push(c);
                c = self.read()?;
            }

            let mut value = String::new();
            c = self.read()?;
            while c != '|' && c != ')' {
                value.push(c);
                c = self.read()?;
            }
            record.attributes.insert(attr, value);

            if c == '|' {
                c = self.read()?;
            }
        }

        // Children
        self.expect('(')?;
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some('(') => {
                    let child = self.parse_record()?;
                    record.children.push(child);
                }
                Some(_) => break,
                None => return Err(StructuredTextError::UnexpectedEof),
            }
        }
        self.expect(')')?;
        self.expect(')')?;
        Ok(())
    }

    fn read(&mut self) -> Result<char, StructuredTextError> {
        self.chars.next().ok_or(StructuredTextError::UnexpectedEof)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c.is_control() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), StructuredTextError> {
        self.skip_whitespace();
        let found = self.read()?;
        if found == expected {
            Ok(())
        } else {
            Err(StructuredTextError::UnexpectedChar { expected, found })
        }
    }
}
