//! Nested parenthesized attribute records, as stored in calendar and
//! scheduling-option cells.
//!
//! ```text
//! (0||CalendarData()(
//!   (0||DaysOfWeek()(
//!     (0||1()())
//!     (0||2()((0||0(s|08:00|f|16:00)())))
//!   ))
//! ))
//! ```

mod parser;
mod writer;

use std::collections::BTreeMap;

pub use parser::{parse, StructuredTextError, StructuredTextParser};
pub use writer::write;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredTextRecord {
    pub number: u32,
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<StructuredTextRecord>,
}

impl StructuredTextRecord {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: StructuredTextRecord) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&StructuredTextRecord> {
        self.children.iter().find(|c| c.name == name)
    }
}
