//! Primavera tabular export (XER) reader.

mod lexer;
mod number;
mod parser;
mod types;

pub use number::NumberFormat;
pub use parser::{XerFile, XerParser, REQUIRED_TABLES};
pub use types::{column_type, ColumnType};
