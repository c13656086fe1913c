//! Record state machine: tab-delimited records to typed table rows.

use encoding_rs::Encoding;
use std::collections::{HashMap, HashSet};
use std::io::{BufReader, Read};
use std::sync::Arc;

use tracing::{debug, info};

use super::lexer::{Lexer, Record};
use super::number::NumberFormat;
use super::types::{column_type, ColumnType};
use crate::error::{ReadError, Result};
use crate::value::{parse_timestamp, Columns, Row, Value};

/// Tables the schedule reader consumes. Everything else is tokenized and
/// dropped.
pub const REQUIRED_TABLES: &[&str] = &[
    "currtype",
    "project",
    "calendar",
    "rsrc",
    "roles",
    "projwbs",
    "task",
    "taskpred",
    "taskrsrc",
    "projcost",
    "schedoptions",
    "projprop",
];

const DEFAULT_CURRENCY_NAME: &str = "USD";

/// Parsed contents of one export.
#[derive(Debug, Default)]
pub struct XerFile {
    header: Vec<String>,
    tables: HashMap<String, Vec<Row>>,
    default_currency: Option<Row>,
}

impl XerFile {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Rows of a table in file order. Unknown or skipped tables are empty.
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Rows of a table whose integer column equals `id`.
    pub fn rows_where(&self, table: &str, column: &str, id: i32) -> Vec<&Row> {
        self.rows(table)
            .iter()
            .filter(|row| matches!(row.get_integer(column), Ok(Some(v)) if v == id))
            .collect()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    /// The `currtype` row naming the export's default currency.
    pub fn default_currency(&self) -> Option<&Row> {
        self.default_currency.as_ref()
    }
}

/// "Current table" state while scanning.
#[derive(Debug)]
struct Scan {
    table: Option<String>,
    skip: bool,
    columns: Option<Arc<Columns>>,
    number_format: NumberFormat,
    default_currency_name: String,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            table: None,
            skip: true,
            columns: None,
            number_format: NumberFormat::default(),
            default_currency_name: DEFAULT_CURRENCY_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct XerParser {
    encoding: &'static Encoding,
    tables: HashSet<String>,
}

impl Default for XerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl XerParser {
    pub fn new() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1252,
            tables: REQUIRED_TABLES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Select the encoding by WHATWG label, e.g. `"utf-8"` or `"windows-1252"`.
    pub fn with_encoding_label(self, label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ReadError::UnknownEncoding(label.to_string()))?;
        Ok(self.with_encoding(encoding))
    }

    pub fn parse_str(&self, input: &str) -> Result<XerFile> {
        let lexer = Lexer::new(input.as_bytes(), encoding_rs::UTF_8);
        self.scan(lexer)
    }

    pub fn parse<R: Read>(&self, reader: R) -> Result<XerFile> {
        let lexer = Lexer::new(BufReader::new(reader), self.encoding);
        self.scan(lexer)
    }

    fn scan<R: std::io::BufRead>(&self, mut lexer: Lexer<R>) -> Result<XerFile> {
        let mut file = XerFile::default();
        let mut scan = Scan::default();

        let header = lexer
            .next_record()?
            .ok_or(ReadError::InvalidFile { line: lexer.line() })?;
        if !matches!(header.kind(), "ERMHDR" | "HEADER") {
            return Err(ReadError::InvalidFile { line: header.line });
        }
        if let Some(name) = header.tokens.get(8).filter(|s| !s.is_empty()) {
            scan.default_currency_name = name.clone();
        }
        file.header = header.tokens;

        while let Some(record) = lexer.next_record()? {
            match record.kind() {
                "%T" => self.start_table(&mut scan, &record),
                "%F" => {
                    scan.columns = if scan.skip {
                        None
                    } else {
                        Some(Arc::new(Columns::new(&record.tokens[1..])))
                    };
                }
                "%R" | "" => {
                    if !scan.skip {
                        self.data(&mut scan, &mut file, &record);
                    }
                }
                "%E" => break,
                other => debug!("Ignoring record {:?} at line {}", other, record.line),
            }
        }

        info!(
            "Read {} tables ({} rows) in {} lines",
            file.tables.len(),
            file.tables.values().map(Vec::len).sum::<usize>(),
            lexer.line()
        );
        Ok(file)
    }

    fn start_table(&self, scan: &mut Scan, record: &Record) {
        let name = record.tokens.get(1).map(|s| s.to_lowercase());
        scan.skip = !name.as_ref().is_some_and(|n| self.tables.contains(n));
        scan.columns = None;
        if scan.skip {
            debug!("Skipping table {:?} at line {}", name, record.line);
        } else {
            debug!("Reading table {:?} at line {}", name, record.line);
        }
        scan.table = name;
    }

    fn data(&self, scan: &mut Scan, file: &mut XerFile, record: &Record) {
        let (Some(table), Some(columns)) = (scan.table.as_ref(), scan.columns.as_ref()) else {
            debug!("Data record before field names at line {}", record.line);
            return;
        };

        let values = record.tokens[1..]
            .iter()
            .take(columns.len())
            .enumerate()
            .map(|(i, raw)| {
                let column = columns.name(i).unwrap_or("");
                coerce(table, column, raw, &scan.number_format)
            })
            .collect();
        let row = Row::new(Arc::clone(columns), values);

        // Separators must be known before any later numeric cell is read
        if table == "currtype" {
            let is_default = row
                .get_string("curr_short_name")
                .is_some_and(|n| n.eq_ignore_ascii_case(&scan.default_currency_name));
            if is_default {
                scan.number_format = NumberFormat::from_currency(&row);
                file.default_currency = Some(row.clone());
            }
        }

        file.tables.entry(table.clone()).or_default().push(row);
    }
}

fn coerce(table: &str, column: &str, raw: &str, number_format: &NumberFormat) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let fallback = || Value::Str(raw.to_string());
    let value = match column_type(table, column) {
        ColumnType::Date => parse_timestamp(raw).map(Value::Timestamp).unwrap_or_else(fallback),
        ColumnType::Currency | ColumnType::Numeric | ColumnType::Duration => number_format
            .parse(raw)
            .map(Value::Float)
            .unwrap_or_else(fallback),
        ColumnType::Integer => raw
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .unwrap_or_else(|_| fallback()),
        ColumnType::Str | ColumnType::Boolean | ColumnType::Guid => {
            Value::Str(raw.replace("\"\"", "\""))
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xer(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn test_missing_header_is_invalid() {
        let err = XerParser::new()
            .parse_str("%T\tTASK\n%F\ttask_id\n")
            .unwrap_err();
        assert!(matches!(err, ReadError::InvalidFile { line: 1 }));
    }

    #[test]
    fn test_empty_input_is_invalid() {
        let err = XerParser::new().parse_str("").unwrap_err();
        assert!(matches!(err, ReadError::InvalidFile { .. }));
    }

    #[test]
    fn test_typed_rows() {
        let input = xer(&[
            "ERMHDR\t19.12\t2024-01-01\tProject\tadmin\tAdmin\tdbxDatabaseNoName\tProject Management\tUSD",
            "%T\tTASK",
            "%F\ttask_id\ttask_name\tearly_start_date\ttarget_drtn_hr_cnt",
            "%R\t10\tPour \"\"slab\"\"\t2024-03-04 08:00\t16",
            "%E",
        ]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let rows = file.rows("task");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("task_id"), Some(&Value::Int(10)));
        assert_eq!(rows[0].get_string("task_name").as_deref(), Some("Pour \"slab\""));
        assert!(matches!(rows[0].get("early_start_date"), Some(Value::Timestamp(_))));
        assert_eq!(rows[0].get("target_drtn_hr_cnt"), Some(&Value::Float(16.0)));
    }

    #[test]
    fn test_unlisted_table_contributes_no_rows() {
        let input = xer(&[
            "ERMHDR\t19.12",
            "%T\tACTVCODE",
            "%F\tactv_code_id\tshort_name",
            "%R\t1\tA",
            "%T\tTASK",
            "%F\ttask_id",
            "%R\t7",
        ]);
        let file = XerParser::new().parse_str(&input).unwrap();
        assert!(file.rows("actvcode").is_empty());
        assert_eq!(file.rows("task").len(), 1);
        assert!(file.table_names().all(|t| t != "actvcode"));
    }

    #[test]
    fn test_extra_cells_truncated() {
        let input = xer(&["ERMHDR\t19.12", "%T\tTASK", "%F\ttask_id\ttask_code", "%R\t1\tA100\textra\tmore"]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let row = &file.rows("task")[0];
        assert_eq!(row.columns().len(), 2);
        assert_eq!(row.get_string("task_code").as_deref(), Some("A100"));
    }

    #[test]
    fn test_short_record_leaves_trailing_absent() {
        let input = xer(&["ERMHDR\t19.12", "%T\tTASK", "%F\ttask_id\ttask_code\ttask_name", "%R\t1"]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let row = &file.rows("task")[0];
        assert_eq!(row.get("task_code"), None);
        assert_eq!(row.get("task_name"), None);
    }

    #[test]
    fn test_bad_integer_kept_as_string() {
        let input = xer(&["ERMHDR\t19.12", "%T\tTASK", "%F\ttask_id", "%R\tX1"]);
        let file = XerParser::new().parse_str(&input).unwrap();
        assert_eq!(file.rows("task")[0].get("task_id"), Some(&Value::Str("X1".into())));
    }

    #[test]
    fn test_default_currency_changes_separators() {
        let input = xer(&[
            "ERMHDR\t19.12\t\t\t\t\t\t\tEUR",
            "%T\tCURRTYPE",
            "%F\tcurr_id\tcurr_short_name\tdecimal_symbol\tdigit_group_symbol",
            "%R\t1\tUSD\t.\t,",
            "%R\t2\tEUR\t,\t.",
            "%T\tPROJCOST",
            "%F\tcost_item_id\ttarget_cost\ttarget_qty",
            "%R\t1\t1.234,50\t2,5",
        ]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let currency = file.default_currency().unwrap();
        assert_eq!(currency.get_string("curr_short_name").as_deref(), Some("EUR"));
        let cost = &file.rows("projcost")[0];
        assert_eq!(cost.get("target_cost"), Some(&Value::Float(1234.5)));
        assert_eq!(cost.get("target_qty"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_end_record_stops_reading() {
        let input = xer(&["ERMHDR\t19.12", "%T\tTASK", "%F\ttask_id", "%R\t1", "%E", "%R\t2"]);
        let file = XerParser::new().parse_str(&input).unwrap();
        assert_eq!(file.rows("task").len(), 1);
    }

    #[test]
    fn test_empty_kind_record_is_data_row() {
        let input = xer(&["ERMHDR\t19.12", "%T\tTASK", "%F\ttask_id\ttask_code", "%R\t1\tA100", "\t2\tA200"]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let rows = file.rows("task");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("task_id"), Some(&Value::Int(2)));
        assert_eq!(rows[1].get_string("task_code").as_deref(), Some("A200"));
    }

    #[test]
    fn test_rows_where() {
        let input = xer(&[
            "ERMHDR\t19.12",
            "%T\tPROJWBS",
            "%F\twbs_id\tproj_id",
            "%R\t1\t100",
            "%R\t2\t200",
            "%R\t3\t100",
        ]);
        let file = XerParser::new().parse_str(&input).unwrap();
        let rows = file.rows_where("projwbs", "proj_id", 100);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert!(matches!(
            XerParser::new().with_encoding_label("no-such-charset"),
            Err(ReadError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_parse_from_reader_with_default_encoding() {
        let bytes = b"ERMHDR\t19.12\n%T\tTASK\n%F\ttask_id\ttask_name\n%R\t1\tCaf\xe9\n";
        let file = XerParser::new().parse(&bytes[..]).unwrap();
        assert_eq!(file.rows("task")[0].get_string("task_name").as_deref(), Some("Caf\u{e9}"));
    }
}
