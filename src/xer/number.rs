//! Decimal format of the default currency.

use crate::value::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

impl NumberFormat {
    /// Separators from a `currtype` row. Missing symbols keep the defaults.
    pub fn from_currency(row: &Row) -> Self {
        let first = |column: &str| row.get_string(column).and_then(|s| s.chars().next());
        let default = Self::default();
        Self {
            decimal_separator: first("decimal_symbol").unwrap_or(default.decimal_separator),
            grouping_separator: first("digit_group_symbol").unwrap_or(default.grouping_separator),
        }
    }

    pub fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let normalized: String = text
            .chars()
            .filter(|&c| c != self.grouping_separator || c == self.decimal_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();
        if !normalized
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'E' | 'e'))
        {
            return None;
        }
        normalized.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let nf = NumberFormat::default();
        assert_eq!(nf.parse("1,234.5"), Some(1234.5));
        assert_eq!(nf.parse("-8"), Some(-8.0));
        assert_eq!(nf.parse("abc"), None);
        assert_eq!(nf.parse(""), None);
    }

    #[test]
    fn test_comma_decimal_format() {
        let row = Row::from_pairs([("decimal_symbol", ","), ("digit_group_symbol", ".")]);
        let nf = NumberFormat::from_currency(&row);
        assert_eq!(nf.parse("1.234,5"), Some(1234.5));
        assert_eq!(nf.parse("8,0"), Some(8.0));
    }
}
