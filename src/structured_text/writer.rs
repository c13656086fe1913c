//! Structured text serializer.
//!
//! Attribute names may not contain `|`, and values may not contain `|` or
//! `)`. The grammar has no escape for either.

use super::StructuredTextRecord;

/// Serialize a record tree, one record per line with two-space indents.
pub fn write(record: &StructuredTextRecord) -> String {
    let mut out = String::new();
    write_record(&mut out, record, 0);
    out
}

fn write_record(out: &mut String, record: &StructuredTextRecord, depth: usize) {
    if depth > 0 {
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
    }
    out.push('(');
    out.push_str(&record.number.to_string());
    out.push_str("||");
    out.push_str(&record.name);

    out.push('(');
    let attrs: Vec<String> = record
        .attributes
        .iter()
        .map(|(k, v)| format!("{}|{}", k, v))
        .collect();
    out.push_str(&attrs.join("|"));
    out.push(')');

    out.push('(');
    for child in &record.children {
        write_record(out, child, depth + 1);
    }
    out.push_str("))");
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    fn calendar() -> StructuredTextRecord {
        let range = |n, s: &str, f: &str| {
            StructuredTextRecord::new(n, n.to_string())
                .with_attribute("s", s)
                .with_attribute("f", f)
        };
        StructuredTextRecord::new(0, "CalendarData")
            .with_child(
                StructuredTextRecord::new(0, "DaysOfWeek")
                    .with_child(StructuredTextRecord::new(0, "1"))
                    .with_child(
                        StructuredTextRecord::new(0, "2")
                            .with_child(range(0, "08:00", "12:00"))
                            .with_child(range(1, "1:00 PM", "5:00 PM")),
                    ),
            )
            .with_child(
                StructuredTextRecord::new(1, "Exceptions").with_child(
                    StructuredTextRecord::new(0, "0").with_attribute("d", "45292"),
                ),
            )
    }

    #[test]
    fn test_write_flat_record() {
        let record = StructuredTextRecord::new(0, "Options")
            .with_attribute("a", "1")
            .with_attribute("b", "");
        assert_eq!(write(&record), "(0||Options(a|1|b|)())");
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let original = calendar();
        let text = write(&original);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, original);
        // Values with spaces survive the indentation
        let pm = &parsed.children[0].children[1].children[1];
        assert_eq!(pm.attribute("s"), Some("1:00 PM"));
    }

    #[test]
    fn test_rewrite_is_stable() {
        let text = write(&calendar());
        assert_eq!(write(&parse(&text).unwrap()), text);
    }
}
