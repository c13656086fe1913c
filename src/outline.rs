//! Column-aligned text outline of a schedule.

use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::model::{Schedule, Task};

const HEADERS: [&str; 8] = ["ID", "UID", "Name", "Start", "Finish", "Duration", "%", ""];

/// Columns that hold numbers are right aligned.
const RIGHT_ALIGNED: [bool; 8] = [true, true, false, false, false, true, true, false];

pub struct OutlineRenderer {
    pub indent: usize,
    pub date_format: String,
    pub gap: usize,
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self {
            indent: 2,
            date_format: "%Y-%m-%d %H:%M".to_string(),
            gap: 2,
        }
    }
}

impl OutlineRenderer {
    pub fn render(&self, schedule: &Schedule) -> String {
        let mut rows: Vec<[String; 8]> = vec![HEADERS.map(String::from)];
        for id in schedule.pre_order() {
            rows.push(self.row(schedule.task(id)));
        }

        let mut widths = [0usize; 8];
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }

        let mut out = String::new();
        if let Some(name) = &schedule.properties.name {
            out.push_str(name);
            out.push('\n');
        }
        for (i, row) in rows.iter().enumerate() {
            out.push_str(&self.line(row, &widths));
            out.push('\n');
            if i == 0 {
                let total = widths.iter().sum::<usize>() + self.gap * (widths.len() - 1);
                out.push_str(&"-".repeat(total));
                out.push('\n');
            }
        }
        out
    }

    fn row(&self, task: &Task) -> [String; 8] {
        let level = task.outline_level.unwrap_or(1).saturating_sub(1) as usize;
        let name = format!(
            "{}{}",
            " ".repeat(level * self.indent),
            task.name.as_deref().unwrap_or_default()
        );
        [
            task.id.map(|v| v.to_string()).unwrap_or_default(),
            task.unique_id.map(|v| v.to_string()).unwrap_or_default(),
            name,
            self.date(task.start),
            self.date(task.finish),
            task.duration.map(|d| d.to_string()).unwrap_or_default(),
            task.percent_complete
                .map(|p| format!("{:.0}", p))
                .unwrap_or_default(),
            if task.critical { "*".to_string() } else { String::new() },
        ]
    }

    fn date(&self, value: Option<NaiveDateTime>) -> String {
        value
            .map(|d| d.format(&self.date_format).to_string())
            .unwrap_or_default()
    }

    fn line(&self, row: &[String; 8], widths: &[usize; 8]) -> String {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str(&" ".repeat(self.gap));
            }
            let pad = " ".repeat(widths[i].saturating_sub(cell.width()));
            if RIGHT_ALIGNED[i] {
                line.push_str(&pad);
                line.push_str(cell);
            } else {
                line.push_str(cell);
                line.push_str(&pad);
            }
        }
        line.trim_end().to_string()
    }
}
