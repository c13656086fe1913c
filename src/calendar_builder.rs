//! Builds calendars from `calendar` table rows.

use chrono::{Duration as Span, NaiveDate, NaiveTime, Weekday};
use tracing::{debug, warn};

use crate::calendar::{Calendar, CalendarId, Calendars, TimeRange};
use crate::codes::CalendarType;
use crate::duration::MinutesPerPeriod;
use crate::error::{FieldError, ReadError, Result, Tolerance};
use crate::structured_text::{StructuredTextParser, StructuredTextRecord};
use crate::value::Row;

/// Day zero for exception day counts.
pub fn exception_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Day record names run from 1 (Sunday) to 7 (Saturday).
fn weekday_from_record(name: &str) -> Option<Weekday> {
    match name.trim() {
        "1" => Some(Weekday::Sun),
        "2" => Some(Weekday::Mon),
        "3" => Some(Weekday::Tue),
        "4" => Some(Weekday::Wed),
        "5" => Some(Weekday::Thu),
        "6" => Some(Weekday::Fri),
        "7" => Some(Weekday::Sat),
        _ => None,
    }
}

/// `H:mm`, or `h:mm a` when the text contains a space.
pub fn parse_time(text: &str) -> std::result::Result<NaiveTime, FieldError> {
    let trimmed = text.trim();
    if trimmed == "24:00" {
        return Ok(NaiveTime::MIN);
    }
    let format = if trimmed.contains(' ') { "%I:%M %p" } else { "%H:%M" };
    NaiveTime::parse_from_str(trimmed, format).map_err(|_| FieldError::Time(text.to_string()))
}

pub struct CalendarBuilder<'a> {
    tolerance: &'a mut Tolerance,
    raise_on_structured_text_error: bool,
}

impl<'a> CalendarBuilder<'a> {
    pub fn new(tolerance: &'a mut Tolerance) -> Self {
        Self {
            tolerance,
            raise_on_structured_text_error: false,
        }
    }

    pub fn raise_on_structured_text_error(mut self, raise: bool) -> Self {
        self.raise_on_structured_text_error = raise;
        self
    }

    /// Build every calendar, then link parents. The first calendar flagged
    /// as default becomes the default.
    pub fn build<'r, I>(&mut self, rows: I) -> Result<Calendars>
    where
        I: IntoIterator<Item = &'r Row>,
    {
        let mut calendars = Calendars::new();
        let mut parents: Vec<(CalendarId, i32)> = Vec::new();

        for row in rows {
            let calendar = self.calendar(row)?;
            let is_default = row.get_boolean("default_flag");
            let base = self.tolerance.value(row.get_integer("base_clndr_id"))?;
            let id = calendars.add(calendar);
            if let Some(base) = base {
                parents.push((id, base));
            }
            if is_default && calendars.default_calendar().is_none() {
                calendars.set_default(id);
            }
        }

        for (id, base) in parents {
            match calendars.by_unique_id(base) {
                Some(parent) if parent != id => calendars.get_mut(id).parent = Some(parent),
                _ => warn!("Calendar {:?} has unknown base calendar {}", calendars.get(id).unique_id, base),
            }
        }

        debug!("Built {} calendars", calendars.len());
        Ok(calendars)
    }

    pub fn calendar(&mut self, row: &Row) -> Result<Calendar> {
        let unique_id = self.tolerance.value(row.get_integer("clndr_id"))?;
        let mut calendar = Calendar::new(row.get_string("clndr_name").unwrap_or_default());
        calendar.unique_id = unique_id;
        calendar.calendar_type = row
            .get_string("clndr_type")
            .and_then(|c| CalendarType::from_code(&c))
            .unwrap_or_default();
        calendar.project_id = self.tolerance.value(row.get_integer("proj_id"))?;
        calendar.personal = row.get_boolean("rsrc_private");

        if let Some(data) = row.get_string("clndr_data").filter(|s| !s.is_empty()) {
            let root = StructuredTextParser::new(&data)
                .raise_on_error(self.raise_on_structured_text_error)
                .parse()
                .map_err(ReadError::from)?;
            if let Some(days) = root.child("DaysOfWeek") {
                self.days(&mut calendar, days)?;
            }
            if let Some(exceptions) = root.child("Exceptions") {
                self.exceptions(&mut calendar, exceptions)?;
            }
        }

        if calendar.ensure_working_time() {
            debug!("Calendar {:?} has no working time, using defaults", calendar.name);
        }

        let hours = [
            self.tolerance.value(row.get_double("day_hr_cnt"))?,
            self.tolerance.value(row.get_double("week_hr_cnt"))?,
            self.tolerance.value(row.get_double("month_hr_cnt"))?,
            self.tolerance.value(row.get_double("year_hr_cnt"))?,
        ];
        calendar.minutes = minutes_per_period(&calendar, hours);

        Ok(calendar)
    }

    fn days(&mut self, calendar: &mut Calendar, days: &StructuredTextRecord) -> Result<()> {
        for day in &days.children {
            let Some(weekday) = weekday_from_record(&day.name) else {
                debug!("Ignoring day record {:?}", day.name);
                continue;
            };
            let ranges = self.ranges(day)?;
            calendar.set_hours(weekday, ranges);
        }
        Ok(())
    }

    fn exceptions(&mut self, calendar: &mut Calendar, exceptions: &StructuredTextRecord) -> Result<()> {
        for exception in &exceptions.children {
            let text = exception.attribute("d").unwrap_or("");
            let date = text
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(Span::try_days)
                .and_then(|span| exception_epoch().checked_add_signed(span));
            let Some(date) = date else {
                self.tolerance.report(FieldError::ExceptionDay(text.to_string()))?;
                continue;
            };
            let ranges = self.ranges(exception)?;
            calendar.add_exception(date, ranges);
        }
        Ok(())
    }

    /// Time ranges from the children of a day or exception record.
    /// Children missing either end are skipped.
    fn ranges(&mut self, record: &StructuredTextRecord) -> Result<Vec<TimeRange>> {
        let mut ranges = Vec::new();
        for hours in &record.children {
            let (Some(s), Some(f)) = (hours.attribute("s"), hours.attribute("f")) else {
                continue;
            };
            if s.is_empty() || f.is_empty() {
                continue;
            }
            match (parse_time(s), parse_time(f)) {
                (Ok(start), Ok(end)) => ranges.push(TimeRange::new(start, end)),
                (Err(e), _) | (_, Err(e)) => self.tolerance.report(e)?,
            }
        }
        Ok(ranges)
    }
}

/// Explicit hour counts win; any missing period is derived from the weekly
/// working hours.
pub fn minutes_per_period(calendar: &Calendar, hours: [Option<f64>; 4]) -> MinutesPerPeriod {
    let week = calendar.week_minutes();
    let working_days = calendar.working_day_count();
    let day = if working_days == 0 { 0 } else { week / working_days };
    let month = week * 4;
    let derived = MinutesPerPeriod {
        day,
        week,
        month,
        year: month * 12,
    };

    let explicit = |h: Option<f64>, fallback: u32| h.map(|h| (h * 60.0) as u32).unwrap_or(fallback);
    let [day_h, week_h, month_h, year_h] = hours;
    MinutesPerPeriod {
        day: explicit(day_h, derived.day),
        week: explicit(week_h, derived.week),
        month: explicit(month_h, derived.month),
        year: explicit(year_h, derived.year),
    }
}

/// Pick the default calendar: the project's pointer, else the first flagged
/// calendar, else a synthesized standard calendar.
pub fn select_default_calendar(calendars: &mut Calendars, project_default: Option<i32>) -> CalendarId {
    if let Some(id) = project_default.and_then(|uid| calendars.by_unique_id(uid)) {
        calendars.set_default(id);
        return id;
    }
    match calendars.default_calendar() {
        Some(id) => id,
        None => {
            debug!("No default calendar, adding one");
            calendars.add_default_calendar()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured_text::write;

    fn days_record(spec: &[(&str, &[(&str, &str)])]) -> StructuredTextRecord {
        let mut days = StructuredTextRecord::new(0, "DaysOfWeek");
        for (name, ranges) in spec {
            let mut day = StructuredTextRecord::new(0, *name);
            for (i, (s, f)) in ranges.iter().enumerate() {
                day = day.with_child(
                    StructuredTextRecord::new(0, i.to_string())
                        .with_attribute("s", *s)
                        .with_attribute("f", *f),
                );
            }
            days = days.with_child(day);
        }
        days
    }

    fn weekdays_8_to_16() -> String {
        let work: &[(&str, &str)] = &[("08:00", "16:00")];
        let off: &[(&str, &str)] = &[];
        let days = days_record(&[
            ("1", off),
            ("2", work),
            ("3", work),
            ("4", work),
            ("5", work),
            ("6", work),
            ("7", off),
        ]);
        let exceptions = StructuredTextRecord::new(0, "Exceptions")
            .with_child(StructuredTextRecord::new(0, "0").with_attribute("d", "45292"))
            .with_child(
                StructuredTextRecord::new(0, "1")
                    .with_attribute("d", "45293")
                    .with_child(
                        StructuredTextRecord::new(0, "0")
                            .with_attribute("s", "10:00")
                            .with_attribute("f", "12:00"),
                    ),
            );
        write(
            &StructuredTextRecord::new(0, "CalendarData")
                .with_child(days)
                .with_child(exceptions),
        )
    }

    #[test]
    fn test_derived_minutes() {
        let data = weekdays_8_to_16();
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_name", "Std"), ("clndr_data", data.as_str())]);
        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        assert_eq!(
            calendar.minutes,
            MinutesPerPeriod {
                day: 480,
                week: 2400,
                month: 9600,
                year: 115_200
            }
        );
        assert!(!calendar.is_working_day(Weekday::Sun));
        assert_eq!(calendar.hours(Weekday::Wed), &[TimeRange::hm(8, 0, 16, 0)]);
    }

    #[test]
    fn test_explicit_day_hours_with_derived_week() {
        let data = weekdays_8_to_16();
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_data", data.as_str()), ("day_hr_cnt", "7.5")]);
        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        assert_eq!(calendar.minutes.day, 450);
        assert_eq!(calendar.minutes.week, 2400);
    }

    #[test]
    fn test_exceptions_from_epoch() {
        let data = weekdays_8_to_16();
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_data", data.as_str())]);
        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        let new_year = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(calendar.exception(new_year), Some(&[][..]));
        let next = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(calendar.exception(next), Some(&[TimeRange::hm(10, 0, 12, 0)][..]));
    }

    #[test]
    fn test_twelve_hour_times() {
        assert_eq!(parse_time("8:00 AM").unwrap(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(parse_time("1:30 PM").unwrap(), NaiveTime::from_hms_opt(13, 30, 0).unwrap());
        assert_eq!(parse_time("8:00").unwrap(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert!(matches!(parse_time("noon"), Err(FieldError::Time(_))));
    }

    #[test]
    fn test_incomplete_range_skipped() {
        let data = "(0||CalendarData()((0||DaysOfWeek()((0||2()((0||0(s|08:00)())(0||1(s|13:00|f|17:00)()))))))";
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_data", data)]);
        let mut tolerance = Tolerance::new(false);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        assert_eq!(calendar.hours(Weekday::Mon), &[TimeRange::hm(13, 0, 17, 0)]);
        assert_eq!(calendar.working_day_count(), 1);
    }

    #[test]
    fn test_bad_exception_day() {
        let data = "(0||CalendarData()((0||Exceptions()((0||0(d|soon)())))))";
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_data", data)]);

        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        assert_eq!(calendar.exceptions().count(), 0);
        assert_eq!(tolerance.ignored().len(), 1);

        let mut strict = Tolerance::new(false);
        let err = CalendarBuilder::new(&mut strict).calendar(&row).unwrap_err();
        assert!(matches!(err, ReadError::Field(FieldError::ExceptionDay(_))));
    }

    #[test]
    fn test_out_of_range_exception_day() {
        let data = "(0||CalendarData()((0||Exceptions()((0||0(d|999999999999)())(0||1(d|45292)())))))";
        let row = Row::from_pairs([("clndr_id", "1"), ("clndr_data", data)]);

        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        let new_year = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(calendar.exceptions().count(), 1);
        assert_eq!(calendar.exception(new_year), Some(&[][..]));
        assert!(matches!(
            tolerance.ignored(),
            [FieldError::ExceptionDay(d)] if d == "999999999999"
        ));
    }

    #[test]
    fn test_empty_data_gets_default_week() {
        let row = Row::from_pairs([("clndr_id", "1")]);
        let mut tolerance = Tolerance::new(true);
        let calendar = CalendarBuilder::new(&mut tolerance).calendar(&row).unwrap();
        assert_eq!(calendar.working_day_count(), 5);
        assert_eq!(calendar.minutes.day, 480);
    }

    #[test]
    fn test_parents_and_default() {
        let rows = vec![
            Row::from_pairs([("clndr_id", "1"), ("clndr_type", "CA_Base"), ("default_flag", "N"), ("base_clndr_id", "")]),
            Row::from_pairs([("clndr_id", "2"), ("clndr_type", "CA_Rsrc"), ("default_flag", "Y"), ("base_clndr_id", "1")]),
            Row::from_pairs([("clndr_id", "3"), ("clndr_type", "CA_Base"), ("default_flag", "Y"), ("base_clndr_id", "99")]),
        ];
        let mut tolerance = Tolerance::new(true);
        let mut calendars = CalendarBuilder::new(&mut tolerance).build(&rows).unwrap();
        let one = calendars.by_unique_id(1).unwrap();
        let two = calendars.by_unique_id(2).unwrap();
        let three = calendars.by_unique_id(3).unwrap();
        assert_eq!(calendars.get(two).parent, Some(one));
        assert_eq!(calendars.get(two).calendar_type, CalendarType::Resource);
        assert_eq!(calendars.get(three).parent, None);
        assert_eq!(calendars.default_calendar(), Some(two));

        assert_eq!(select_default_calendar(&mut calendars, Some(3)), three);
        assert_eq!(select_default_calendar(&mut calendars, Some(42)), three);
    }

    #[test]
    fn test_synthesized_default() {
        let mut calendars = Calendars::new();
        let id = select_default_calendar(&mut calendars, None);
        assert_eq!(calendars.get(id).name, "Standard");
        assert_eq!(calendars.get(id).unique_id, Some(1));
    }
}
