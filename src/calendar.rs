//! Working-time calendars and calendar arithmetic.

use chrono::{Datelike, Duration as Span, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::collections::{BTreeMap, HashMap};

use crate::codes::CalendarType;
use crate::duration::{Duration, MinutesPerPeriod};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Index of a calendar within [`Calendars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarId(pub usize);

/// A working period within one day. An end at or before the start runs past
/// midnight, so `00:00`-`00:00` is the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Convenience for fixed hours, e.g. `TimeRange::hm(8, 0, 12, 0)`.
    pub fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self::new(t(start_h, start_m), t(end_h, end_m))
    }

    fn bounds(&self) -> (u32, u32) {
        let minute = |t: NaiveTime| t.hour() * 60 + t.minute();
        let start = minute(self.start);
        let mut end = minute(self.end);
        if end <= start {
            end += MINUTES_PER_DAY;
        }
        (start, end)
    }

    pub fn minutes(&self) -> u32 {
        let (start, end) = self.bounds();
        end - start
    }

    fn overlap(&self, from: u32, to: u32) -> u32 {
        let (start, end) = self.bounds();
        let lo = start.max(from);
        let hi = end.min(to);
        hi.saturating_sub(lo)
    }
}

/// Monday to Friday working hours applied to a calendar with none.
pub fn default_working_ranges() -> Vec<TimeRange> {
    vec![TimeRange::hm(8, 0, 12, 0), TimeRange::hm(13, 0, 17, 0)]
}

#[derive(Debug, Clone)]
pub struct Calendar {
    pub unique_id: Option<i32>,
    pub name: String,
    pub calendar_type: CalendarType,
    pub project_id: Option<i32>,
    pub personal: bool,
    pub parent: Option<CalendarId>,
    pub minutes: MinutesPerPeriod,
    hours: [Vec<TimeRange>; 7],
    exceptions: BTreeMap<NaiveDate, Vec<TimeRange>>,
}

impl Calendar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            unique_id: None,
            name: name.into(),
            calendar_type: CalendarType::default(),
            project_id: None,
            personal: false,
            parent: None,
            minutes: MinutesPerPeriod::default(),
            hours: Default::default(),
            exceptions: BTreeMap::new(),
        }
    }

    /// A calendar working Monday to Friday with the default hours.
    pub fn standard(name: impl Into<String>) -> Self {
        let mut calendar = Self::new(name);
        calendar.ensure_working_time();
        calendar
    }

    pub fn hours(&self, day: Weekday) -> &[TimeRange] {
        &self.hours[day.num_days_from_sunday() as usize]
    }

    pub fn set_hours(&mut self, day: Weekday, ranges: Vec<TimeRange>) {
        self.hours[day.num_days_from_sunday() as usize] = ranges;
    }

    pub fn add_hours(&mut self, day: Weekday, range: TimeRange) {
        self.hours[day.num_days_from_sunday() as usize].push(range);
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        !self.hours(day).is_empty()
    }

    /// An exception with no ranges makes the date non-working.
    pub fn add_exception(&mut self, date: NaiveDate, ranges: Vec<TimeRange>) {
        self.exceptions.insert(date, ranges);
    }

    pub fn exception(&self, date: NaiveDate) -> Option<&[TimeRange]> {
        self.exceptions.get(&date).map(|v| v.as_slice())
    }

    pub fn exceptions(&self) -> impl Iterator<Item = (NaiveDate, &[TimeRange])> {
        self.exceptions.iter().map(|(d, r)| (*d, r.as_slice()))
    }

    pub fn working_day_count(&self) -> u32 {
        self.hours.iter().filter(|r| !r.is_empty()).count() as u32
    }

    /// Sum of working minutes over the seven days of the week.
    pub fn week_minutes(&self) -> u32 {
        self.hours
            .iter()
            .flat_map(|ranges| ranges.iter().map(TimeRange::minutes))
            .sum()
    }

    /// Give a calendar without any working day the default Monday to Friday
    /// pattern. Returns whether the calendar was changed.
    pub fn ensure_working_time(&mut self) -> bool {
        if self.working_day_count() > 0 {
            return false;
        }
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            self.set_hours(day, default_working_ranges());
        }
        true
    }
}

fn minutes_between(ranges: &[TimeRange], from: u32, to: u32) -> u32 {
    ranges.iter().map(|r| r.overlap(from, to)).sum()
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// All calendars of a schedule, addressed by [`CalendarId`].
#[derive(Debug, Default, Clone)]
pub struct Calendars {
    list: Vec<Calendar>,
    by_unique_id: HashMap<i32, CalendarId>,
    default: Option<CalendarId>,
}

impl Calendars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, calendar: Calendar) -> CalendarId {
        let id = CalendarId(self.list.len());
        if let Some(uid) = calendar.unique_id {
            self.by_unique_id.insert(uid, id);
        }
        self.list.push(calendar);
        id
    }

    pub fn get(&self, id: CalendarId) -> &Calendar {
        &self.list[id.0]
    }

    pub fn get_mut(&mut self, id: CalendarId) -> &mut Calendar {
        &mut self.list[id.0]
    }

    pub fn by_unique_id(&self, unique_id: i32) -> Option<CalendarId> {
        self.by_unique_id.get(&unique_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CalendarId, &Calendar)> {
        self.list.iter().enumerate().map(|(i, c)| (CalendarId(i), c))
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn default_calendar(&self) -> Option<CalendarId> {
        self.default
    }

    pub fn set_default(&mut self, id: CalendarId) {
        self.default = Some(id);
    }

    pub fn next_unique_id(&self) -> i32 {
        self.list
            .iter()
            .filter_map(|c| c.unique_id)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Add a standard calendar with a fresh unique id and make it the default.
    pub fn add_default_calendar(&mut self) -> CalendarId {
        let mut calendar = Calendar::standard("Standard");
        calendar.unique_id = Some(self.next_unique_id());
        let id = self.add(calendar);
        self.default = Some(id);
        id
    }

    /// The calendar followed by its ancestors. Stops on a cycle.
    fn lineage(&self, id: CalendarId) -> impl Iterator<Item = &Calendar> {
        let mut current = Some(id);
        let mut remaining = self.list.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let calendar = self.get(current?);
            current = calendar.parent;
            Some(calendar)
        })
    }

    /// Working ranges in effect on a date. Exceptions are looked up through
    /// the parent chain before the calendar's own weekly hours apply.
    pub fn ranges(&self, id: CalendarId, date: NaiveDate) -> &[TimeRange] {
        self.lineage(id)
            .find_map(|c| c.exception(date))
            .unwrap_or_else(|| self.get(id).hours(date.weekday()))
    }

    pub fn is_working_date(&self, id: CalendarId, date: NaiveDate) -> bool {
        !self.ranges(id, date).is_empty()
    }

    /// Working minutes between two instants. Negative when `end` precedes
    /// `start`.
    pub fn work_minutes(&self, id: CalendarId, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        if start > end {
            return -self.work_minutes(id, end, start);
        }

        let (start_date, end_date) = (start.date(), end.date());
        let from = minute_of_day(start.time());
        let to = minute_of_day(end.time());

        if start_date == end_date {
            return i64::from(minutes_between(self.ranges(id, start_date), from, to));
        }

        let mut total = i64::from(minutes_between(
            self.ranges(id, start_date),
            from,
            MINUTES_PER_DAY,
        ));
        let mut date = start_date + Span::days(1);
        while date < end_date {
            total += i64::from(minutes_between(self.ranges(id, date), 0, MINUTES_PER_DAY));
            date += Span::days(1);
        }
        total + i64::from(minutes_between(self.ranges(id, end_date), 0, to))
    }

    /// Working time between two optional instants, in hours.
    pub fn work(
        &self,
        id: CalendarId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Option<Duration> {
        let minutes = self.work_minutes(id, start?, end?);
        Some(Duration::hours(minutes as f64 / 60.0))
    }

    /// A standalone copy of a calendar: no parent, with every inherited
    /// exception copied in.
    pub fn flatten(&self, id: CalendarId) -> Calendar {
        let mut flat = self.get(id).clone();
        for ancestor in self.lineage(id).skip(1) {
            for (date, ranges) in ancestor.exceptions() {
                flat.exceptions.entry(date).or_insert_with(|| ranges.to_vec());
            }
        }
        flat.parent = None;
        flat
    }

    /// Flatten every derived global calendar in place. Returns how many
    /// calendars changed.
    pub fn normalize_global(&mut self) -> usize {
        let derived: Vec<CalendarId> = self
            .iter()
            .filter(|(_, c)| c.calendar_type == CalendarType::Global && c.parent.is_some())
            .map(|(id, _)| id)
            .collect();
        for &id in &derived {
            let flat = self.flatten(id);
            self.list[id.0] = flat;
        }
        derived.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn standard() -> (Calendars, CalendarId) {
        let mut calendars = Calendars::new();
        let id = calendars.add(Calendar::standard("Standard"));
        (calendars, id)
    }

    #[test]
    fn test_time_range_minutes() {
        assert_eq!(TimeRange::hm(8, 0, 16, 0).minutes(), 480);
        assert_eq!(TimeRange::hm(22, 0, 0, 0).minutes(), 120);
        assert_eq!(TimeRange::hm(0, 0, 0, 0).minutes(), 1440);
    }

    #[test]
    fn test_ensure_working_time() {
        let mut calendar = Calendar::new("Empty");
        assert!(calendar.ensure_working_time());
        assert_eq!(calendar.working_day_count(), 5);
        assert_eq!(calendar.week_minutes(), 2400);
        assert!(!calendar.is_working_day(Weekday::Sat));
        assert!(!calendar.ensure_working_time());
    }

    #[test]
    fn test_work_same_day() {
        let (calendars, id) = standard();
        // 2024-03-04 is a Monday
        let minutes = calendars.work_minutes(id, at("2024-03-04", "10:00"), at("2024-03-04", "15:00"));
        assert_eq!(minutes, 240);
    }

    #[test]
    fn test_work_across_weekend() {
        let (calendars, id) = standard();
        let work = calendars
            .work(id, Some(at("2024-03-08", "08:00")), Some(at("2024-03-11", "17:00")))
            .unwrap();
        assert_eq!(work, Duration::hours(16.0));
    }

    #[test]
    fn test_work_reversed_is_negative() {
        let (calendars, id) = standard();
        let minutes = calendars.work_minutes(id, at("2024-03-05", "08:00"), at("2024-03-04", "08:00"));
        assert_eq!(minutes, -480);
    }

    #[test]
    fn test_work_with_missing_bound() {
        let (calendars, id) = standard();
        assert_eq!(calendars.work(id, None, Some(at("2024-03-04", "08:00"))), None);
    }

    #[test]
    fn test_exception_inherited_from_parent() {
        let (mut calendars, base) = standard();
        calendars.get_mut(base).add_exception(day("2024-03-05"), vec![]);
        let mut child = Calendar::standard("Crew");
        child.parent = Some(base);
        let child = calendars.add(child);

        assert!(!calendars.is_working_date(child, day("2024-03-05")));
        let minutes = calendars.work_minutes(child, at("2024-03-04", "08:00"), at("2024-03-06", "17:00"));
        assert_eq!(minutes, 960);
    }

    #[test]
    fn test_normalize_global_flattens() {
        let (mut calendars, base) = standard();
        calendars.get_mut(base).add_exception(day("2024-12-25"), vec![]);
        let mut derived = Calendar::standard("Derived");
        derived.parent = Some(base);
        let derived = calendars.add(derived);
        let mut resource = Calendar::standard("Resource");
        resource.calendar_type = CalendarType::Resource;
        resource.parent = Some(base);
        let resource = calendars.add(resource);

        assert_eq!(calendars.normalize_global(), 1);
        let flat = calendars.get(derived);
        assert_eq!(flat.parent, None);
        assert_eq!(flat.exception(day("2024-12-25")), Some(&[][..]));
        assert_eq!(calendars.get(resource).parent, Some(base));
    }

    #[test]
    fn test_default_calendar_gets_fresh_unique_id() {
        let mut calendars = Calendars::new();
        let mut c = Calendar::new("Other");
        c.unique_id = Some(7);
        calendars.add(c);
        let id = calendars.add_default_calendar();
        assert_eq!(calendars.default_calendar(), Some(id));
        assert_eq!(calendars.get(id).unique_id, Some(8));
        assert_eq!(calendars.by_unique_id(8), Some(id));
    }
}
