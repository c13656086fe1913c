//! Hierarchical rollup of summary tasks from their children.
//!
//! Four bottom-up passes run in a fixed order (calendars, dates, work,
//! costs); later passes read what earlier ones wrote. A summary with no
//! children is left alone.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::calendar::CalendarId;
use crate::codes::{CriticalActivityType, PercentCompleteType};
use crate::derive::{
    FieldContainer, FieldValue, REMAINING_FINISH_CHAIN, REMAINING_START_CHAIN, TaskField,
    populate_baseline,
};
use crate::duration::Duration;
use crate::model::{Schedule, Task, TaskId};

#[derive(Debug, Clone, Default)]
pub struct Rollup {
    populate_baseline: bool,
}

impl Rollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy planned values onto the baseline of every summary after rolling up.
    pub fn populate_baseline(mut self, populate: bool) -> Self {
        self.populate_baseline = populate;
        self
    }

    pub fn run(&self, schedule: &mut Schedule) {
        let order = post_order(schedule);
        rollup_calendars(schedule, &order);
        rollup_dates(schedule, &order);
        rollup_work(schedule, &order);
        rollup_costs(schedule, &order);

        if self.populate_baseline {
            for &id in &order {
                let task = schedule.task_mut(id);
                if task.summary {
                    populate_baseline(task);
                }
            }
        }
        debug!("Rolled up {} tasks", order.len());
    }
}

/// Every task after all of its descendants.
fn post_order(schedule: &Schedule) -> Vec<TaskId> {
    let mut order = schedule.pre_order();
    order.reverse();
    order
}

fn rollup_calendars(schedule: &mut Schedule, order: &[TaskId]) {
    let default = schedule.calendars.default_calendar();
    for &id in order {
        let children = &schedule.task(id).children;
        if children.is_empty() {
            continue;
        }
        let first = schedule.task(children[0]).calendar;
        let common = children
            .iter()
            .all(|&c| schedule.task(c).calendar == first)
            .then_some(first)
            .flatten()
            .filter(|&c| Some(c) != default);
        schedule.task_mut(id).calendar = common;
    }
}

fn min_date(acc: Option<NaiveDateTime>, v: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_date(acc: Option<NaiveDateTime>, v: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

const START_FIELDS: &[TaskField] = &[
    TaskField::Start,
    TaskField::PlannedStart,
    TaskField::ActualStart,
    TaskField::EarlyStart,
    TaskField::RemainingEarlyStart,
    TaskField::BaselineStart,
];

const FINISH_FIELDS: &[TaskField] = &[
    TaskField::Finish,
    TaskField::PlannedFinish,
    TaskField::EarlyFinish,
    TaskField::RemainingEarlyFinish,
    TaskField::BaselineFinish,
];

/// Late dates are not reachable through [`FieldContainer`].
#[derive(Default)]
struct LateDates {
    late_start: Option<NaiveDateTime>,
    late_finish: Option<NaiveDateTime>,
    remaining_late_start: Option<NaiveDateTime>,
    remaining_late_finish: Option<NaiveDateTime>,
}

fn rollup_dates(schedule: &mut Schedule, order: &[TaskId]) {
    let longest_path =
        schedule.properties.critical_activity_type == CriticalActivityType::LongestPath;

    for &id in order {
        let children = schedule.task(id).children.clone();
        if children.is_empty() {
            continue;
        }

        let mut starts = vec![None; START_FIELDS.len()];
        let mut finishes = vec![None; FINISH_FIELDS.len()];
        let mut late = LateDates::default();
        let mut actual_finish = None;
        let mut finished = 0;
        let mut critical = false;

        for &c in &children {
            let child = schedule.task(c);
            for (acc, &field) in starts.iter_mut().zip(START_FIELDS) {
                *acc = min_date(*acc, child.get(field).and_then(|v| v.as_date()));
            }
            for (acc, &field) in finishes.iter_mut().zip(FINISH_FIELDS) {
                *acc = max_date(*acc, child.get(field).and_then(|v| v.as_date()));
            }
            late.late_start = min_date(late.late_start, child.late_start);
            late.late_finish = max_date(late.late_finish, child.late_finish);
            late.remaining_late_start = min_date(late.remaining_late_start, child.remaining_late_start);
            late.remaining_late_finish =
                max_date(late.remaining_late_finish, child.remaining_late_finish);
            actual_finish = max_date(actual_finish, child.actual_finish);
            if child.actual_finish.is_some() {
                finished += 1;
            }
            critical |= child.critical;
        }

        let calendar = schedule.effective_calendar(id);
        let minutes = schedule.minutes_per_period(calendar);
        let work = |start, finish| calendar.and_then(|c| schedule.calendars.work(c, start, finish));

        let mut summary = schedule.task(id).clone();
        for (&field, value) in START_FIELDS.iter().zip(starts) {
            set_date(&mut summary, field, value);
        }
        for (&field, value) in FINISH_FIELDS.iter().zip(finishes) {
            set_date(&mut summary, field, value);
        }
        summary.late_start = late.late_start;
        summary.late_finish = late.late_finish;
        summary.remaining_late_start = late.remaining_late_start;
        summary.remaining_late_finish = late.remaining_late_finish;
        summary.actual_finish = if finished == children.len() {
            actual_finish
        } else {
            None
        };

        let planned = match (summary.planned_start, summary.planned_finish) {
            (Some(_), Some(_)) => work(summary.planned_start, summary.planned_finish),
            _ => None,
        };
        if planned.is_some() {
            summary.planned_duration = planned;
        }

        let (actual, remaining) = if summary.actual_finish.is_some() {
            (
                work(summary.actual_start, summary.actual_finish),
                Some(Duration::hours(0.0)),
            )
        } else {
            let start = first_date(&summary, REMAINING_START_CHAIN);
            let finish = first_date(&summary, REMAINING_FINISH_CHAIN);
            match start {
                Some(_) => (
                    summary.actual_start.and_then(|a| work(Some(a), start)),
                    finish.and_then(|f| work(start, Some(f))),
                ),
                None => (None, None),
            }
        };
        let actual = actual.filter(|d| !d.is_negative());
        let remaining = remaining.filter(|d| !d.is_negative());

        summary.actual_duration = actual;
        summary.remaining_duration = remaining;
        summary.duration = Duration::add(actual, remaining, &minutes);

        if let (Some(planned), Some(remaining)) = (planned, remaining) {
            if !planned.is_zero() {
                let pct = ((planned.value - remaining.value) / planned.value * 100.0).clamp(0.0, 100.0);
                summary.duration_percent_complete = Some(pct);
                summary.percent_complete = Some(pct);
                summary.percent_complete_type = Some(PercentCompleteType::Duration);
            }
        }

        summary.critical = critical && !longest_path;
        *schedule.task_mut(id) = summary;
    }
}

fn set_date(task: &mut Task, field: TaskField, value: Option<NaiveDateTime>) {
    match value {
        Some(d) => task.set(field, FieldValue::Date(d)),
        None => clear_date(task, field),
    }
}

fn clear_date(task: &mut Task, field: TaskField) {
    match field {
        TaskField::Start => task.start = None,
        TaskField::Finish => task.finish = None,
        TaskField::ActualStart => task.actual_start = None,
        TaskField::ActualFinish => task.actual_finish = None,
        TaskField::EarlyStart => task.early_start = None,
        TaskField::EarlyFinish => task.early_finish = None,
        TaskField::RemainingEarlyStart => task.remaining_early_start = None,
        TaskField::RemainingEarlyFinish => task.remaining_early_finish = None,
        TaskField::PlannedStart => task.planned_start = None,
        TaskField::PlannedFinish => task.planned_finish = None,
        TaskField::BaselineStart => task.baseline_start = None,
        TaskField::BaselineFinish => task.baseline_finish = None,
        _ => {}
    }
}

fn first_date(task: &Task, chain: &[TaskField]) -> Option<NaiveDateTime> {
    chain.iter().find_map(|&f| task.get(f).and_then(|v| v.as_date()))
}

fn rollup_work(schedule: &mut Schedule, order: &[TaskId]) {
    for &id in order {
        let children = schedule.task(id).children.clone();
        if children.is_empty() {
            continue;
        }
        let calendar: Option<CalendarId> = schedule.effective_calendar(id);
        let minutes = schedule.minutes_per_period(calendar);

        let (mut actual, mut planned, mut remaining, mut total) = (None, None, None, None);
        for &c in &children {
            let child = schedule.task(c);
            actual = Duration::add(actual, child.actual_work, &minutes);
            planned = Duration::add(planned, child.planned_work, &minutes);
            remaining = Duration::add(remaining, child.remaining_work, &minutes);
            total = Duration::add(total, child.work, &minutes);
        }

        let task = schedule.task_mut(id);
        task.actual_work = actual;
        task.planned_work = planned;
        task.remaining_work = remaining;
        task.work = total;
    }
}

fn rollup_costs(schedule: &mut Schedule, order: &[TaskId]) {
    for &id in order {
        let children = schedule.task(id).children.clone();
        if children.is_empty() {
            continue;
        }
        let (mut planned, mut actual, mut remaining, mut total, mut fixed) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &c in &children {
            let child = schedule.task(c);
            planned += child.planned_cost.unwrap_or(0.0);
            actual += child.actual_cost.unwrap_or(0.0);
            remaining += child.remaining_cost.unwrap_or(0.0);
            total += child.cost.unwrap_or(0.0);
            fixed += child.fixed_cost.unwrap_or(0.0);
        }

        let task = schedule.task_mut(id);
        task.planned_cost = Some(planned);
        task.actual_cost = Some(actual);
        task.remaining_cost = Some(remaining);
        task.cost = Some(total);
        task.fixed_cost = Some(fixed);
    }
}
