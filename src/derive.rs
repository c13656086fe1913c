//! Field derivation chains.
//!
//! A derived field takes the value of the first candidate field that is set
//! on the same entity. Candidates are always tried strictly in order.

use chrono::NaiveDateTime;

use crate::codes::PercentCompleteType;
use crate::duration::Duration;
use crate::model::{Assignment, Task};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Date(NaiveDateTime),
    Duration(Duration),
    Number(f64),
}

impl FieldValue {
    pub fn as_date(self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_duration(self) -> Option<Duration> {
        match self {
            FieldValue::Duration(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_number(self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// An entity whose fields can be read and written by name.
pub trait FieldContainer {
    type Field: Copy;

    fn get(&self, field: Self::Field) -> Option<FieldValue>;

    /// Writing a value of the wrong kind for the field is a no-op.
    fn set(&mut self, field: Self::Field, value: FieldValue);
}

/// Set `target` from the first candidate with a value. Returns whether
/// anything was written; the target is untouched when every candidate is
/// empty.
pub fn populate_field<C: FieldContainer>(
    container: &mut C,
    target: C::Field,
    candidates: &[C::Field],
) -> bool {
    match candidates.iter().find_map(|&c| container.get(c)) {
        Some(value) => {
            container.set(target, value);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Start,
    Finish,
    ActualStart,
    ActualFinish,
    EarlyStart,
    EarlyFinish,
    RemainingEarlyStart,
    RemainingEarlyFinish,
    PlannedStart,
    PlannedFinish,
    BaselineStart,
    BaselineFinish,
    PlannedDuration,
    BaselineDuration,
    PlannedWork,
    BaselineWork,
    PlannedCost,
    BaselineCost,
    PercentComplete,
    DurationPercentComplete,
    UnitsPercentComplete,
    PhysicalPercentComplete,
}

pub const TASK_START_CHAIN: &[TaskField] = &[
    TaskField::ActualStart,
    TaskField::RemainingEarlyStart,
    TaskField::PlannedStart,
    TaskField::EarlyStart,
];

pub const TASK_FINISH_CHAIN: &[TaskField] = &[
    TaskField::ActualFinish,
    TaskField::RemainingEarlyFinish,
    TaskField::PlannedFinish,
    TaskField::EarlyFinish,
];

/// Start of the not-yet-done part of a summary.
pub const REMAINING_START_CHAIN: &[TaskField] = &[
    TaskField::RemainingEarlyStart,
    TaskField::EarlyStart,
    TaskField::PlannedStart,
    TaskField::BaselineStart,
];

pub const REMAINING_FINISH_CHAIN: &[TaskField] = &[
    TaskField::RemainingEarlyFinish,
    TaskField::EarlyFinish,
    TaskField::PlannedFinish,
    TaskField::BaselineFinish,
];

/// Planned values copied onto baseline fields when no baseline project
/// exists.
pub const BASELINE_FIELDS: &[(TaskField, TaskField)] = &[
    (TaskField::BaselineStart, TaskField::PlannedStart),
    (TaskField::BaselineFinish, TaskField::PlannedFinish),
    (TaskField::BaselineDuration, TaskField::PlannedDuration),
    (TaskField::BaselineWork, TaskField::PlannedWork),
    (TaskField::BaselineCost, TaskField::PlannedCost),
];

impl FieldContainer for Task {
    type Field = TaskField;

    fn get(&self, field: TaskField) -> Option<FieldValue> {
        use TaskField::*;
        match field {
            Start => self.start.map(FieldValue::Date),
            Finish => self.finish.map(FieldValue::Date),
            ActualStart => self.actual_start.map(FieldValue::Date),
            ActualFinish => self.actual_finish.map(FieldValue::Date),
            EarlyStart => self.early_start.map(FieldValue::Date),
            EarlyFinish => self.early_finish.map(FieldValue::Date),
            RemainingEarlyStart => self.remaining_early_start.map(FieldValue::Date),
            RemainingEarlyFinish => self.remaining_early_finish.map(FieldValue::Date),
            PlannedStart => self.planned_start.map(FieldValue::Date),
            PlannedFinish => self.planned_finish.map(FieldValue::Date),
            BaselineStart => self.baseline_start.map(FieldValue::Date),
            BaselineFinish => self.baseline_finish.map(FieldValue::Date),
            PlannedDuration => self.planned_duration.map(FieldValue::Duration),
            BaselineDuration => self.baseline_duration.map(FieldValue::Duration),
            PlannedWork => self.planned_work.map(FieldValue::Duration),
            BaselineWork => self.baseline_work.map(FieldValue::Duration),
            PlannedCost => self.planned_cost.map(FieldValue::Number),
            BaselineCost => self.baseline_cost.map(FieldValue::Number),
            PercentComplete => self.percent_complete.map(FieldValue::Number),
            DurationPercentComplete => self.duration_percent_complete.map(FieldValue::Number),
            UnitsPercentComplete => self.units_percent_complete.map(FieldValue::Number),
            PhysicalPercentComplete => self.physical_percent_complete.map(FieldValue::Number),
        }
    }

    fn set(&mut self, field: TaskField, value: FieldValue) {
        use TaskField::*;
        match field {
            Start => self.start = value.as_date(),
            Finish => self.finish = value.as_date(),
            ActualStart => self.actual_start = value.as_date(),
            ActualFinish => self.actual_finish = value.as_date(),
            EarlyStart => self.early_start = value.as_date(),
            EarlyFinish => self.early_finish = value.as_date(),
            RemainingEarlyStart => self.remaining_early_start = value.as_date(),
            RemainingEarlyFinish => self.remaining_early_finish = value.as_date(),
            PlannedStart => self.planned_start = value.as_date(),
            PlannedFinish => self.planned_finish = value.as_date(),
            BaselineStart => self.baseline_start = value.as_date(),
            BaselineFinish => self.baseline_finish = value.as_date(),
            PlannedDuration => self.planned_duration = value.as_duration(),
            BaselineDuration => self.baseline_duration = value.as_duration(),
            PlannedWork => self.planned_work = value.as_duration(),
            BaselineWork => self.baseline_work = value.as_duration(),
            PlannedCost => self.planned_cost = value.as_number(),
            BaselineCost => self.baseline_cost = value.as_number(),
            PercentComplete => self.percent_complete = value.as_number(),
            DurationPercentComplete => self.duration_percent_complete = value.as_number(),
            UnitsPercentComplete => self.units_percent_complete = value.as_number(),
            PhysicalPercentComplete => self.physical_percent_complete = value.as_number(),
        }
    }
}

fn percent_source(kind: PercentCompleteType) -> TaskField {
    match kind {
        PercentCompleteType::Duration => TaskField::DurationPercentComplete,
        PercentCompleteType::Units => TaskField::UnitsPercentComplete,
        PercentCompleteType::Physical => TaskField::PhysicalPercentComplete,
    }
}

/// Report the percent complete chosen by the task's percent complete type,
/// duration when unset.
pub fn populate_percent_complete(task: &mut Task) -> bool {
    let source = percent_source(task.percent_complete_type.unwrap_or_default());
    populate_field(task, TaskField::PercentComplete, &[source])
}

pub fn populate_task_dates(task: &mut Task) {
    populate_field(task, TaskField::Start, TASK_START_CHAIN);
    populate_field(task, TaskField::Finish, TASK_FINISH_CHAIN);
}

/// Copy planned values onto the baseline fields.
pub fn populate_baseline(task: &mut Task) {
    for &(target, source) in BASELINE_FIELDS {
        populate_field(task, target, &[source]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentField {
    Start,
    Finish,
    ActualStart,
    ActualFinish,
    RemainingEarlyStart,
    RemainingEarlyFinish,
    PlannedStart,
    PlannedFinish,
}

pub const ASSIGNMENT_START_CHAIN: &[AssignmentField] = &[
    AssignmentField::ActualStart,
    AssignmentField::RemainingEarlyStart,
    AssignmentField::PlannedStart,
];

pub const ASSIGNMENT_FINISH_CHAIN: &[AssignmentField] = &[
    AssignmentField::ActualFinish,
    AssignmentField::RemainingEarlyFinish,
    AssignmentField::PlannedFinish,
];

impl FieldContainer for Assignment {
    type Field = AssignmentField;

    fn get(&self, field: AssignmentField) -> Option<FieldValue> {
        use AssignmentField::*;
        let date = match field {
            Start => self.start,
            Finish => self.finish,
            ActualStart => self.actual_start,
            ActualFinish => self.actual_finish,
            RemainingEarlyStart => self.remaining_early_start,
            RemainingEarlyFinish => self.remaining_early_finish,
            PlannedStart => self.planned_start,
            PlannedFinish => self.planned_finish,
        };
        date.map(FieldValue::Date)
    }

    fn set(&mut self, field: AssignmentField, value: FieldValue) {
        use AssignmentField::*;
        let date = value.as_date();
        match field {
            Start => self.start = date,
            Finish => self.finish = date,
            ActualStart => self.actual_start = date,
            ActualFinish => self.actual_finish = date,
            RemainingEarlyStart => self.remaining_early_start = date,
            RemainingEarlyFinish => self.remaining_early_finish = date,
            PlannedStart => self.planned_start = date,
            PlannedFinish => self.planned_finish = date,
        }
    }
}

pub fn populate_assignment_dates(assignment: &mut Assignment) {
    populate_field(assignment, AssignmentField::Start, ASSIGNMENT_START_CHAIN);
    populate_field(assignment, AssignmentField::Finish, ASSIGNMENT_FINISH_CHAIN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::parse_timestamp;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut task = Task {
            actual_start: Some(ts("2024-01-02 08:00")),
            planned_start: Some(ts("2024-01-01 08:00")),
            ..Default::default()
        };
        populate_task_dates(&mut task);
        assert_eq!(task.start, Some(ts("2024-01-02 08:00")));
    }

    #[test]
    fn test_falls_through_to_later_candidates() {
        let mut task = Task {
            planned_finish: Some(ts("2024-01-05 17:00")),
            early_finish: Some(ts("2024-01-04 17:00")),
            ..Default::default()
        };
        populate_task_dates(&mut task);
        assert_eq!(task.finish, Some(ts("2024-01-05 17:00")));
    }

    #[test]
    fn test_empty_chain_leaves_target() {
        let mut task = Task {
            start: Some(ts("2024-03-01 08:00")),
            ..Default::default()
        };
        assert!(!populate_field(&mut task, TaskField::Start, TASK_START_CHAIN));
        assert_eq!(task.start, Some(ts("2024-03-01 08:00")));
    }

    #[test]
    fn test_idempotent() {
        let mut task = Task {
            remaining_early_start: Some(ts("2024-01-03 08:00")),
            ..Default::default()
        };
        populate_task_dates(&mut task);
        let once = task.clone();
        populate_task_dates(&mut task);
        assert_eq!(task, once);
    }

    #[test]
    fn test_percent_complete_by_type() {
        let mut task = Task {
            duration_percent_complete: Some(25.0),
            physical_percent_complete: Some(60.0),
            ..Default::default()
        };
        populate_percent_complete(&mut task);
        assert_eq!(task.percent_complete, Some(25.0));

        task.percent_complete_type = Some(PercentCompleteType::Physical);
        populate_percent_complete(&mut task);
        assert_eq!(task.percent_complete, Some(60.0));
    }

    #[test]
    fn test_assignment_finish_prefers_actual() {
        let mut a = Assignment {
            actual_finish: Some(ts("2024-02-01 17:00")),
            planned_finish: Some(ts("2024-02-03 17:00")),
            ..Default::default()
        };
        populate_assignment_dates(&mut a);
        assert_eq!(a.finish, Some(ts("2024-02-01 17:00")));
        assert_eq!(a.start, None);
    }

    #[test]
    fn test_baseline_copies_planned() {
        let mut task = Task {
            planned_cost: Some(100.0),
            planned_duration: Some(Duration::hours(16.0)),
            ..Default::default()
        };
        populate_baseline(&mut task);
        assert_eq!(task.baseline_cost, Some(100.0));
        assert_eq!(task.baseline_duration, Some(Duration::hours(16.0)));
        assert_eq!(task.baseline_start, None);
    }
}
