//! In-memory schedule model.

use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::calendar::{CalendarId, Calendars};
use crate::codes::{
    ActivityStatus, ActivityType, CalendarType, ConstraintType, CriticalActivityType,
    CurrencySymbolPosition, DurationType, PercentCompleteType, Priority, RelationType,
    ResourceType,
};
use crate::duration::{Duration, MinutesPerPeriod};
use crate::error::FieldError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub usize);

/// A WBS node or a leaf activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub unique_id: Option<i32>,
    /// Pre-order position, from 1.
    pub id: Option<i32>,
    pub outline_level: Option<u32>,
    pub activity_id: Option<String>,
    pub name: Option<String>,
    pub wbs: Option<String>,
    pub sequence_number: Option<i32>,
    pub summary: bool,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
    pub calendar: Option<CalendarId>,

    pub activity_type: Option<ActivityType>,
    pub status: Option<ActivityStatus>,
    pub duration_type: Option<DurationType>,
    pub priority: Option<Priority>,
    pub milestone: bool,
    pub constraint_type: Option<ConstraintType>,
    pub constraint_date: Option<NaiveDateTime>,
    pub secondary_constraint_type: Option<ConstraintType>,
    pub secondary_constraint_date: Option<NaiveDateTime>,
    pub primary_resource_unique_id: Option<i32>,
    pub created: Option<NaiveDateTime>,
    pub notes: Option<String>,

    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_finish: Option<NaiveDateTime>,
    pub early_start: Option<NaiveDateTime>,
    pub early_finish: Option<NaiveDateTime>,
    pub late_start: Option<NaiveDateTime>,
    pub late_finish: Option<NaiveDateTime>,
    pub remaining_early_start: Option<NaiveDateTime>,
    pub remaining_early_finish: Option<NaiveDateTime>,
    pub remaining_late_start: Option<NaiveDateTime>,
    pub remaining_late_finish: Option<NaiveDateTime>,
    pub planned_start: Option<NaiveDateTime>,
    pub planned_finish: Option<NaiveDateTime>,
    pub baseline_start: Option<NaiveDateTime>,
    pub baseline_finish: Option<NaiveDateTime>,
    pub expected_finish: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub suspend_date: Option<NaiveDateTime>,
    pub resume_date: Option<NaiveDateTime>,

    pub duration: Option<Duration>,
    pub planned_duration: Option<Duration>,
    pub actual_duration: Option<Duration>,
    pub remaining_duration: Option<Duration>,
    pub baseline_duration: Option<Duration>,
    pub total_float: Option<Duration>,
    pub free_float: Option<Duration>,

    pub work: Option<Duration>,
    pub planned_work: Option<Duration>,
    pub actual_work: Option<Duration>,
    pub remaining_work: Option<Duration>,
    pub baseline_work: Option<Duration>,
    pub actual_work_labor: Option<Duration>,
    pub actual_work_nonlabor: Option<Duration>,
    pub planned_work_labor: Option<Duration>,
    pub planned_work_nonlabor: Option<Duration>,
    pub remaining_work_labor: Option<Duration>,
    pub remaining_work_nonlabor: Option<Duration>,

    pub cost: Option<f64>,
    pub planned_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub remaining_cost: Option<f64>,
    pub fixed_cost: Option<f64>,
    pub baseline_cost: Option<f64>,

    pub percent_complete_type: Option<PercentCompleteType>,
    /// The percent complete selected by `percent_complete_type`.
    pub percent_complete: Option<f64>,
    pub duration_percent_complete: Option<f64>,
    pub units_percent_complete: Option<f64>,
    pub physical_percent_complete: Option<f64>,

    pub critical: bool,
    pub longest_path: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub unique_id: Option<i32>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub initials: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub parent_unique_id: Option<i32>,
    pub calendar: Option<CalendarId>,
    /// Percent, so one unit per hour is 100.
    pub default_units: f64,
    pub role: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub unique_id: Option<i32>,
    pub task: TaskId,
    pub resource: ResourceId,
    pub role: Option<ResourceId>,

    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_finish: Option<NaiveDateTime>,
    pub remaining_early_start: Option<NaiveDateTime>,
    pub remaining_early_finish: Option<NaiveDateTime>,
    pub planned_start: Option<NaiveDateTime>,
    pub planned_finish: Option<NaiveDateTime>,

    pub work: Option<Duration>,
    pub planned_work: Option<Duration>,
    pub actual_work: Option<Duration>,
    pub actual_overtime_work: Option<Duration>,
    pub remaining_work: Option<Duration>,

    pub cost: Option<f64>,
    pub planned_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub actual_overtime_cost: Option<f64>,
    pub remaining_cost: Option<f64>,
    pub override_rate: Option<f64>,

    pub units: f64,
    pub remaining_units: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub unique_id: i32,
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub relation_type: RelationType,
    pub lag: Duration,
    pub notes: Option<String>,
}

/// A relation with one end outside this read.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRelation {
    pub unique_id: i32,
    /// The end that was found.
    pub task: TaskId,
    /// Unique id of the end that was not.
    pub external_task_unique_id: i32,
    /// Whether the external task is the predecessor.
    pub external_is_predecessor: bool,
    pub relation_type: RelationType,
    pub lag: Duration,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseItem {
    pub unique_id: Option<i32>,
    pub task: TaskId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub document_number: Option<String>,
    pub vendor: Option<String>,
    pub unit_of_measure: Option<String>,
    pub auto_compute_actuals: bool,
    pub actual_cost: Option<f64>,
    pub remaining_cost: Option<f64>,
    pub planned_cost: Option<f64>,
    pub at_completion_cost: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub planned_units: Option<f64>,
    pub actual_units: Option<f64>,
    pub remaining_units: Option<f64>,
    pub at_completion_units: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectProperties {
    pub unique_id: Option<i32>,
    pub short_name: Option<String>,
    pub name: Option<String>,
    pub status_date: Option<NaiveDateTime>,
    pub planned_start: Option<NaiveDateTime>,
    pub scheduled_finish: Option<NaiveDateTime>,
    pub must_finish_by: Option<NaiveDateTime>,
    pub creation_date: Option<NaiveDateTime>,
    pub critical_activity_type: CriticalActivityType,
    pub critical_slack_limit: Duration,
    pub wbs_separator: String,
    pub baseline_project_id: Option<i32>,
    pub activity_default_calendar_id: Option<i32>,
    pub fiscal_year_start_month: Option<i32>,

    pub currency_symbol: Option<String>,
    pub currency_digits: Option<i32>,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub symbol_position: CurrencySymbolPosition,
}

impl Default for ProjectProperties {
    fn default() -> Self {
        Self {
            unique_id: None,
            short_name: None,
            name: None,
            status_date: None,
            planned_start: None,
            scheduled_finish: None,
            must_finish_by: None,
            creation_date: None,
            critical_activity_type: CriticalActivityType::default(),
            critical_slack_limit: Duration::hours(0.0),
            wbs_separator: ".".to_string(),
            baseline_project_id: None,
            activity_default_calendar_id: None,
            fiscal_year_start_month: None,
            currency_symbol: None,
            currency_digits: None,
            decimal_separator: '.',
            thousands_separator: ',',
            symbol_position: CurrencySymbolPosition::default(),
        }
    }
}

/// How progressed activities are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressedActivities {
    #[default]
    RetainedLogic,
    ProgressOverride,
    ActualDates,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOptions {
    pub level_all_resources: bool,
    pub level_within_float: bool,
    pub make_open_ended_activities_critical: bool,
    pub use_expected_finish_dates: bool,
    pub ignore_external_relationships: bool,
    pub progressed_activities: ProgressedActivities,
    pub compute_start_to_start_lag_from_early_start: bool,
    pub total_float_type: Option<String>,
    pub relationship_lag_calendar: Option<String>,
    pub calculate_multiple_float_paths: bool,
    pub max_float_paths: Option<i32>,
}

/// Result of a read: the task forest and everything hanging off it.
#[derive(Debug, Default)]
pub struct Schedule {
    pub properties: ProjectProperties,
    pub options: ScheduleOptions,
    pub calendars: Calendars,
    tasks: Vec<Task>,
    roots: Vec<TaskId>,
    task_index: HashMap<i32, TaskId>,
    resources: Vec<Resource>,
    resource_index: HashMap<i32, ResourceId>,
    pub assignments: Vec<Assignment>,
    pub relations: Vec<Relation>,
    pub external_relations: Vec<ExternalRelation>,
    pub expense_items: Vec<ExpenseItem>,
    /// Value-level failures skipped while reading.
    pub ignored_errors: Vec<FieldError>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task under `parent`, or as a root.
    pub fn add_task(&mut self, mut task: Task, parent: Option<TaskId>) -> TaskId {
        let id = TaskId(self.tasks.len());
        task.parent = parent;
        if let Some(uid) = task.unique_id {
            self.task_index.insert(uid, id);
        }
        self.tasks.push(task);
        match parent {
            Some(p) => self.tasks[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks.iter().enumerate().map(|(i, t)| (TaskId(i), t))
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn task_by_unique_id(&self, unique_id: i32) -> Option<TaskId> {
        self.task_index.get(&unique_id).copied()
    }

    /// Change a task's unique id, keeping the lookup index current.
    pub fn set_task_unique_id(&mut self, id: TaskId, unique_id: i32) {
        let task = &mut self.tasks[id.0];
        if let Some(old) = task.unique_id.replace(unique_id) {
            if self.task_index.get(&old) == Some(&id) {
                self.task_index.remove(&old);
            }
        }
        self.task_index.insert(unique_id, id);
    }

    /// Move a task to a new parent (or to the roots).
    pub fn reparent(&mut self, id: TaskId, parent: Option<TaskId>) {
        match self.tasks[id.0].parent {
            Some(old) => self.tasks[old.0].children.retain(|&c| c != id),
            None => self.roots.retain(|&c| c != id),
        }
        self.tasks[id.0].parent = parent;
        match parent {
            Some(p) => self.tasks[p.0].children.push(id),
            None => self.roots.push(id),
        }
    }

    /// Reorder the children of every node, and the roots.
    pub fn sort_children_by<K, F>(&mut self, mut key: F)
    where
        K: Ord,
        F: FnMut(&Task) -> K,
    {
        let tasks = &self.tasks;
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|&id| key(&tasks[id.0]));
        let mut ordered: Vec<Vec<TaskId>> = tasks
            .iter()
            .map(|t| {
                let mut children = t.children.clone();
                children.sort_by_key(|&id| key(&tasks[id.0]));
                children
            })
            .collect();
        for (task, children) in self.tasks.iter_mut().zip(ordered.iter_mut()) {
            task.children = std::mem::take(children);
        }
        self.roots = roots;
    }

    /// Own calendar, else the nearest ancestor's, else the default.
    pub fn effective_calendar(&self, id: TaskId) -> Option<CalendarId> {
        let mut current = Some(id);
        while let Some(t) = current {
            let task = &self.tasks[t.0];
            if task.calendar.is_some() {
                return task.calendar;
            }
            current = task.parent;
        }
        self.calendars.default_calendar()
    }

    pub fn minutes_per_period(&self, calendar: Option<CalendarId>) -> MinutesPerPeriod {
        calendar
            .map(|c| self.calendars.get(c).minutes)
            .unwrap_or_default()
    }

    /// Tasks in pre-order.
    pub fn pre_order(&self) -> Vec<TaskId> {
        let mut out = Vec::with_capacity(self.tasks.len());
        let mut stack: Vec<TaskId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.tasks[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Number tasks from 1 in pre-order and set outline levels from 1.
    pub fn update_structure(&mut self) {
        let order = self.pre_order();
        for (n, id) in order.into_iter().enumerate() {
            let level = match self.tasks[id.0].parent {
                Some(p) => self.tasks[p.0].outline_level.unwrap_or(0) + 1,
                None => 1,
            };
            let task = &mut self.tasks[id.0];
            task.id = Some(n as i32 + 1);
            task.outline_level = Some(level);
        }
    }

    pub fn add_resource(&mut self, resource: Resource) -> ResourceId {
        let id = ResourceId(self.resources.len());
        if let Some(uid) = resource.unique_id {
            self.resource_index.insert(uid, id);
        }
        self.resources.push(resource);
        id
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter().enumerate().map(|(i, r)| (ResourceId(i), r))
    }

    pub fn resource_by_unique_id(&self, unique_id: i32) -> Option<ResourceId> {
        self.resource_index.get(&unique_id).copied()
    }

    pub fn assignments_for(&self, task: TaskId) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(move |a| a.task == task)
    }

    /// Make the model safe to hand to a writer: derived global calendars are
    /// flattened, and a resource whose calendar is already used by another
    /// resource gets its own copy.
    pub fn prepare_for_export(&mut self) {
        let flattened = self.calendars.normalize_global();
        if flattened > 0 {
            debug!("Flattened {} derived global calendars", flattened);
        }

        let mut claimed: HashSet<CalendarId> = HashSet::new();
        for i in 0..self.resources.len() {
            let Some(calendar) = self.resources[i].calendar else {
                continue;
            };
            if claimed.insert(calendar) {
                continue;
            }
            let mut copy = self.calendars.get(calendar).clone();
            copy.unique_id = Some(self.calendars.next_unique_id());
            copy.calendar_type = CalendarType::Resource;
            copy.personal = true;
            if let Some(name) = &self.resources[i].name {
                copy.name = name.clone();
            }
            let copy = self.calendars.add(copy);
            claimed.insert(copy);
            self.resources[i].calendar = Some(copy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;

    #[test]
    fn test_default_assignment_points_at_first_slots() {
        let a = Assignment::default();
        assert_eq!(a.task, TaskId(0));
        assert_eq!(a.resource, ResourceId(0));
        assert_eq!(a.role, None);
    }

    fn named(uid: i32, name: &str) -> Task {
        Task {
            unique_id: Some(uid),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tree_and_index() {
        let mut s = Schedule::new();
        let root = s.add_task(named(1, "Project"), None);
        let a = s.add_task(named(2, "A"), Some(root));
        let b = s.add_task(named(3, "B"), Some(root));
        assert_eq!(s.roots(), &[root]);
        assert_eq!(s.task(root).children, vec![a, b]);
        assert_eq!(s.task_by_unique_id(3), Some(b));

        s.set_task_unique_id(b, 30);
        assert_eq!(s.task_by_unique_id(3), None);
        assert_eq!(s.task_by_unique_id(30), Some(b));
    }

    #[test]
    fn test_update_structure_pre_order() {
        let mut s = Schedule::new();
        let root = s.add_task(named(1, "Project"), None);
        let wbs = s.add_task(named(2, "Phase"), Some(root));
        let leaf = s.add_task(named(3, "Dig"), Some(wbs));
        let other = s.add_task(named(4, "Fill"), Some(root));
        s.update_structure();
        assert_eq!(s.task(root).id, Some(1));
        assert_eq!(s.task(wbs).id, Some(2));
        assert_eq!(s.task(leaf).id, Some(3));
        assert_eq!(s.task(other).id, Some(4));
        assert_eq!(s.task(leaf).outline_level, Some(3));
        assert_eq!(s.task(other).outline_level, Some(2));
    }

    #[test]
    fn test_reparent() {
        let mut s = Schedule::new();
        let a = s.add_task(named(1, "A"), None);
        let b = s.add_task(named(2, "B"), None);
        s.reparent(b, Some(a));
        assert_eq!(s.roots(), &[a]);
        assert_eq!(s.task(a).children, vec![b]);
        assert_eq!(s.task(b).parent, Some(a));
    }

    #[test]
    fn test_effective_calendar_walks_ancestors() {
        let mut s = Schedule::new();
        let standard = s.calendars.add(Calendar::standard("Standard"));
        let night = s.calendars.add(Calendar::standard("Night"));
        s.calendars.set_default(standard);
        let root = s.add_task(named(1, "Project"), None);
        let leaf = s.add_task(named(2, "Leaf"), Some(root));
        assert_eq!(s.effective_calendar(leaf), Some(standard));
        s.task_mut(root).calendar = Some(night);
        assert_eq!(s.effective_calendar(leaf), Some(night));
    }

    #[test]
    fn test_sort_children() {
        let mut s = Schedule::new();
        let root = s.add_task(named(1, "Project"), None);
        let z = s.add_task(named(2, "Z"), Some(root));
        let a = s.add_task(named(3, "A"), Some(root));
        s.sort_children_by(|t| t.name.clone());
        assert_eq!(s.task(root).children, vec![a, z]);
    }

    #[test]
    fn test_prepare_for_export_unaliases_calendars() {
        let mut s = Schedule::new();
        let mut shared = Calendar::standard("Shared");
        shared.unique_id = Some(1);
        let shared = s.calendars.add(shared);
        let first = s.add_resource(Resource {
            unique_id: Some(10),
            name: Some("Ann".into()),
            calendar: Some(shared),
            ..Default::default()
        });
        let second = s.add_resource(Resource {
            unique_id: Some(11),
            name: Some("Bob".into()),
            calendar: Some(shared),
            ..Default::default()
        });
        s.prepare_for_export();
        assert_eq!(s.resource(first).calendar, Some(shared));
        let copy = s.resource(second).calendar.unwrap();
        assert_ne!(copy, shared);
        assert_eq!(s.calendars.get(copy).name, "Bob");
        assert_eq!(s.calendars.get(copy).unique_id, Some(2));
        assert!(s.calendars.get(copy).personal);
    }
}
