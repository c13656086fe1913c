//! Builds a [`Schedule`] from the tables of one export.

use chrono::NaiveDateTime;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::calendar::CalendarId;
use crate::calendar_builder::{select_default_calendar, CalendarBuilder};
use crate::clash::ClashMap;
use crate::codes::{
    ActivityStatus, ActivityType, ConstraintType, CriticalActivityType, CurrencySymbolPosition,
    DurationType, PercentCompleteType, Priority, RelationType, ResourceType,
};
use crate::config::ReadOptions;
use crate::derive::{populate_assignment_dates, populate_baseline, populate_percent_complete, populate_task_dates};
use crate::duration::Duration;
use crate::error::{ReadError, Result, Tolerance};
use crate::model::{
    Assignment, ExpenseItem, ExternalRelation, ProgressedActivities, Relation, Resource, Schedule,
    Task, TaskId,
};
use crate::rollup::Rollup;
use crate::structured_text::StructuredTextParser;
use crate::value::Row;
use crate::xer::{XerFile, XerParser};

/// Where entity rows come from.
pub trait TableSource {
    /// Rows of a table in source order; empty when absent.
    fn rows(&self, table: &str) -> &[Row];

    fn default_currency(&self) -> Option<&Row>;

    /// Rows of a table whose integer column equals `id`.
    fn rows_where(&self, table: &str, column: &str, id: i32) -> Vec<&Row> {
        self.rows(table)
            .iter()
            .filter(|row| matches!(row.get_integer(column), Ok(Some(v)) if v == id))
            .collect()
    }
}

impl TableSource for XerFile {
    fn rows(&self, table: &str) -> &[Row] {
        XerFile::rows(self, table)
    }

    fn default_currency(&self) -> Option<&Row> {
        XerFile::default_currency(self)
    }

    fn rows_where(&self, table: &str, column: &str, id: i32) -> Vec<&Row> {
        XerFile::rows_where(self, table, column, id)
    }
}

/// Read an export from a string.
pub fn read_str(input: &str, options: &ReadOptions) -> Result<Schedule> {
    let file = XerParser::new().parse_str(input)?;
    ScheduleReader::new(&file, options).read()
}

/// Read an export from bytes in the configured encoding.
pub fn read<R: Read>(reader: R, options: &ReadOptions) -> Result<Schedule> {
    let file = options.parser()?.parse(reader)?;
    ScheduleReader::new(&file, options).read()
}

pub fn read_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Schedule> {
    let file = File::open(path).map_err(|source| ReadError::Io { line: 0, source })?;
    read(file, options)
}

/// Typed access to one row with the tolerance applied.
struct Fields<'r, 't> {
    row: &'r Row,
    tolerance: &'t mut Tolerance,
}

impl<'r, 't> Fields<'r, 't> {
    fn new(row: &'r Row, tolerance: &'t mut Tolerance) -> Self {
        Self { row, tolerance }
    }

    fn string(&self, column: &str) -> Option<String> {
        self.row.get_string(column).filter(|s| !s.is_empty())
    }

    fn boolean(&self, column: &str) -> bool {
        self.row.get_boolean(column)
    }

    fn code<T>(&self, column: &str, from_code: fn(&str) -> Option<T>) -> Option<T> {
        let text = self.string(column)?;
        let code = from_code(&text);
        if code.is_none() {
            debug!("Unknown {} code {:?}", column, text);
        }
        code
    }

    fn integer(&mut self, column: &str) -> Result<Option<i32>> {
        self.tolerance.value(self.row.get_integer(column))
    }

    fn double(&mut self, column: &str) -> Result<Option<f64>> {
        self.tolerance.value(self.row.get_double(column))
    }

    fn date(&mut self, column: &str) -> Result<Option<NaiveDateTime>> {
        self.tolerance.value(self.row.get_date(column))
    }

    fn hours(&mut self, column: &str) -> Result<Option<Duration>> {
        self.tolerance.value(self.row.get_duration(column))
    }
}

/// Resolve a source activity id through the clash map.
fn lookup_activity(schedule: &Schedule, clash: &ClashMap, original: Option<i32>) -> Option<TaskId> {
    original.and_then(|id| schedule.task_by_unique_id(clash.get(id)))
}

fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

fn accumulate(total: &mut Option<f64>, value: Option<f64>) {
    *total = Some(total.unwrap_or(0.0) + value.unwrap_or(0.0));
}

pub struct ScheduleReader<'s, S> {
    source: &'s S,
    options: ReadOptions,
    tolerance: Tolerance,
    activity_clash: ClashMap,
    role_clash: ClashMap,
    project_id: Option<i32>,
    schedule: Schedule,
}

impl<'s, S: TableSource> ScheduleReader<'s, S> {
    pub fn new(source: &'s S, options: &ReadOptions) -> Self {
        Self {
            source,
            options: options.clone(),
            tolerance: Tolerance::new(options.ignore_errors),
            activity_clash: ClashMap::new(),
            role_clash: ClashMap::new(),
            project_id: None,
            schedule: Schedule::new(),
        }
    }

    pub fn read(mut self) -> Result<Schedule> {
        let source = self.source;

        let project = self.select_project()?;
        if let Some(row) = source.default_currency() {
            self.process_default_currency(row)?;
        }
        if let Some(row) = project {
            self.process_project(row)?;
        }
        self.process_schedule_options()?;
        self.process_calendars()?;
        self.process_resources()?;
        self.process_roles()?;
        self.process_wbs()?;
        self.process_activities()?;
        self.order_tasks();
        self.process_relations()?;
        self.process_assignments()?;
        self.process_expense_items()?;

        let baseline = self
            .options
            .baseline_from_current_project
            .unwrap_or(self.schedule.properties.baseline_project_id.is_none());
        Rollup::new().populate_baseline(baseline).run(&mut self.schedule);

        let mut schedule = self.schedule;
        schedule.ignored_errors = self.tolerance.into_ignored();
        info!(
            "Read {} tasks, {} resources, {} relations, {} assignments ({} ignored errors)",
            schedule.task_count(),
            schedule.resources().count(),
            schedule.relations.len(),
            schedule.assignments.len(),
            schedule.ignored_errors.len()
        );
        Ok(schedule)
    }

    fn select_project(&mut self) -> Result<Option<&'s Row>> {
        let source = self.source;
        let projects = source.rows("project");
        let project = match self.options.project_id {
            Some(id) => Some(
                source
                    .rows_where("project", "proj_id", id)
                    .first()
                    .copied()
                    .ok_or(ReadError::ProjectNotFound(id))?,
            ),
            None => projects.first(),
        };
        if projects.len() > 1 && self.options.project_id.is_none() {
            debug!("{} projects in export, reading the first", projects.len());
        }
        self.project_id = match project {
            Some(row) => Fields::new(row, &mut self.tolerance).integer("proj_id")?,
            None => None,
        };
        Ok(project)
    }

    /// Rows of a table that belong to the selected project.
    fn project_rows(&self, table: &str) -> Vec<&'s Row> {
        let source = self.source;
        match self.project_id {
            Some(id) => source.rows_where(table, "proj_id", id),
            None => source.rows(table).iter().collect(),
        }
    }

    fn process_default_currency(&mut self, row: &Row) -> Result<()> {
        let mut f = Fields::new(row, &mut self.tolerance);
        let p = &mut self.schedule.properties;
        p.currency_symbol = f.string("curr_symbol");
        p.symbol_position = f
            .code("pos_curr_fmt_type", CurrencySymbolPosition::from_code)
            .unwrap_or_default();
        p.currency_digits = f.integer("decimal_digit_cnt")?;
        if let Some(c) = f.string("digit_group_symbol").and_then(|s| s.chars().next()) {
            p.thousands_separator = c;
        }
        if let Some(c) = f.string("decimal_symbol").and_then(|s| s.chars().next()) {
            p.decimal_separator = c;
        }
        Ok(())
    }

    fn process_project(&mut self, row: &Row) -> Result<()> {
        let mut f = Fields::new(row, &mut self.tolerance);
        let p = &mut self.schedule.properties;
        p.unique_id = f.integer("proj_id")?;
        p.short_name = f.string("proj_short_name");
        p.name = p.short_name.clone();
        p.baseline_project_id = f.integer("sum_base_proj_id")?;
        p.creation_date = f.date("create_date")?;
        p.critical_activity_type = f
            .code("critical_path_type", CriticalActivityType::from_code)
            .unwrap_or_default();
        p.status_date = f.date("last_recalc_date")?;
        p.fiscal_year_start_month = f.integer("fy_start_month_num")?;
        p.planned_start = f.date("plan_start_date")?;
        p.scheduled_finish = f.date("scd_end_date")?;
        p.must_finish_by = f.date("plan_end_date")?;
        if let Some(limit) = f.hours("critical_drtn_hr_cnt")? {
            p.critical_slack_limit = limit;
        }
        if let Some(separator) = f.string("name_sep_char") {
            p.wbs_separator = separator;
        }
        p.activity_default_calendar_id = f.integer("clndr_id")?;
        debug!("Project {:?} ({:?})", p.short_name, p.unique_id);
        Ok(())
    }

    fn process_schedule_options(&mut self) -> Result<()> {
        let from_property;
        let row = match self.project_rows("schedoptions").first() {
            Some(row) => *row,
            None => {
                let blob = self
                    .project_rows("projprop")
                    .into_iter()
                    .find(|row| row.get_string("prop_name").as_deref() == Some("scheduling"))
                    .and_then(|row| row.get_string("prop_value"));
                let Some(text) = blob else {
                    return Ok(());
                };
                let record = StructuredTextParser::new(&text)
                    .raise_on_error(self.options.raise_on_structured_text_error)
                    .parse()?;
                from_property = Row::from_pairs(record.attributes.iter().map(|(k, v)| (k, v.clone())));
                &from_property
            }
        };

        let mut f = Fields::new(row, &mut self.tolerance);
        let o = &mut self.schedule.options;
        o.level_all_resources = f.boolean("level_all_rsrc_flag");
        o.level_within_float = f.boolean("level_within_float_flag");
        o.make_open_ended_activities_critical = f.boolean("sched_open_critical_flag");
        o.use_expected_finish_dates = f.boolean("sched_use_expect_end_flag");
        o.ignore_external_relationships =
            f.string("sched_outer_depend_type").as_deref() == Some("SD_None");
        o.progressed_activities = if f.boolean("sched_retained_logic") {
            ProgressedActivities::RetainedLogic
        } else if f.boolean("sched_progress_override") {
            ProgressedActivities::ProgressOverride
        } else {
            ProgressedActivities::ActualDates
        };
        o.compute_start_to_start_lag_from_early_start = f.boolean("sched_lag_early_start_flag");
        o.total_float_type = f.string("sched_float_type");
        o.relationship_lag_calendar = f.string("sched_calendar_on_relationship_lag");
        o.calculate_multiple_float_paths = f.boolean("enable_multiple_longest_path_calc");
        o.max_float_paths = f.integer("max_multiple_longest_path")?;
        Ok(())
    }

    fn process_calendars(&mut self) -> Result<()> {
        let source = self.source;
        let mut calendars = CalendarBuilder::new(&mut self.tolerance)
            .raise_on_structured_text_error(self.options.raise_on_structured_text_error)
            .build(source.rows("calendar"))?;
        select_default_calendar(
            &mut calendars,
            self.schedule.properties.activity_default_calendar_id,
        );
        self.schedule.calendars = calendars;
        Ok(())
    }

    fn calendar(&self, unique_id: Option<i32>) -> Option<CalendarId> {
        unique_id.and_then(|id| self.schedule.calendars.by_unique_id(id))
    }

    fn process_resources(&mut self) -> Result<()> {
        let source = self.source;
        for row in source.rows("rsrc") {
            let mut f = Fields::new(row, &mut self.tolerance);
            let Some(unique_id) = f.integer("rsrc_id")? else {
                warn!("Skipping resource without an id");
                continue;
            };
            self.role_clash.add(unique_id);
            let calendar_id = f.integer("clndr_id")?;
            let resource = Resource {
                unique_id: Some(unique_id),
                name: f.string("rsrc_name"),
                code: f.string("employee_code"),
                initials: f.string("rsrc_short_name"),
                email: f.string("email_addr"),
                notes: f.string("rsrc_notes"),
                resource_type: f.code("rsrc_type", ResourceType::from_code),
                parent_unique_id: f.integer("parent_rsrc_id")?,
                default_units: f.double("def_qty_per_hr")?.unwrap_or(0.0) * 100.0,
                calendar: None,
                role: false,
            };
            let calendar = self.calendar(calendar_id);
            self.schedule.add_resource(Resource { calendar, ..resource });
        }
        Ok(())
    }

    fn process_roles(&mut self) -> Result<()> {
        let source = self.source;
        for row in source.rows("roles") {
            let mut f = Fields::new(row, &mut self.tolerance);
            let Some(original) = f.integer("role_id")? else {
                warn!("Skipping role without an id");
                continue;
            };
            let unique_id = self.role_clash.add(original);
            if unique_id != original {
                debug!("Role {} renumbered to {}", original, unique_id);
            }
            self.schedule.add_resource(Resource {
                unique_id: Some(unique_id),
                name: f.string("role_name"),
                initials: f.string("role_short_name"),
                role: true,
                ..Default::default()
            });
        }
        Ok(())
    }

    fn process_wbs(&mut self) -> Result<()> {
        let rows = self.project_rows("projwbs");
        let mut links: Vec<(TaskId, i32)> = Vec::new();

        for row in &rows {
            let mut f = Fields::new(row, &mut self.tolerance);
            let Some(original) = f.integer("wbs_id")? else {
                warn!("Skipping WBS node without an id");
                continue;
            };
            let wbs = f.string("wbs_short_name");
            let task = Task {
                summary: true,
                name: f.string("wbs_name"),
                activity_id: wbs.clone(),
                wbs,
                sequence_number: f.integer("seq_num")?,
                baseline_cost: f.double("orig_cost")?,
                remaining_cost: f.double("indep_remain_total_cost")?,
                remaining_work: f.hours("indep_remain_work_qty")?,
                deadline: f.date("anticip_end_date")?,
                suspend_date: f.date("suspend_date")?,
                resume_date: f.date("resume_date")?,
                ..Default::default()
            };
            let parent = f.integer("parent_wbs_id")?;
            let unique_id = self.activity_clash.add(original);
            let id = self.schedule.add_task(Task { unique_id: Some(unique_id), ..task }, None);
            if let Some(parent) = parent {
                links.push((id, parent));
            }
        }

        for (id, parent) in links {
            let Some(parent_id) = self.schedule.task_by_unique_id(self.activity_clash.get(parent)) else {
                debug!("WBS parent {} not in this project", parent);
                continue;
            };
            if self.is_ancestor_or_self(id, parent_id) {
                warn!("Ignoring cyclic WBS parent {}", parent);
                continue;
            }
            self.schedule.reparent(id, Some(parent_id));
        }

        if self.options.wbs_is_full_path {
            let separator = self.schedule.properties.wbs_separator.clone();
            for id in self.schedule.pre_order() {
                let Some(parent) = self.schedule.task(id).parent else {
                    continue;
                };
                let prefix = self.schedule.task(parent).wbs.clone().unwrap_or_default();
                let task = self.schedule.task_mut(id);
                let wbs = format!("{}{}{}", prefix, separator, task.wbs.as_deref().unwrap_or_default());
                task.activity_id = Some(wbs.clone());
                task.wbs = Some(wbs);
            }
        }

        debug!("Read {} WBS nodes", rows.len());
        Ok(())
    }

    /// Whether `candidate` is `id` or sits above it.
    fn is_ancestor_or_self(&self, candidate: TaskId, id: TaskId) -> bool {
        let mut current = Some(id);
        while let Some(t) = current {
            if t == candidate {
                return true;
            }
            current = self.schedule.task(t).parent;
        }
        false
    }

    fn process_activities(&mut self) -> Result<()> {
        let rows = self.project_rows("task");
        let baseline = self
            .options
            .baseline_from_current_project
            .unwrap_or(self.schedule.properties.baseline_project_id.is_none());

        for row in &rows {
            let mut f = Fields::new(row, &mut self.tolerance);
            let Some(original) = f.integer("task_id")? else {
                warn!("Skipping activity without an id");
                continue;
            };
            let task = activity(&mut f)?;
            let parent = f
                .integer("wbs_id")?
                .and_then(|wbs| self.schedule.task_by_unique_id(self.activity_clash.get(wbs)))
                .filter(|&p| self.schedule.task(p).summary);
            let calendar_id = f.integer("clndr_id")?;

            let unique_id = self.activity_clash.add(original);
            if unique_id != original {
                debug!("Activity {} renumbered to {}", original, unique_id);
            }
            let calendar = self.calendar(calendar_id);
            let id = self.schedule.add_task(
                Task {
                    unique_id: Some(unique_id),
                    calendar,
                    ..task
                },
                parent,
            );
            self.finish_activity(id, baseline);
        }
        Ok(())
    }

    /// Values that depend on the activity's calendar or the project.
    fn finish_activity(&mut self, id: TaskId, baseline: bool) {
        let calendar = self.schedule.effective_calendar(id);
        let minutes = self.schedule.minutes_per_period(calendar);
        let status_date = self.schedule.properties.status_date;
        let longest_path =
            self.schedule.properties.critical_activity_type == CriticalActivityType::LongestPath;
        let limit = self.schedule.properties.critical_slack_limit;
        let calendars = &self.schedule.calendars;
        let work = |start, finish| calendar.and_then(|c| calendars.work(c, start, finish));

        let mut task = self.schedule.task(id).clone();
        populate_task_dates(&mut task);

        task.actual_work = Duration::add(task.actual_work_labor, task.actual_work_nonlabor, &minutes);
        task.planned_work = Duration::add(task.planned_work_labor, task.planned_work_nonlabor, &minutes);
        task.remaining_work =
            Duration::add(task.remaining_work_labor, task.remaining_work_nonlabor, &minutes);
        task.work = Duration::add(task.actual_work, task.remaining_work, &minutes);

        if let Some(start) = task.actual_start {
            let end = task
                .actual_finish
                .or_else(|| status_date.map(|status| status.max(start)));
            if let Some(end) = end {
                task.actual_duration = match (task.suspend_date, task.resume_date) {
                    (Some(suspend), resume) if suspend > start && suspend < end => {
                        let before = work(Some(start), Some(suspend));
                        let after = resume.filter(|&r| end > r).and_then(|r| work(Some(r), Some(end)));
                        Duration::add(before, after, &minutes)
                    }
                    _ => work(Some(start), Some(end)),
                };
            }
        }

        let actual = task.actual_duration.filter(|d| !d.is_zero());
        let remaining = task.remaining_duration.filter(|d| !d.is_zero());
        task.duration = match (actual, remaining) {
            (Some(_), Some(_)) => work(task.start, task.finish),
            (Some(a), None) => Some(a),
            (None, _) => task.remaining_duration,
        };

        task.critical = !longest_path
            && task
                .total_float
                .is_some_and(|tf| tf.in_hours(&minutes) <= limit.in_hours(&minutes));

        if baseline {
            populate_baseline(&mut task);
        }
        populate_percent_complete(&mut task);

        *self.schedule.task_mut(id) = task;
    }

    /// Activities first by activity id, then child WBS nodes by sequence
    /// number; then number everything in outline order.
    fn order_tasks(&mut self) {
        self.schedule.sort_children_by(|t| {
            (
                t.summary,
                if t.summary { t.sequence_number.unwrap_or(0) } else { 0 },
                t.activity_id.clone(),
            )
        });
        self.schedule.update_structure();

        let name = match self.schedule.roots() {
            [root] if self.schedule.task(*root).summary => self.schedule.task(*root).name.clone(),
            _ => None,
        };
        if name.is_some() {
            self.schedule.properties.name = name;
        }
    }

    fn process_relations(&mut self) -> Result<()> {
        let mut sequence = 0;
        for row in self.project_rows("taskpred") {
            sequence += 1;
            let mut f = Fields::new(row, &mut self.tolerance);
            let unique_id = f.integer("task_pred_id")?.unwrap_or(sequence);
            let successor_id = f.integer("task_id")?;
            let predecessor_id = f.integer("pred_task_id")?;
            let relation_type = f.code("pred_type", RelationType::from_code).unwrap_or_default();
            let lag = f.hours("lag_hr_cnt")?.unwrap_or(Duration::hours(0.0));
            let notes = f.string("comments");

            let successor = lookup_activity(&self.schedule, &self.activity_clash, successor_id);
            let predecessor = lookup_activity(&self.schedule, &self.activity_clash, predecessor_id);
            match (predecessor, successor, predecessor_id, successor_id) {
                (Some(predecessor), Some(successor), _, _) => self.schedule.relations.push(Relation {
                    unique_id,
                    predecessor,
                    successor,
                    relation_type,
                    lag,
                    notes,
                }),
                (None, Some(task), Some(external), _) => {
                    self.schedule.external_relations.push(ExternalRelation {
                        unique_id,
                        task,
                        external_task_unique_id: external,
                        external_is_predecessor: true,
                        relation_type,
                        lag,
                        notes,
                    })
                }
                (Some(task), None, _, Some(external)) => {
                    self.schedule.external_relations.push(ExternalRelation {
                        unique_id,
                        task,
                        external_task_unique_id: external,
                        external_is_predecessor: false,
                        relation_type,
                        lag,
                        notes,
                    })
                }
                _ => warn!(
                    "Dropping relation {}: neither {:?} nor {:?} found",
                    unique_id, predecessor_id, successor_id
                ),
            }
        }
        Ok(())
    }

    fn process_assignments(&mut self) -> Result<()> {
        for row in self.project_rows("taskrsrc") {
            let mut f = Fields::new(row, &mut self.tolerance);
            let unique_id = f.integer("taskrsrc_id")?;
            let task_id = f.integer("task_id")?;
            let resource_id = f.integer("rsrc_id")?;
            let role_id = f.integer("role_id")?;

            let task = lookup_activity(&self.schedule, &self.activity_clash, task_id);
            let resource = resource_id.and_then(|id| self.schedule.resource_by_unique_id(id));
            let role = role_id.and_then(|id| self.schedule.resource_by_unique_id(self.role_clash.get(id)));
            let (resource, role) = match (resource, role) {
                (None, Some(role)) => (Some(role), None),
                other => other,
            };
            let (Some(task), Some(resource)) = (task, resource) else {
                warn!(
                    "Dropping assignment {:?}: activity {:?} or resource {:?} not found",
                    unique_id, task_id, resource_id
                );
                continue;
            };

            let mut assignment = Assignment {
                unique_id,
                task,
                resource,
                role,
                remaining_work: f.hours("remain_qty")?,
                planned_work: f.hours("target_qty")?,
                actual_overtime_work: f.hours("act_ot_qty")?,
                planned_cost: f.double("target_cost")?,
                actual_overtime_cost: f.double("act_ot_cost")?,
                remaining_cost: f.double("remain_cost")?,
                actual_start: f.date("act_start_date")?,
                actual_finish: f.date("act_end_date")?,
                remaining_early_start: f.date("restart_date")?,
                remaining_early_finish: f.date("reend_date")?,
                planned_start: f.date("target_start_date")?,
                planned_finish: f.date("target_end_date")?,
                override_rate: f.double("cost_per_qty")?,
                units: f.double("target_qty_per_hr")?.unwrap_or(0.0) * 100.0,
                remaining_units: f.double("remain_qty_per_hr")?.unwrap_or(0.0) * 100.0,
                ..Default::default()
            };
            populate_assignment_dates(&mut assignment);

            let minutes = self
                .schedule
                .minutes_per_period(self.schedule.effective_calendar(task));
            assignment.actual_work = Duration::add(
                f.hours("act_reg_qty")?,
                assignment.actual_overtime_work,
                &minutes,
            );
            assignment.work = Duration::add(assignment.actual_work, assignment.remaining_work, &minutes);
            assignment.actual_cost = sum(f.double("act_reg_cost")?, assignment.actual_overtime_cost);
            assignment.cost = sum(assignment.actual_cost, assignment.remaining_cost);

            let owner = self.schedule.task_mut(task);
            accumulate(&mut owner.planned_cost, assignment.planned_cost);
            accumulate(&mut owner.actual_cost, assignment.actual_cost);
            accumulate(&mut owner.remaining_cost, assignment.remaining_cost);
            accumulate(&mut owner.cost, assignment.cost);

            self.schedule.assignments.push(assignment);
        }
        Ok(())
    }

    fn process_expense_items(&mut self) -> Result<()> {
        for row in self.project_rows("projcost") {
            let mut f = Fields::new(row, &mut self.tolerance);
            let task_id = f.integer("task_id")?;
            let Some(task) = lookup_activity(&self.schedule, &self.activity_clash, task_id) else {
                warn!("Dropping expense item for unknown activity {:?}", task_id);
                continue;
            };

            let actual_cost = f.double("act_cost")?;
            let remaining_cost = f.double("remain_cost")?;
            let price = f.double("cost_per_qty")?;
            let mut item = ExpenseItem {
                unique_id: f.integer("cost_item_id")?,
                task,
                name: f.string("cost_name"),
                description: f.string("cost_descr"),
                document_number: f.string("po_number"),
                vendor: f.string("vendor_name"),
                unit_of_measure: f.string("qty_name"),
                auto_compute_actuals: f.boolean("auto_compute_act_flag"),
                actual_cost,
                remaining_cost,
                planned_cost: f.double("target_cost")?,
                at_completion_cost: sum(actual_cost, remaining_cost),
                price_per_unit: price,
                planned_units: f.double("target_qty")?,
                ..Default::default()
            };
            if let Some(price) = price.filter(|p| *p != 0.0) {
                item.actual_units = actual_cost.map(|c| c / price);
                item.remaining_units = remaining_cost.map(|c| c / price);
                item.at_completion_units = sum(item.actual_units, item.remaining_units);
            }

            let owner = self.schedule.task_mut(task);
            accumulate(&mut owner.planned_cost, item.planned_cost);
            accumulate(&mut owner.actual_cost, item.actual_cost);
            accumulate(&mut owner.remaining_cost, item.remaining_cost);
            accumulate(&mut owner.cost, item.at_completion_cost);
            accumulate(&mut owner.fixed_cost, item.at_completion_cost);

            self.schedule.expense_items.push(item);
        }
        Ok(())
    }
}

/// Row values of an activity that need nothing but the row.
fn activity(f: &mut Fields<'_, '_>) -> Result<Task> {
    let activity_type = f.code("task_type", ActivityType::from_code);
    let status = f.code("status_code", ActivityStatus::from_code);
    let planned_duration = f.hours("target_drtn_hr_cnt")?;
    let remaining_duration = f.hours("remain_drtn_hr_cnt")?;

    let actual_labor = f.hours("act_work_qty")?;
    let actual_nonlabor = f.hours("act_equip_qty")?;
    let remaining_labor = f.hours("remain_work_qty")?;
    let remaining_nonlabor = f.hours("remain_equip_qty")?;

    let task = Task {
        activity_id: f.string("task_code"),
        name: f.string("task_name"),
        activity_type,
        status,
        milestone: activity_type.is_some_and(ActivityType::is_milestone),
        duration_type: f.code("duration_type", DurationType::from_code),
        priority: f.code("priority_type", Priority::from_code),
        constraint_type: f.code("cstr_type", ConstraintType::from_code),
        constraint_date: f.date("cstr_date")?,
        secondary_constraint_type: f.code("cstr_type2", ConstraintType::from_code),
        secondary_constraint_date: f.date("cstr_date2")?,
        primary_resource_unique_id: f.integer("rsrc_id")?,
        created: f.date("create_date")?,
        planned_duration,
        remaining_duration,
        actual_work_labor: actual_labor,
        actual_work_nonlabor: actual_nonlabor,
        planned_work_labor: f.hours("target_work_qty")?,
        planned_work_nonlabor: f.hours("target_equip_qty")?,
        remaining_work_labor: remaining_labor,
        remaining_work_nonlabor: remaining_nonlabor,
        actual_start: f.date("act_start_date")?,
        actual_finish: f.date("act_end_date")?,
        early_start: f.date("early_start_date")?,
        early_finish: f.date("early_end_date")?,
        late_start: f.date("late_start_date")?,
        late_finish: f.date("late_end_date")?,
        remaining_early_start: f.date("restart_date")?,
        remaining_early_finish: f.date("reend_date")?,
        remaining_late_start: f.date("rem_late_start_date")?,
        remaining_late_finish: f.date("rem_late_end_date")?,
        planned_start: f.date("target_start_date")?,
        planned_finish: f.date("target_end_date")?,
        expected_finish: f.date("expect_end_date")?,
        suspend_date: f.date("suspend_date")?,
        resume_date: f.date("resume_date")?,
        free_float: f.hours("free_float_hr_cnt")?,
        total_float: f.hours("total_float_hr_cnt")?,
        longest_path: f.boolean("driving_path_flag"),
        percent_complete_type: f.code("complete_pct_type", PercentCompleteType::from_code),
        physical_percent_complete: f.double("phys_complete_pct")?,
        duration_percent_complete: Some(duration_percent_complete(
            planned_duration,
            remaining_duration,
            status,
        )),
        units_percent_complete: Some(units_percent_complete(
            [actual_labor, actual_nonlabor],
            [remaining_labor, remaining_nonlabor],
        )),
        ..Default::default()
    };
    Ok(task)
}

fn value(d: Option<Duration>) -> f64 {
    d.map(|d| d.value).unwrap_or(0.0)
}

fn duration_percent_complete(
    planned: Option<Duration>,
    remaining: Option<Duration>,
    status: Option<ActivityStatus>,
) -> f64 {
    let (planned, remaining) = (value(planned), value(remaining));
    if planned == 0.0 {
        if remaining == 0.0 && status == Some(ActivityStatus::Completed) {
            100.0
        } else {
            0.0
        }
    } else if remaining < planned {
        (planned - remaining) * 100.0 / planned
    } else {
        0.0
    }
}

fn units_percent_complete(actual: [Option<Duration>; 2], remaining: [Option<Duration>; 2]) -> f64 {
    let done: f64 = actual.iter().map(|&d| value(d)).sum();
    if done == 0.0 {
        return 0.0;
    }
    let total = done + remaining.iter().map(|&d| value(d)).sum::<f64>();
    if total == 0.0 { 0.0 } else { done * 100.0 / total }
}
