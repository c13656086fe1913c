//! Column name to coercion mapping.

/// How a raw cell is converted into a [`crate::value::Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Str,
    Integer,
    Numeric,
    Currency,
    /// Hours, stored as a float.
    Duration,
    Date,
    Boolean,
    Guid,
}

/// Look up the coercion for a column of the given table.
///
/// `target_qty` is the one column name shared between tables with different
/// meanings: an amount of money in `projcost`, a work quantity elsewhere.
pub fn column_type(table: &str, column: &str) -> ColumnType {
    if table == "projcost" && column == "target_qty" {
        return ColumnType::Currency;
    }

    match column {
        "acct_id" | "acct_seq_num" | "actv_code_id" | "actv_code_type_id" | "actv_short_len"
        | "base_clndr_id" | "clndr_id" | "cost_item_id" | "cost_type_id" | "curr_id"
        | "decimal_digit_cnt" | "fk_id" | "float_path" | "float_path_order"
        | "fy_start_month_num" | "group_digit_cnt" | "location_id" | "memo_type_id"
        | "memo_id" | "parent_acct_id" | "parent_actv_code_id" | "parent_proj_catg_id"
        | "parent_role_id" | "parent_role_catg_id" | "parent_rsrc_catg_id"
        | "parent_rsrc_id" | "parent_wbs_id" | "pred_task_id" | "proc_id" | "proj_catg_id"
        | "proj_catg_type_id" | "proj_catg_short_len" | "proj_id" | "role_id"
        | "role_catg_id" | "role_catg_short_len" | "role_catg_type_id" | "rsrc_id"
        | "rsrc_catg_id" | "rsrc_catg_type_id" | "rsrc_catg_short_len" | "rsrc_role_id"
        | "rsrc_seq_num" | "seq_num" | "shift_id" | "shift_period_id"
        | "shift_start_hr_num" | "skill_level" | "sum_base_proj_id" | "task_code_base"
        | "task_code_step" | "task_id" | "task_pred_id" | "taskrsrc_id" | "udf_code_id"
        | "udf_type" | "udf_type_id" | "unit_id" | "wbs_id" | "wbs_memo_id" => {
            ColumnType::Integer
        }

        "act_cost" | "asgnmnt_catg_id" | "asgnmnt_catg_short_len" | "asgnmnt_catg_type_id"
        | "base_exch_rate" | "complete_pct" | "cost_per_qty" | "cost_per_qty2"
        | "cost_per_qty3" | "cost_per_qty4" | "cost_per_qty5" | "critical_drtn_hr_cnt"
        | "curv_id" | "day_hr_cnt" | "def_qty_per_hr" | "est_wt" | "latitude"
        | "longitude" | "max_qty_per_hr" | "month_hr_cnt" | "parent_asgnmnt_catg_id"
        | "phys_complete_pct" | "proc_wt" | "remain_cost" | "remain_qty_per_hr"
        | "target_qty_per_hr" | "udf_number" | "week_hr_cnt" | "year_hr_cnt" => {
            ColumnType::Numeric
        }
        c if c.starts_with("pct_usage_") => ColumnType::Numeric,

        "act_ot_cost" | "act_reg_cost" | "indep_remain_total_cost" | "orig_cost"
        | "target_cost" => ColumnType::Currency,

        "act_equip_qty" | "act_ot_qty" | "act_reg_qty" | "act_work_qty"
        | "free_float_hr_cnt" | "indep_remain_work_qty" | "lag_hr_cnt"
        | "remain_drtn_hr_cnt" | "remain_equip_qty" | "remain_qty" | "remain_work_qty"
        | "target_drtn_hr_cnt" | "target_equip_qty" | "target_lag_drtn_hr_cnt"
        | "target_qty" | "target_work_qty" | "total_float_hr_cnt" => ColumnType::Duration,

        "act_end_date" | "act_start_date" | "anticip_end_date" | "anticip_start_date"
        | "create_date" | "cstr_date" | "cstr_date2" | "early_end_date"
        | "early_start_date" | "expect_end_date" | "external_early_start_date"
        | "external_late_end_date" | "last_recalc_date" | "late_end_date"
        | "late_start_date" | "plan_end_date" | "plan_start_date" | "reend_date"
        | "rem_late_start_date" | "rem_late_end_date" | "restart_date" | "resume_date"
        | "scd_end_date" | "start_date" | "suspend_date" | "target_end_date"
        | "target_start_date" | "udf_date" => ColumnType::Date,

        "step_complete_flag" => ColumnType::Boolean,
        "tmpl_guid" => ColumnType::Guid,

        _ => ColumnType::Str,
    }
}
