//! Model builder for the weekly roster.
//!
//! Allocates one boolean per (employee, role, day, shift) tuple plus the
//! aggregate and fairness integers, then emits every constraint family and
//! the fairness objective. Each family is its own function; the order in
//! which they are emitted does not matter.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::domain::{Catalog, Day, Role, ShiftSlot};
use crate::error::ConfigError;
use crate::model::{Assignment, Comparison, LinearExpr, Model, VarId};

/// The rule a constraint instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintFamily {
    CashierCoverage,
    RestockerCoverage,
    NoAdjacentRestock,
    OneRolePerShift,
    NoSplitDay,
    Qualification,
    WeeklyCap,
    ExactWeeklyShifts,
    Blackout,
    NeverTogether,
    WeekendLoad,
    TotalShifts,
    FairnessBounds,
}

impl ConstraintFamily {
    pub const ALL: [ConstraintFamily; 13] = [
        ConstraintFamily::CashierCoverage,
        ConstraintFamily::RestockerCoverage,
        ConstraintFamily::NoAdjacentRestock,
        ConstraintFamily::OneRolePerShift,
        ConstraintFamily::NoSplitDay,
        ConstraintFamily::Qualification,
        ConstraintFamily::WeeklyCap,
        ConstraintFamily::ExactWeeklyShifts,
        ConstraintFamily::Blackout,
        ConstraintFamily::NeverTogether,
        ConstraintFamily::WeekendLoad,
        ConstraintFamily::TotalShifts,
        ConstraintFamily::FairnessBounds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConstraintFamily::CashierCoverage => "Cashier coverage",
            ConstraintFamily::RestockerCoverage => "Restocker daily coverage",
            ConstraintFamily::NoAdjacentRestock => "No adjacent restocking",
            ConstraintFamily::OneRolePerShift => "One role per shift",
            ConstraintFamily::NoSplitDay => "No split day",
            ConstraintFamily::Qualification => "Qualification lockout",
            ConstraintFamily::WeeklyCap => "Weekly cap",
            ConstraintFamily::ExactWeeklyShifts => "Exact weekly shifts",
            ConstraintFamily::Blackout => "Availability blackout",
            ConstraintFamily::NeverTogether => "Never together",
            ConstraintFamily::WeekendLoad => "Weekend equal load",
            ConstraintFamily::TotalShifts => "Total shifts link",
            ConstraintFamily::FairnessBounds => "Fairness bracket",
        }
    }

}

/// Flat key of an assignment variable. `employee` is a catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignmentKey {
    pub employee: usize,
    pub role: Role,
    pub day: Day,
    pub shift: ShiftSlot,
}

/// Where each decision and derived variable lives in the model.
#[derive(Debug, Clone, Default)]
pub struct VariableLayout {
    schedule: HashMap<AssignmentKey, VarId>,
    /// Allocation order, employee-major.
    keys: Vec<AssignmentKey>,
    /// `TotalShifts` per employee, by catalog index.
    pub total_shifts: Vec<VarId>,
    pub min_shifts: Option<VarId>,
    pub max_shifts: Option<VarId>,
}

impl VariableLayout {
    pub fn schedule(&self, key: &AssignmentKey) -> Option<VarId> {
        self.schedule.get(key).copied()
    }

    fn var(&self, employee: usize, role: Role, day: Day, shift: ShiftSlot) -> Option<VarId> {
        self.schedule(&AssignmentKey {
            employee,
            role,
            day,
            shift,
        })
    }

    pub fn assignment_var_count(&self) -> usize {
        self.keys.len()
    }
}

/// A built model together with the catalog and layout it was built from.
#[derive(Debug, Clone)]
pub struct RosterModel {
    pub catalog: Catalog,
    pub model: Model,
    pub layout: VariableLayout,
}

impl RosterModel {
    /// Number of emitted constraints per family.
    pub fn family_counts(&self) -> Vec<(ConstraintFamily, usize)> {
        ConstraintFamily::ALL
            .into_iter()
            .map(|family| {
                let count = self
                    .model
                    .constraints()
                    .iter()
                    .filter(|c| c.group == family.name())
                    .count();
                (family, count)
            })
            .collect()
    }

    /// Builds a complete assignment from the cells an externally supplied
    /// roster marks as worked. Aggregate and fairness variables are derived
    /// so that only the roster itself can violate the model.
    pub fn assignment_from_cells(&self, cells: &[AssignmentKey]) -> Assignment {
        let mut assignment = Assignment::zeroed(&self.model);
        let mut totals = vec![0i64; self.catalog.employees.len()];

        for cell in cells {
            match self.layout.schedule(cell) {
                Some(var) => {
                    if !assignment.is_true(var) {
                        assignment.set(var, 1);
                        totals[cell.employee] += 1;
                    }
                }
                None => warn!(?cell, "Cell has no assignment variable, ignoring"),
            }
        }

        for (employee, var) in self.layout.total_shifts.iter().enumerate() {
            assignment.set(*var, totals[employee]);
        }

        let pool: Vec<i64> = self
            .catalog
            .fairness_pool()
            .into_iter()
            .map(|e| totals[e])
            .collect();
        if let (Some(min_var), Some(min)) = (self.layout.min_shifts, pool.iter().min()) {
            assignment.set(min_var, *min);
        }
        if let (Some(max_var), Some(max)) = (self.layout.max_shifts, pool.iter().max()) {
            assignment.set(max_var, *max);
        }
        assignment
    }
}

/// Validates the catalog and builds the full roster model.
pub fn build(catalog: &Catalog) -> Result<RosterModel, ConfigError> {
    catalog.validate()?;

    let mut builder = Builder::new(catalog);
    builder.cashier_coverage();
    builder.restocker_coverage();
    builder.no_adjacent_restock();
    builder.one_role_per_shift();
    builder.no_split_day();
    builder.qualification();
    builder.weekly_cap();
    builder.exact_weekly_shifts();
    builder.blackouts();
    builder.never_together();
    builder.weekend_load();
    builder.total_shifts();
    builder.fairness();

    let roster = RosterModel {
        catalog: catalog.clone(),
        model: builder.model,
        layout: builder.layout,
    };
    info!(
        employees = catalog.employees.len(),
        variables = roster.model.variable_count(),
        constraints = roster.model.constraint_count(),
        "Roster model built"
    );
    Ok(roster)
}

struct Builder<'a> {
    catalog: &'a Catalog,
    model: Model,
    layout: VariableLayout,
}

impl<'a> Builder<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        let mut model = Model::new();
        let mut layout = VariableLayout::default();

        for (employee, emp) in catalog.employees.iter().enumerate() {
            for &role in &catalog.roles {
                for &day in &catalog.days {
                    for &shift in &catalog.shifts {
                        let key = AssignmentKey {
                            employee,
                            role,
                            day,
                            shift,
                        };
                        let var = model.new_bool_var(format!("schedule_{}_{role}_{day}_{shift}", emp.name));
                        layout.schedule.insert(key, var);
                        layout.keys.push(key);
                    }
                }
            }
        }

        let cap = i64::from(catalog.requirements.weekly_cap);
        layout.total_shifts = catalog
            .employees
            .iter()
            .map(|emp| model.new_int_var(0, cap, format!("total_shifts_{}", emp.name)))
            .collect();

        debug!(
            assignment_vars = layout.keys.len(),
            "Allocated assignment variables"
        );

        Self {
            catalog,
            model,
            layout,
        }
    }

    fn employees(&self) -> std::ops::Range<usize> {
        0..self.catalog.employees.len()
    }

    /// Every assignment variable of `employee` whose key passes `filter`.
    fn employee_vars(&self, employee: usize, filter: impl Fn(&AssignmentKey) -> bool) -> Vec<VarId> {
        self.layout
            .keys
            .iter()
            .filter(|k| k.employee == employee && filter(k))
            .filter_map(|k| self.layout.schedule(k))
            .collect()
    }

    fn has_shifts(&self, a: ShiftSlot, b: ShiftSlot) -> bool {
        self.catalog.shifts.contains(&a) && self.catalog.shifts.contains(&b)
    }

    fn name(&self, employee: usize) -> &str {
        &self.catalog.employees[employee].name
    }

    fn add(&mut self, family: ConstraintFamily, label: String, expr: LinearExpr, cmp: Comparison, rhs: i64) {
        self.model.add_linear(family.name(), label, expr, cmp, rhs);
    }

    // =========================================================================
    // Coverage
    // =========================================================================

    /// Exactly one cashier on every shift.
    fn cashier_coverage(&mut self) {
        let catalog = self.catalog;
        for &day in &catalog.days {
            for &shift in &catalog.shifts {
                let vars: Vec<VarId> = self
                    .employees()
                    .filter_map(|e| self.layout.var(e, Role::Cashier, day, shift))
                    .collect();
                self.add(
                    ConstraintFamily::CashierCoverage,
                    format!("{day} {shift}"),
                    LinearExpr::sum(vars),
                    Comparison::Eq,
                    1,
                );
            }
        }
    }

    /// Exactly one restocking shift per day.
    fn restocker_coverage(&mut self) {
        let catalog = self.catalog;
        for &day in &catalog.days {
            let mut vars = Vec::new();
            for e in self.employees() {
                for &shift in &catalog.shifts {
                    vars.extend(self.layout.var(e, Role::Restocker, day, shift));
                }
            }
            self.add(
                ConstraintFamily::RestockerCoverage,
                day.to_string(),
                LinearExpr::sum(vars),
                Comparison::Eq,
                1,
            );
        }
    }

    /// A day's Evening and the next day's Morning are never both restocking
    /// shifts. Needs both slots in the catalog.
    fn no_adjacent_restock(&mut self) {
        let catalog = self.catalog;
        let (first, last) = (ShiftSlot::Morning, ShiftSlot::Evening);
        if !self.has_shifts(first, last) {
            debug!("Morning or Evening not scheduled, no adjacent-restock rule");
            return;
        }

        for pair in catalog.days.windows(2) {
            let (today, tomorrow) = (pair[0], pair[1]);
            let vars: Vec<VarId> = self
                .employees()
                .flat_map(|e| {
                    [
                        self.layout.var(e, Role::Restocker, today, last),
                        self.layout.var(e, Role::Restocker, tomorrow, first),
                    ]
                })
                .flatten()
                .collect();
            self.add(
                ConstraintFamily::NoAdjacentRestock,
                format!("{today} {last} / {tomorrow} {first}"),
                LinearExpr::sum(vars),
                Comparison::Le,
                1,
            );
        }
    }

    // =========================================================================
    // Per-employee shape of a day
    // =========================================================================

    fn one_role_per_shift(&mut self) {
        let catalog = self.catalog;
        for e in self.employees() {
            for &day in &catalog.days {
                for &shift in &catalog.shifts {
                    let vars = self.employee_vars(e, |k| k.day == day && k.shift == shift);
                    let label = format!("{} {day} {shift}", self.name(e));
                    self.add(
                        ConstraintFamily::OneRolePerShift,
                        label,
                        LinearExpr::sum(vars),
                        Comparison::Le,
                        1,
                    );
                }
            }
        }
    }

    /// Nobody works both Morning and Evening of one day. Afternoon is free to
    /// pair with either; the one-role-per-shift rule covers the rest. Needs
    /// both slots in the catalog.
    fn no_split_day(&mut self) {
        let catalog = self.catalog;
        let (first, last) = (ShiftSlot::Morning, ShiftSlot::Evening);
        if !self.has_shifts(first, last) {
            debug!("Morning or Evening not scheduled, no split-day rule");
            return;
        }

        for e in self.employees() {
            for &day in &catalog.days {
                let vars = self.employee_vars(e, |k| k.day == day && (k.shift == first || k.shift == last));
                let label = format!("{} {day}", self.name(e));
                self.add(
                    ConstraintFamily::NoSplitDay,
                    label,
                    LinearExpr::sum(vars),
                    Comparison::Le,
                    1,
                );
            }
        }
    }

    /// Roles outside an employee's qualifications are fixed to false.
    fn qualification(&mut self) {
        let locked: Vec<(AssignmentKey, VarId)> = self
            .layout
            .keys
            .iter()
            .filter(|k| !self.catalog.employees[k.employee].is_qualified(k.role))
            .filter_map(|k| self.layout.schedule(k).map(|v| (*k, v)))
            .collect();

        for (key, var) in locked {
            let label = format!("{} as {} on {} {}", self.name(key.employee), key.role, key.day, key.shift);
            self.add(
                ConstraintFamily::Qualification,
                label,
                LinearExpr::sum([var]),
                Comparison::Eq,
                0,
            );
        }
    }

    // =========================================================================
    // Weekly load
    // =========================================================================

    fn weekly_cap(&mut self) {
        let cap = i64::from(self.catalog.requirements.weekly_cap);
        for e in self.employees() {
            let vars = self.employee_vars(e, |_| true);
            let label = self.name(e).to_string();
            self.add(ConstraintFamily::WeeklyCap, label, LinearExpr::sum(vars), Comparison::Le, cap);
        }
    }

    fn exact_weekly_shifts(&mut self) {
        let catalog = self.catalog;
        for e in self.employees() {
            let Some(count) = catalog.employees[e].rules.exact_weekly_shifts else {
                continue;
            };
            let vars = self.employee_vars(e, |_| true);
            let label = format!("{} works {count}", self.name(e));
            self.add(
                ConstraintFamily::ExactWeeklyShifts,
                label,
                LinearExpr::sum(vars),
                Comparison::Eq,
                i64::from(count),
            );
        }
    }

    /// One constraint per blackout rule: nothing assigned inside it.
    fn blackouts(&mut self) {
        let catalog = self.catalog;
        for e in self.employees() {
            for (n, blackout) in catalog.employees[e].rules.blackouts.iter().enumerate() {
                let vars = self.employee_vars(e, |k| blackout.covers(k.day, k.shift));
                let label = format!("{} blackout #{}", self.name(e), n + 1);
                self.add(ConstraintFamily::Blackout, label, LinearExpr::sum(vars), Comparison::Eq, 0);
            }
        }
    }

    fn never_together(&mut self) {
        let catalog = self.catalog;
        for (a, b) in catalog.exclusive_pairs() {
            for &day in &catalog.days {
                for &shift in &catalog.shifts {
                    let mut vars = self.employee_vars(a, |k| k.day == day && k.shift == shift);
                    vars.extend(self.employee_vars(b, |k| k.day == day && k.shift == shift));
                    let label = format!("{} / {} {day} {shift}", self.name(a), self.name(b));
                    self.add(
                        ConstraintFamily::NeverTogether,
                        label,
                        LinearExpr::sum(vars),
                        Comparison::Le,
                        1,
                    );
                }
            }
        }
    }

    /// Everyone works the same number of weekend shifts. Without weekend days
    /// in the catalog the sum is empty, so only a target of zero can hold.
    fn weekend_load(&mut self) {
        let target = i64::from(self.catalog.requirements.weekend_shifts);
        for e in self.employees() {
            let vars = self.employee_vars(e, |k| k.day.is_weekend());
            let label = self.name(e).to_string();
            self.add(
                ConstraintFamily::WeekendLoad,
                label,
                LinearExpr::sum(vars),
                Comparison::Eq,
                target,
            );
        }
    }

    // =========================================================================
    // Aggregates and objective
    // =========================================================================

    /// `total_shifts[e] - sum(schedule[e]) == 0`
    fn total_shifts(&mut self) {
        for e in self.employees() {
            let expr = self
                .employee_vars(e, |_| true)
                .into_iter()
                .fold(
                    LinearExpr::new().with_term(self.layout.total_shifts[e], 1),
                    |expr, var| expr.with_term(var, -1),
                );
            let label = self.name(e).to_string();
            self.add(ConstraintFamily::TotalShifts, label, expr, Comparison::Eq, 0);
        }
    }

    /// Brackets the totals of the non-exempt employees and minimises the
    /// spread between them.
    fn fairness(&mut self) {
        let pool = self.catalog.fairness_pool();
        if pool.is_empty() {
            debug!("Every employee is exempt from fairness, no objective");
            return;
        }

        let cap = i64::from(self.catalog.requirements.weekly_cap);
        let min_shifts = self.model.new_int_var(0, cap, "min_shifts");
        let max_shifts = self.model.new_int_var(0, cap, "max_shifts");
        let totals: Vec<VarId> = pool.iter().map(|&e| self.layout.total_shifts[e]).collect();

        let group = ConstraintFamily::FairnessBounds.name();
        self.model.add_min_equality(group, "min_shifts", min_shifts, totals.clone());
        self.model.add_max_equality(group, "max_shifts", max_shifts, totals);
        self.model
            .minimize(LinearExpr::new().with_term(max_shifts, 1).with_term(min_shifts, -1));

        self.layout.min_shifts = Some(min_shifts);
        self.layout.max_shifts = Some(max_shifts);
    }
}
