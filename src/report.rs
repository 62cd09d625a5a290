//! Solution reporter: turns a solver outcome into a roster and a text table.

use serde::Serialize;
use std::fmt;

use crate::constraints::{AssignmentKey, RosterModel};
use crate::domain::{Day, Role, ShiftSlot};
use crate::error::ReportError;
use crate::solver::SolveOutcome;

/// Minimum width of the name column.
const NAME_WIDTH: usize = 10;

/// One employee's week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub employee: String,
    /// Day-major, one entry per (day, shift) in catalog order.
    pub cells: Vec<Option<Role>>,
    pub total: u32,
}

/// A decoded, consistent roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub days: Vec<Day>,
    pub shifts: Vec<ShiftSlot>,
    pub rows: Vec<RosterRow>,
    /// `max_shifts - min_shifts`, when the model has an objective.
    pub spread: Option<i64>,
    pub optimal: bool,
}

impl Roster {
    /// The role `employee` holds during (`day`, `shift`), if any.
    pub fn cell(&self, employee: &str, day: Day, shift: ShiftSlot) -> Option<Role> {
        let row = self.rows.iter().find(|r| r.employee == employee)?;
        let d = self.days.iter().position(|&x| x == day)?;
        let s = self.shifts.iter().position(|&x| x == shift)?;
        row.cells[d * self.shifts.len() + s]
    }

    /// Every worked cell as (employee, role, day, shift).
    pub fn assignments(&self) -> Vec<(&str, Role, Day, ShiftSlot)> {
        let mut out = Vec::new();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                if let Some(role) = cell {
                    let day = self.days[i / self.shifts.len()];
                    let shift = self.shifts[i % self.shifts.len()];
                    out.push((row.employee.as_str(), *role, day, shift));
                }
            }
        }
        out
    }

    pub fn total(&self, employee: &str) -> Option<u32> {
        self.rows.iter().find(|r| r.employee == employee).map(|r| r.total)
    }
}

/// What a run produced. Infeasibility and solver failure are explicit
/// outcomes, never an empty table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterReport {
    Scheduled(Roster),
    Infeasible,
    SolverFailed(String),
}

impl RosterReport {
    pub fn roster(&self) -> Option<&Roster> {
        match self {
            RosterReport::Scheduled(roster) => Some(roster),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            RosterReport::Scheduled(r) if r.optimal => "OPTIMAL",
            RosterReport::Scheduled(_) => "FEASIBLE",
            RosterReport::Infeasible => "INFEASIBLE",
            RosterReport::SolverFailed(_) => "SOLVER_FAILED",
        }
    }
}

/// Decodes `outcome` against the layout of `roster`.
///
/// Each (employee, day, shift) cell holds at most one true role, so decoding
/// is a lookup. Per-employee totals are checked against the solver-bound
/// `TotalShifts` values.
pub fn decode(roster: &RosterModel, outcome: &SolveOutcome) -> Result<RosterReport, ReportError> {
    let (assignment, optimal) = match outcome {
        SolveOutcome::Optimal(a) => (a, true),
        SolveOutcome::Feasible(a) => (a, false),
        SolveOutcome::Infeasible => return Ok(RosterReport::Infeasible),
        SolveOutcome::Failed(reason) => return Ok(RosterReport::SolverFailed(reason.clone())),
    };

    let expected = roster.model.variable_count();
    if assignment.len() != expected {
        return Err(ReportError::AssignmentSize {
            expected,
            actual: assignment.len(),
        });
    }

    let catalog = &roster.catalog;
    let mut rows = Vec::with_capacity(catalog.employees.len());

    for (employee, emp) in catalog.employees.iter().enumerate() {
        let mut cells = Vec::with_capacity(catalog.days.len() * catalog.shifts.len());
        for &day in &catalog.days {
            for &shift in &catalog.shifts {
                let mut held = catalog.roles.iter().copied().filter(|&role| {
                    let key = AssignmentKey {
                        employee,
                        role,
                        day,
                        shift,
                    };
                    roster
                        .layout
                        .schedule(&key)
                        .is_some_and(|var| assignment.is_true(var))
                });
                let cell = held.next();
                if held.next().is_some() {
                    return Err(ReportError::DoubleBooked {
                        employee: emp.name.clone(),
                        day,
                        shift,
                    });
                }
                cells.push(cell);
            }
        }

        let total = cells.iter().filter(|c| c.is_some()).count() as u32;
        let bound = assignment.value(roster.layout.total_shifts[employee]);
        if i64::from(total) != bound {
            return Err(ReportError::TotalMismatch {
                employee: emp.name.clone(),
                decoded: total,
                bound,
            });
        }

        rows.push(RosterRow {
            employee: emp.name.clone(),
            cells,
            total,
        });
    }

    let spread = roster.model.objective().map(|o| o.evaluate(assignment));

    Ok(RosterReport::Scheduled(Roster {
        days: catalog.days.clone(),
        shifts: catalog.shifts.clone(),
        rows,
        spread,
        optimal,
    }))
}

impl fmt::Display for RosterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterReport::Scheduled(roster) => write_table(f, roster),
            RosterReport::Infeasible => {
                writeln!(f, "No feasible schedule: the rules cannot all hold at once.")
            }
            RosterReport::SolverFailed(reason) => writeln!(f, "Solver failed: {reason}"),
        }
    }
}

/// Writes the fixed-width roster table.
fn write_table(f: &mut fmt::Formatter<'_>, roster: &Roster) -> fmt::Result {
    let name_width = roster
        .rows
        .iter()
        .map(|r| r.employee.chars().count())
        .max()
        .unwrap_or(0)
        .max(NAME_WIDTH);
    let per_day = roster.shifts.len();
    // Each shift cell is one character plus " | " between cells
    let day_width = (4 * per_day).saturating_sub(3).max(1);
    let blank = " ".repeat(name_width);

    let day_headers: Vec<String> = roster
        .days
        .iter()
        .map(|d| {
            let name: String = d.as_str().chars().take(day_width).collect();
            format!("{name:^day_width$}")
        })
        .collect();
    writeln!(f, "{blank} | {} | Total |", day_headers.join(" | "))?;

    let slots: Vec<String> = roster.shifts.iter().map(|s| s.letter().to_string()).collect();
    let slot_header = vec![slots.join(" | "); roster.days.len()];
    writeln!(f, "{blank} | {} |       |", slot_header.join(" | "))?;

    for row in &roster.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|c| c.map_or(' ', Role::letter).to_string())
            .collect();
        writeln!(
            f,
            "{:<name_width$} | {} | {:^5} |",
            row.employee,
            cells.join(" | "),
            row.total
        )?;
    }

    if let Some(spread) = roster.spread {
        let proof = if roster.optimal { "optimal" } else { "not proven optimal" };
        writeln!(f, "\nWorkload spread (max - min shifts): {spread} ({proof})")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{self, RosterModel};
    use crate::demo_data::{self, DemoData};
    use crate::model::Assignment;

    fn standard() -> (RosterModel, Assignment) {
        let roster = constraints::build(&demo_data::generate(DemoData::Small)).unwrap();
        let cells = demo_data::reference_cells(&roster.catalog);
        let assignment = roster.assignment_from_cells(&cells);
        (roster, assignment)
    }

    #[test]
    fn test_decode_reference_roster() {
        let (roster, assignment) = standard();
        let report = decode(&roster, &SolveOutcome::Optimal(assignment.clone())).unwrap();
        let decoded = report.roster().expect("scheduled");

        assert_eq!(report.status(), "OPTIMAL");
        assert_eq!(decoded.rows.len(), 4);
        assert_eq!(decoded.total("Phil"), Some(4));
        assert_eq!(decoded.total("Emma"), Some(6));
        assert_eq!(decoded.total("David"), Some(9));
        assert_eq!(decoded.total("Rebecca"), Some(9));
        assert_eq!(decoded.spread, Some(3));
        assert_eq!(
            decoded.cell("Phil", Day::Monday, ShiftSlot::Evening),
            Some(Role::Restocker)
        );
        assert_eq!(decoded.cell("Phil", Day::Monday, ShiftSlot::Morning), None);
        assert_eq!(decoded.assignments().len(), 28);
    }

    #[test]
    fn test_totals_match_solver_bound_values() {
        let (roster, assignment) = standard();
        let report = decode(&roster, &SolveOutcome::Feasible(assignment.clone())).unwrap();
        let decoded = report.roster().unwrap();
        for (e, row) in decoded.rows.iter().enumerate() {
            let bound = assignment.value(roster.layout.total_shifts[e]);
            assert_eq!(i64::from(row.total), bound, "{}", row.employee);
        }
        assert_eq!(report.status(), "FEASIBLE");
    }

    #[test]
    fn test_total_mismatch_is_an_error() {
        let (roster, mut assignment) = standard();
        assignment.set(roster.layout.total_shifts[0], 5);
        let err = decode(&roster, &SolveOutcome::Optimal(assignment)).unwrap_err();
        assert_eq!(
            err,
            ReportError::TotalMismatch {
                employee: "Phil".into(),
                decoded: 4,
                bound: 5,
            }
        );
    }

    #[test]
    fn test_double_booking_is_an_error() {
        let (roster, mut assignment) = standard();
        let david = roster.catalog.employee_index("David").unwrap();
        let restock = AssignmentKey {
            employee: david,
            role: Role::Restocker,
            day: Day::Monday,
            shift: ShiftSlot::Morning,
        };
        assignment.set(roster.layout.schedule(&restock).unwrap(), 1);
        let err = decode(&roster, &SolveOutcome::Optimal(assignment)).unwrap_err();
        assert!(matches!(err, ReportError::DoubleBooked { day: Day::Monday, .. }));
    }

    #[test]
    fn test_wrong_assignment_size() {
        let (roster, _) = standard();
        let err = decode(&roster, &SolveOutcome::Optimal(Assignment::new(vec![0; 3]))).unwrap_err();
        assert!(matches!(err, ReportError::AssignmentSize { actual: 3, .. }));
    }

    #[test]
    fn test_infeasible_renders_without_table() {
        let (roster, _) = standard();
        let report = decode(&roster, &SolveOutcome::Infeasible).unwrap();
        assert_eq!(report, RosterReport::Infeasible);
        let text = report.to_string();
        assert!(text.contains("No feasible schedule"));
        assert!(!text.contains('|'));
    }

    #[test]
    fn test_solver_failure_is_not_infeasible() {
        let (roster, _) = standard();
        let report = decode(&roster, &SolveOutcome::Failed("out of memory".into())).unwrap();
        assert_eq!(report.status(), "SOLVER_FAILED");
        assert!(report.to_string().contains("out of memory"));
        assert!(!report.to_string().contains("No feasible schedule"));
    }

    #[test]
    fn test_render_table_layout() {
        let (roster, assignment) = standard();
        let report = decode(&roster, &SolveOutcome::Optimal(assignment)).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("           |  Monday   |  Tuesday  | Wednesday |"));
        assert!(lines[0].ends_with("| Total |"));
        assert!(lines[1].contains("M | A | E | M | A | E"));
        assert!(lines[1].ends_with("|       |"));
        // Phil restocks Monday evening
        assert!(lines[2].starts_with("Phil       |   |   | R |"));
        assert!(lines[2].ends_with("|   4   |"));
        // All rows line up with the header
        let width = lines[0].chars().count();
        for line in &lines[1..6] {
            assert_eq!(line.chars().count(), width, "{line}");
        }
        assert!(text.contains("Workload spread (max - min shifts): 3 (optimal)"));
    }

    /// Accepts `room` bytes, then fails every write.
    struct Bounded {
        written: String,
        room: usize,
    }

    impl fmt::Write for Bounded {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            if self.written.len() + s.len() > self.room {
                return Err(fmt::Error);
            }
            self.written.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_table_write_error_surfaces() {
        use std::fmt::Write as _;

        let (roster, assignment) = standard();
        let report = decode(&roster, &SolveOutcome::Optimal(assignment)).unwrap();
        let full = report.to_string();

        // Fails partway through the employee rows
        let header = full.lines().take(2).map(|l| l.len() + 1).sum::<usize>();
        let mut sink = Bounded {
            written: String::new(),
            room: header + 10,
        };
        assert_eq!(write!(sink, "{report}"), Err(fmt::Error));
        assert!(sink.written.len() <= header + 10);
        assert!(full.starts_with(&sink.written));

        let mut sink = Bounded {
            written: String::new(),
            room: full.len(),
        };
        assert_eq!(write!(sink, "{report}"), Ok(()));
        assert_eq!(sink.written, full);
    }

    #[test]
    fn test_two_shift_table_lines_up() {
        let mut catalog = demo_data::generate(DemoData::Small);
        catalog.shifts = vec![ShiftSlot::Morning, ShiftSlot::Evening];
        let roster = Roster {
            days: catalog.days.clone(),
            shifts: catalog.shifts.clone(),
            rows: vec![RosterRow {
                employee: "Bartholomew".into(),
                cells: vec![None; catalog.days.len() * 2],
                total: 0,
            }],
            spread: None,
            optimal: false,
        };
        let text = RosterReport::Scheduled(roster).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        // Day names are cut to the five-column day width
        assert!(lines[0].starts_with("           | Monda | Tuesd |"));
        assert!(lines[1].contains("M | E | M | E"));
        assert!(lines[2].starts_with("Bartholomew |   |   |"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width), "{text}");
    }
}
