//! Solver capability and solving service.
//!
//! The search itself is someone else's job: anything implementing [`Solver`]
//! takes a declarative [`Model`] and returns a terminal [`SolveOutcome`].
//! [`MilpSolver`] hands the model to `good_lp`; tests inject stubs.

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable as LpVariable,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::constraints::{self, RosterModel};
use crate::domain::Catalog;
use crate::error::{ReportError, RosterError};
use crate::model::{Assignment, Comparison, ConstraintKind, LinearExpr, Model, VarId};
use crate::report::{self, RosterReport};

/// Terminal result of one solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Every constraint holds and the objective is proven minimal.
    Optimal(Assignment),
    /// Every constraint holds; optimality was not proven.
    Feasible(Assignment),
    /// No assignment satisfies the model.
    Infeasible,
    /// The solver itself failed. Not a statement about the model.
    Failed(String),
}

impl SolveOutcome {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            SolveOutcome::Optimal(a) | SolveOutcome::Feasible(a) => Some(a),
            SolveOutcome::Infeasible | SolveOutcome::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SolveOutcome::Optimal(_) => "optimal",
            SolveOutcome::Feasible(_) => "feasible",
            SolveOutcome::Infeasible => "infeasible",
            SolveOutcome::Failed(_) => "failed",
        }
    }
}

/// A capability that solves declarative models.
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per model; must return a terminal outcome.
    fn solve(&self, model: &Model) -> SolveOutcome;
}

/// Mixed-integer solver backed by `good_lp` and its pure-Rust `microlp`
/// backend.
///
/// Min/max equalities are linearised with one indicator binary per operand:
/// `t <= x_i` for all `i`, `t >= x_i - M(1 - z_i)`, `sum(z) == 1` (mirrored
/// for max), with `M` the width of the joint variable range.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl Solver for MilpSolver {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(&self, model: &Model) -> SolveOutcome {
        // Term-less constraints are decided here; the backend never sees them.
        for c in model.constraints() {
            match &c.kind {
                ConstraintKind::Linear { expr, cmp, rhs } if expr.is_constant() => {
                    if !cmp.holds(expr.constant, *rhs) {
                        info!(group = c.group, label = %c.label, "Constant constraint cannot hold");
                        return SolveOutcome::Infeasible;
                    }
                }
                ConstraintKind::MinEquality { operands, .. }
                | ConstraintKind::MaxEquality { operands, .. }
                    if operands.is_empty() =>
                {
                    return SolveOutcome::Failed(format!("`{}` bounds an empty set", c.label));
                }
                _ => {}
            }
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<LpVariable> = model
            .variables()
            .map(|(_, v)| vars.add(variable().integer().min(v.min as f64).max(v.max as f64)))
            .collect();

        // Indicator binaries, keyed by constraint position.
        let mut indicators: HashMap<usize, Vec<LpVariable>> = HashMap::new();
        for (i, c) in model.constraints().iter().enumerate() {
            if let ConstraintKind::MinEquality { operands, .. } | ConstraintKind::MaxEquality { operands, .. } =
                &c.kind
            {
                let zs = operands.iter().map(|_| vars.add(variable().binary())).collect();
                indicators.insert(i, zs);
            }
        }

        let objective = model
            .objective()
            .map(|o| to_expression(o, &handles))
            .unwrap_or_else(|| Expression::from(0.0));
        let mut problem = vars.minimise(objective).using(default_solver);

        for (i, c) in model.constraints().iter().enumerate() {
            match &c.kind {
                ConstraintKind::Linear { expr, .. } if expr.is_constant() => {}
                ConstraintKind::Linear { expr, cmp, rhs } => {
                    let lhs = to_expression(expr, &handles);
                    let rhs = *rhs as f64;
                    problem = match cmp {
                        Comparison::Eq => problem.with(constraint!(lhs == rhs)),
                        Comparison::Le => problem.with(constraint!(lhs <= rhs)),
                        Comparison::Ge => problem.with(constraint!(lhs >= rhs)),
                    };
                }
                ConstraintKind::MinEquality { target, operands } | ConstraintKind::MaxEquality { target, operands } => {
                    let is_min = matches!(c.kind, ConstraintKind::MinEquality { .. });
                    let big_m = big_m(model, *target, operands);
                    let t = handles[target.index()];
                    let zs = &indicators[&i];

                    for (operand, z) in operands.iter().zip(zs) {
                        let x = handles[operand.index()];
                        // t bounds every x and meets the one its indicator picks
                        let slack = Expression::from(0.0) + x + big_m - big_m * *z;
                        let tight = Expression::from(0.0) + x - big_m + big_m * *z;
                        problem = if is_min {
                            problem.with(constraint!(t <= x)).with(constraint!(t >= tight))
                        } else {
                            problem.with(constraint!(t >= x)).with(constraint!(t <= slack))
                        };
                    }
                    let picked = zs.iter().fold(Expression::from(0.0), |acc, z| acc + *z);
                    problem = problem.with(constraint!(picked == 1.0));
                }
            }
        }

        match problem.solve() {
            Ok(solution) => {
                let values = handles.iter().map(|v| solution.value(*v).round() as i64).collect();
                SolveOutcome::Optimal(Assignment::new(values))
            }
            Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
            Err(e) => {
                warn!(error = %e, "Solver failed");
                SolveOutcome::Failed(e.to_string())
            }
        }
    }
}

fn to_expression(expr: &LinearExpr, handles: &[LpVariable]) -> Expression {
    expr.terms
        .iter()
        .fold(Expression::from(expr.constant as f64), |acc, (var, coefficient)| {
            acc + (*coefficient as f64) * handles[var.index()]
        })
}

fn big_m(model: &Model, target: VarId, operands: &[VarId]) -> f64 {
    let bounds = std::iter::once(target)
        .chain(operands.iter().copied())
        .map(|v| model.variable(v));
    let (lo, hi) = bounds.fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v.min), hi.max(v.max)));
    (hi - lo).max(0) as f64
}

/// Builds the model for `catalog`, solves it once and decodes the outcome.
pub fn solve_roster(catalog: &Catalog, solver: &dyn Solver) -> Result<RosterReport, RosterError> {
    let roster = constraints::build(catalog)?;
    Ok(solve_model(&roster, solver)?)
}

/// Solves an already built roster model once and decodes the outcome.
pub fn solve_model(roster: &RosterModel, solver: &dyn Solver) -> Result<RosterReport, ReportError> {
    let start = Instant::now();
    let outcome = solver.solve(&roster.model);
    let elapsed = start.elapsed();

    info!(
        solver = solver.name(),
        outcome = outcome.label(),
        duration_ms = elapsed.as_millis() as u64,
        "Solving complete"
    );

    report::decode(roster, &outcome)
}

// ============================================================================
// Solving jobs
// ============================================================================

/// Status of a solving job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    NotSolving,
    Solving,
}


/// A solving job with its catalog and, once finished, its report.
#[derive(Debug)]
pub struct SolveJob {
    pub id: String,
    pub status: SolverStatus,
    pub catalog: Catalog,
    pub report: Option<RosterReport>,
    /// Set when the solution could not be decoded.
    pub error: Option<String>,
    pub duration: Option<Duration>,
}

impl SolveJob {
    pub fn new(id: String, catalog: Catalog) -> Self {
        Self {
            id,
            status: SolverStatus::NotSolving,
            catalog,
            report: None,
            error: None,
            duration: None,
        }
    }
}

/// Keeps roster jobs and runs them on the blocking pool.
pub struct SolverService {
    solver: Arc<dyn Solver>,
    jobs: RwLock<HashMap<String, Arc<RwLock<SolveJob>>>>,
}

impl SolverService {
    /// Service backed by [`MilpSolver`].
    pub fn new() -> Self {
        Self::with_solver(Arc::new(MilpSolver))
    }

    pub fn with_solver(solver: Arc<dyn Solver>) -> Self {
        Self {
            solver,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn create_job(&self, id: String, catalog: Catalog) -> Arc<RwLock<SolveJob>> {
        let job = Arc::new(RwLock::new(SolveJob::new(id.clone(), catalog)));
        self.jobs.write().insert(id, job.clone());
        job
    }

    pub fn get_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.read().get(id).cloned()
    }

    pub fn list_jobs(&self) -> Vec<String> {
        self.jobs.read().keys().cloned().collect()
    }

    pub fn remove_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.write().remove(id)
    }

    /// Starts solving a job in the background. Must run inside a tokio
    /// runtime.
    pub fn start_solving(&self, job: Arc<RwLock<SolveJob>>) {
        job.write().status = SolverStatus::Solving;
        let solver = self.solver.clone();
        tokio::task::spawn_blocking(move || solve_blocking(job, solver));
    }
}

impl Default for SolverService {
    fn default() -> Self {
        Self::new()
    }
}

fn solve_blocking(job: Arc<RwLock<SolveJob>>, solver: Arc<dyn Solver>) {
    let (job_id, catalog) = {
        let guard = job.read();
        (guard.id.clone(), guard.catalog.clone())
    };
    info!(job_id = %job_id, employees = catalog.employees.len(), "Solving started");

    let start = Instant::now();
    let result = solve_roster(&catalog, solver.as_ref());
    let elapsed = start.elapsed();

    #[cfg(feature = "console")]
    {
        if let Ok(report) = &result {
            crate::console::print_solving_ended(elapsed, report);
        }
    }

    let mut guard = job.write();
    match result {
        Ok(report) => guard.report = Some(report),
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Solving produced no roster");
            guard.error = Some(e.to_string());
        }
    }
    guard.duration = Some(elapsed);
    guard.status = SolverStatus::NotSolving;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data::{self, DemoData};

    struct CannedSolver(SolveOutcome);

    impl Solver for CannedSolver {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn solve(&self, _model: &Model) -> SolveOutcome {
            self.0.clone()
        }
    }

    #[test]
    fn test_milp_solves_small_model() {
        let mut model = Model::new();
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let c = model.new_bool_var("c");
        model.add_linear("pick", "two of three", LinearExpr::sum([a, b, c]), Comparison::Eq, 2);
        model.add_linear("ban", "not a", LinearExpr::sum([a]), Comparison::Eq, 0);

        let outcome = MilpSolver.solve(&model);
        let assignment = outcome.assignment().expect("feasible");
        assert!(model.evaluate(assignment).is_feasible());
        assert_eq!(assignment.value(a), 0);
        assert_eq!(assignment.value(b), 1);
        assert_eq!(assignment.value(c), 1);
    }

    #[test]
    fn test_milp_min_max_are_exact() {
        // x0 in [2, 2], x1 in [5, 5], x2 in [3, 3]
        let mut model = Model::new();
        let xs: Vec<VarId> = [2, 5, 3]
            .iter()
            .enumerate()
            .map(|(i, v)| model.new_int_var(*v, *v, format!("x{i}")))
            .collect();
        let lo = model.new_int_var(0, 10, "lo");
        let hi = model.new_int_var(0, 10, "hi");
        model.add_min_equality("bounds", "lo", lo, xs.clone());
        model.add_max_equality("bounds", "hi", hi, xs);
        // Pull lo up and hi down; only the equalities hold them
        model.minimize(LinearExpr::new().with_term(hi, 1).with_term(lo, -1));

        let outcome = MilpSolver.solve(&model);
        let assignment = outcome.assignment().expect("feasible");
        assert_eq!(assignment.value(lo), 2);
        assert_eq!(assignment.value(hi), 5);
        assert!(model.evaluate(assignment).is_feasible());
    }

    #[test]
    fn test_milp_reports_infeasible() {
        let mut model = Model::new();
        let a = model.new_bool_var("a");
        model.add_linear("need", "a == 1", LinearExpr::sum([a]), Comparison::Eq, 1);
        model.add_linear("ban", "a == 0", LinearExpr::sum([a]), Comparison::Eq, 0);
        assert_eq!(MilpSolver.solve(&model), SolveOutcome::Infeasible);
    }

    #[test]
    fn test_constant_constraint_is_infeasible() {
        let mut model = Model::new();
        model.new_bool_var("a");
        model.add_linear("cover", "nobody", LinearExpr::new(), Comparison::Eq, 1);
        assert_eq!(MilpSolver.solve(&model), SolveOutcome::Infeasible);
    }

    #[test]
    fn test_solve_roster_with_canned_infeasible() {
        let catalog = demo_data::generate(DemoData::Small);
        let report = solve_roster(&catalog, &CannedSolver(SolveOutcome::Infeasible)).unwrap();
        assert!(matches!(report, RosterReport::Infeasible));
    }

    #[test]
    fn test_solve_roster_keeps_failure_distinct() {
        let catalog = demo_data::generate(DemoData::Small);
        let solver = CannedSolver(SolveOutcome::Failed("timeout".into()));
        let report = solve_roster(&catalog, &solver).unwrap();
        assert_eq!(report, RosterReport::SolverFailed("timeout".into()));
    }

    #[test]
    fn test_solve_roster_rejects_bad_catalog() {
        let mut catalog = demo_data::generate(DemoData::Small);
        catalog.employees.clear();
        let err = solve_roster(&catalog, &CannedSolver(SolveOutcome::Infeasible)).unwrap_err();
        assert!(matches!(err, RosterError::Config(_)));
    }

    #[test]
    fn test_service_job_lifecycle() {
        let service = SolverService::with_solver(Arc::new(CannedSolver(SolveOutcome::Infeasible)));
        let job = service.create_job("job-1".into(), demo_data::generate(DemoData::Small));
        assert_eq!(job.read().status, SolverStatus::NotSolving);
        assert_eq!(service.list_jobs(), vec!["job-1".to_string()]);

        solve_blocking(job.clone(), Arc::new(CannedSolver(SolveOutcome::Infeasible)));
        assert_eq!(job.read().report, Some(RosterReport::Infeasible));
        assert!(job.read().duration.is_some());

        assert!(service.remove_job("job-1").is_some());
        assert!(service.get_job("job-1").is_none());
    }
}
