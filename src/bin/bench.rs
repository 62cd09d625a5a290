//! Benchmark for model construction and a full MILP solve.
//!
//! Run with: cargo run --release --bin bench

use shift_roster::demo_data::{self, DemoData};
use shift_roster::solver::{self, MilpSolver};
use shift_roster::{constraints, model::Assignment};
use std::time::Instant;

const BUILD_ROUNDS: u32 = 200;

fn main() -> anyhow::Result<()> {
    for demo in [DemoData::Small, DemoData::Large] {
        let catalog = demo_data::generate(demo);

        println!("Benchmark: {} catalog", demo.as_str());
        println!("  Employees: {}", catalog.employees.len());

        // Build
        let build_start = Instant::now();
        let mut roster = constraints::build(&catalog)?;
        for _ in 1..BUILD_ROUNDS {
            roster = constraints::build(&catalog)?;
        }
        let per_build = build_start.elapsed() / BUILD_ROUNDS;
        println!(
            "  Model: {} variables, {} constraints, built in {:.2?}",
            roster.model.variable_count(),
            roster.model.constraint_count(),
            per_build
        );

        // Evaluate
        let zeroed = Assignment::zeroed(&roster.model);
        let eval_start = Instant::now();
        let violated = roster.model.evaluate(&zeroed).violated.len();
        println!("  Evaluate (all false): {} violated in {:.2?}", violated, eval_start.elapsed());

        // Solve
        let solve_start = Instant::now();
        let report = solver::solve_model(&roster, &MilpSolver)?;
        let spread = report
            .roster()
            .and_then(|r| r.spread)
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "  Solve: {} (spread {}) in {:.2?}",
            report.status(),
            spread,
            solve_start.elapsed()
        );
        println!();
    }
    Ok(())
}
