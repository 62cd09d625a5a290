//! Colorful console output for roster solves.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::constraints::RosterModel;
use crate::report::RosterReport;

/// Inner width of the summary box.
const BOX_WIDTH: usize = 56;

/// Banner printed when the binary starts.
pub fn print_banner() {
    let banner = r#"
  ____  _     _  __ _     ____           _
 / ___|| |__ (_)/ _| |_  |  _ \ ___  ___| |_ ___ _ __
 \___ \| '_ \| | |_| __| | |_) / _ \/ __| __/ _ \ '__|
  ___) | | | | |  _| |_  |  _ < (_) \__ \ ||  __/ |
 |____/|_| |_|_|_|  \__| |_| \_\___/|___/\__\___|_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Weekly Shift Roster".bright_cyan()
    );
}

/// Prints the size of a built model and its per-family constraint counts.
pub fn print_model(roster: &RosterModel) {
    println!(
        "{} {} {} Problem: employees ({}), variables ({}), constraints ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Model]".bright_cyan(),
        roster.catalog.employees.len().to_formatted_string(&Locale::en).bright_yellow(),
        roster.model.variable_count().to_formatted_string(&Locale::en).bright_yellow(),
        roster.model.constraint_count().to_formatted_string(&Locale::en).bright_yellow()
    );
    for (family, count) in roster.family_counts() {
        if count == 0 {
            continue;
        }
        println!(
            "    {} {:<24} {:>6}",
            "→".bright_blue(),
            family.name().white(),
            count.to_formatted_string(&Locale::en).bright_magenta()
        );
    }
}

/// Prints the solve summary box.
pub fn print_solving_ended(total_duration: Duration, report: &RosterReport) {
    println!(
        "{} {} {} Solving ended: time spent ({}), status ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        format_duration(total_duration).yellow(),
        report.status().white().bold()
    );

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(BOX_WIDTH + 2)).bright_cyan());

    let status_text = match report {
        RosterReport::Scheduled(r) if r.optimal => "✓ OPTIMAL ROSTER FOUND",
        RosterReport::Scheduled(_) => "✓ FEASIBLE ROSTER FOUND",
        RosterReport::Infeasible => "✗ INFEASIBLE (rules cannot all hold)",
        RosterReport::SolverFailed(_) => "✗ SOLVER FAILED",
    };
    let status_colored = if report.roster().is_some() {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let padding = BOX_WIDTH + 2 - status_text.chars().count();
    let left_pad = padding / 2;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(padding - left_pad),
        "║".bright_cyan()
    );

    println!("{}", format!("╠{}╣", "═".repeat(BOX_WIDTH + 2)).bright_cyan());

    if let Some(roster) = report.roster() {
        let spread = roster
            .spread
            .map_or_else(|| "n/a".to_string(), |s| s.to_string());
        print_box_row("Workload Spread:", &spread);
        print_box_row("Shifts Assigned:", &roster.assignments().len().to_string());
    }
    if let RosterReport::SolverFailed(reason) = report {
        let reason: String = reason.chars().take(36).collect();
        print_box_row("Reason:", &reason);
    }
    print_box_row("Solving Time:", &format!("{:.2}s", total_duration.as_secs_f64()));

    println!("{}", format!("╚{}╝", "═".repeat(BOX_WIDTH + 2)).bright_cyan());
    println!();
}

fn print_box_row(label: &str, value: &str) {
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        label,
        value,
        "║".bright_cyan()
    );
}

fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", total_ms / 60_000, (total_ms % 60_000) / 1000)
    }
}

/// Local wall-clock time for log-style lines.
fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
