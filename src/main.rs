//! Shift Roster - CLI and Axum server
//!
//! Solve the built-in store catalog: `cargo run`
//! Serve the REST API: `cargo run -- serve`, then open http://localhost:7860

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shift_roster::api;
use shift_roster::constraints;
use shift_roster::demo_data::{self, DemoData};
use shift_roster::domain::Catalog;
use shift_roster::dto::CatalogDto;
use shift_roster::report::RosterReport;
use shift_roster::solver::{self, MilpSolver};

#[derive(Debug, Parser)]
#[command(name = "shift-roster", version, about = "Weekly shift roster solver")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve one catalog and print the roster (default)
    Solve(SolveArgs),
    /// Serve the REST API
    Serve {
        #[arg(long, default_value_t = 7860)]
        port: u16,
    },
}

#[derive(Debug, Default, Args)]
struct SolveArgs {
    /// JSON catalog file
    #[arg(long, conflicts_with = "demo")]
    catalog: Option<PathBuf>,
    /// Built-in catalog: SMALL or LARGE
    #[arg(long)]
    demo: Option<String>,
    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shift_roster=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        None => solve(SolveArgs::default()),
        Some(Command::Solve(args)) => solve(args),
        Some(Command::Serve { port }) => {
            tokio::runtime::Runtime::new()?.block_on(serve(port))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_catalog(args: &SolveArgs) -> anyhow::Result<Catalog> {
    if let Some(path) = &args.catalog {
        return read_catalog(path);
    }
    let demo = match &args.demo {
        Some(name) => name
            .parse::<DemoData>()
            .map_err(|_| anyhow!("unknown demo `{name}`, expected one of {:?}", demo_data::list_demo_data()))?,
        None => DemoData::Small,
    };
    Ok(demo_data::generate(demo))
}

fn read_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let dto: CatalogDto = serde_json::from_str(&text)
        .with_context(|| format!("parsing catalog {}", path.display()))?;
    Ok(dto.to_catalog()?)
}

fn solve(args: SolveArgs) -> anyhow::Result<ExitCode> {
    let catalog = load_catalog(&args)?;
    let roster = constraints::build(&catalog)?;

    #[cfg(feature = "console")]
    {
        if !args.json {
            shift_roster::console::print_banner();
            shift_roster::console::print_model(&roster);
        }
    }

    let start = std::time::Instant::now();
    let report = solver::solve_model(&roster, &MilpSolver)?;

    if args.json {
        let body = serde_json::json!({
            "status": report.status(),
            "roster": report.roster(),
            "failure": match &report {
                RosterReport::SolverFailed(reason) => Some(reason.as_str()),
                _ => None,
            },
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        #[cfg(feature = "console")]
        shift_roster::console::print_solving_ended(start.elapsed(), &report);
        print!("{report}");
    }
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Done");

    Ok(match report {
        RosterReport::Scheduled(_) => ExitCode::SUCCESS,
        RosterReport::Infeasible => ExitCode::from(2),
        RosterReport::SolverFailed(_) => ExitCode::FAILURE,
    })
}

async fn serve(port: u16) -> anyhow::Result<()> {
    #[cfg(feature = "console")]
    shift_roster::console::print_banner();

    let state = Arc::new(api::AppState::new());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state).layer(cors);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
