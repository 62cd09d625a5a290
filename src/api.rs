//! REST API handlers for the shift roster.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::constraints;
use crate::demo_data::{self, DemoData};
use crate::dto::{
    AnalyzeRequest, AnalyzeResponse, CatalogDto, ConstraintAnalysisDto, HealthResponse,
    InfoResponse, ScheduleDto, StatusResponse,
};
use crate::error::ConfigError;
use crate::solver::{Solver, SolverService, SolverStatus};

/// Application state shared across handlers.
pub struct AppState {
    pub solver: SolverService,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            solver: SolverService::new(),
        }
    }

    /// State whose jobs run on `solver` instead of the MILP backend.
    pub fn with_solver(solver: Arc<dyn Solver>) -> Self {
        Self {
            solver: SolverService::with_solver(solver),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

type ApiError = (StatusCode, String);

fn bad_request(e: ConfigError) -> ApiError {
    warn!(error = %e, "Rejected catalog");
    (StatusCode::BAD_REQUEST, e.to_string())
}

/// Creates the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        .route("/schedules", post(create_schedule).get(list_schedules))
        .route("/schedules/analyze", put(analyze_schedule))
        .route("/schedules/{id}", get(get_schedule).delete(delete_schedule))
        .route("/schedules/{id}/status", get(get_schedule_status))
        .route("/schedules/{id}/report", get(get_schedule_report))
        .with_state(state)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

/// GET /info
async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Shift Roster",
        version: env!("CARGO_PKG_VERSION"),
        solver_engine: state.solver.solver_name(),
    })
}

/// GET /demo-data
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

/// GET /demo-data/{id}
async fn get_demo_data(Path(id): Path<String>) -> Result<Json<CatalogDto>, StatusCode> {
    match id.parse::<DemoData>() {
        Ok(demo) => Ok(Json(CatalogDto::from(&demo_data::generate(demo)))),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /schedules - validates the catalog, starts solving and returns the
/// job id as plain text.
async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<CatalogDto>,
) -> Result<String, ApiError> {
    let catalog = dto.to_catalog().map_err(bad_request)?;
    let id = uuid::Uuid::new_v4().to_string();
    info!(job_id = %id, employees = catalog.employees.len(), "Schedule submitted");

    let job = state.solver.create_job(id.clone(), catalog);
    state.solver.start_solving(job);
    Ok(id)
}

/// GET /schedules
async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.solver.list_jobs())
}

/// GET /schedules/{id}
async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleDto>, StatusCode> {
    let job = state.solver.get_job(&id).ok_or(StatusCode::NOT_FOUND)?;
    let guard = job.read();
    Ok(Json(ScheduleDto::from_job(&guard)))
}

/// GET /schedules/{id}/status
async fn get_schedule_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let job = state.solver.get_job(&id).ok_or(StatusCode::NOT_FOUND)?;
    let guard = job.read();
    Ok(Json(StatusResponse {
        solver_status: guard.status,
        status: guard.report.as_ref().map(|r| r.status()),
        spread: guard
            .report
            .as_ref()
            .and_then(|r| r.roster())
            .and_then(|r| r.spread),
    }))
}

/// GET /schedules/{id}/report - the rendered text table.
async fn get_schedule_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let job = state
        .solver
        .get_job(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("no schedule `{id}`")))?;
    let guard = job.read();

    if guard.status == SolverStatus::Solving {
        return Err((StatusCode::ACCEPTED, "Solving".to_string()));
    }
    if let Some(error) = &guard.error {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, error.clone()));
    }
    guard
        .report
        .as_ref()
        .map(|r| r.to_string())
        .ok_or((StatusCode::ACCEPTED, "Not started".to_string()))
}

/// DELETE /schedules/{id}
///
/// A solve in flight still runs to completion; its result is dropped.
async fn delete_schedule(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    match state.solver.remove_job(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// PUT /schedules/analyze - checks a supplied roster against the model for
/// its catalog and reports violations per constraint family.
async fn analyze_schedule(Json(request): Json<AnalyzeRequest>) -> Result<Json<AnalyzeResponse>, ApiError> {
    let catalog = request.catalog.to_catalog().map_err(bad_request)?;
    let roster = constraints::build(&catalog).map_err(bad_request)?;
    let cells = request
        .assignments
        .iter()
        .map(|cell| cell.to_key(&roster.catalog))
        .collect::<Result<Vec<_>, _>>()
        .map_err(bad_request)?;

    let assignment = roster.assignment_from_cells(&cells);
    let evaluation = roster.model.evaluate(&assignment);

    let mut violated: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for constraint in &evaluation.violated {
        violated
            .entry(constraint.group)
            .or_default()
            .push(constraint.label.clone());
    }

    let constraints = roster
        .family_counts()
        .into_iter()
        .filter(|(_, total)| *total > 0)
        .map(|(family, total)| {
            let matches = violated.remove(family.name()).unwrap_or_default();
            ConstraintAnalysisDto {
                name: family.name(),
                total,
                violations: matches.len(),
                matches,
            }
        })
        .collect();

    Ok(Json(AnalyzeResponse {
        feasible: evaluation.is_feasible(),
        spread: evaluation.objective,
        constraints,
        out_of_bounds: evaluation
            .out_of_bounds
            .iter()
            .map(|v| v.name.clone())
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::RosterModel;
    use crate::dto::CellDto;
    use crate::model::Model;
    use crate::solver::SolveOutcome;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Answers every model with the hand-checked SMALL roster.
    struct ReferenceSolver;

    impl ReferenceSolver {
        fn roster() -> RosterModel {
            constraints::build(&demo_data::generate(DemoData::Small)).unwrap()
        }
    }

    impl Solver for ReferenceSolver {
        fn name(&self) -> &'static str {
            "reference"
        }

        fn solve(&self, _model: &Model) -> SolveOutcome {
            let roster = Self::roster();
            let cells = demo_data::reference_cells(&roster.catalog);
            SolveOutcome::Optimal(roster.assignment_from_cells(&cells))
        }
    }

    fn app() -> Router {
        router(Arc::new(AppState::with_solver(Arc::new(ReferenceSolver))))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn small_catalog_json() -> String {
        serde_json::to_string(&CatalogDto::from(&demo_data::generate(DemoData::Small))).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_info() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"UP"}"#);

        let response = app()
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_string(response).await.contains(r#""solverEngine":"reference""#));
    }

    #[tokio::test]
    async fn test_demo_data_routes() {
        let response = app()
            .oneshot(Request::get("/demo-data/small").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let dto: CatalogDto = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(dto.employees.len(), 4);

        let response = app()
            .oneshot(Request::get("/demo-data/huge").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_catalog_is_bad_request() {
        let body = r#"{ "employees": [{ "name": "Ann", "roles": ["Baker"] }] }"#.to_string();
        let response = app()
            .oneshot(json_request("POST", "/schedules", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Baker"));
    }

    #[tokio::test]
    async fn test_schedule_lifecycle() {
        let app = app();
        let response = app
            .clone()
            .oneshot(json_request("POST", "/schedules", small_catalog_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_string(response).await;

        let mut status = String::new();
        for _ in 0..100 {
            let response = app
                .clone()
                .oneshot(
                    Request::get(format!("/schedules/{id}/status"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            status = body_string(response).await;
            if status.contains("NOT_SOLVING") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(status.contains(r#""status":"OPTIMAL""#), "{status}");
        assert!(status.contains(r#""spread":3"#), "{status}");

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/schedules/{id}/report"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_string(response).await;
        assert!(text.contains("M | A | E"));
        assert!(text.starts_with("           |  Monday"));

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/schedules/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::get(format!("/schedules/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_flags_violations() {
        let catalog = demo_data::generate(DemoData::Small);
        let request = serde_json::json!({
            "catalog": CatalogDto::from(&catalog),
            "assignments": [
                CellDto {
                    employee: "Rebecca".into(),
                    role: "Restocker".into(),
                    day: "Monday".into(),
                    shift: "Morning".into(),
                },
            ],
        });
        let response = app()
            .oneshot(json_request("PUT", "/schedules/analyze", request.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();

        assert_eq!(body["feasible"], false);
        let families = body["constraints"].as_array().unwrap();
        let lockout = families
            .iter()
            .find(|f| f["name"] == "Qualification lockout")
            .unwrap();
        assert_eq!(lockout["violations"], 1);
        assert_eq!(lockout["matches"][0], "Rebecca as Restocker on Monday Morning");
        let coverage = families.iter().find(|f| f["name"] == "Cashier coverage").unwrap();
        assert_eq!(coverage["violations"], 21);
    }

    #[tokio::test]
    async fn test_analyze_reference_roster_is_feasible() {
        let catalog = demo_data::generate(DemoData::Small);
        let cells: Vec<CellDto> = demo_data::reference_cells(&catalog)
            .into_iter()
            .map(|k| CellDto {
                employee: catalog.employees[k.employee].name.clone(),
                role: k.role.to_string(),
                day: k.day.to_string(),
                shift: k.shift.to_string(),
            })
            .collect();
        let request = serde_json::json!({
            "catalog": CatalogDto::from(&catalog),
            "assignments": cells,
        });
        let response = app()
            .oneshot(json_request("PUT", "/schedules/analyze", request.to_string()))
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["feasible"], true);
        assert_eq!(body["spread"], 3);
    }
}
