//! DTOs for catalog files and REST API requests/responses.
//!
//! Role, day and shift names travel as strings so an unknown name is
//! reported as a [`ConfigError`] naming it, not as an opaque parse failure.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constraints::AssignmentKey;
use crate::domain::{Blackout, Catalog, Day, Employee, EmployeeRules, Requirements, Role, ShiftSlot};
use crate::error::ConfigError;
use crate::report::{Roster, RosterReport};
use crate::solver::{SolveJob, SolverStatus};

fn parse_all<T>(names: &[String]) -> Result<Vec<T>, ConfigError>
where
    T: FromStr<Err = ConfigError>,
{
    names.iter().map(|n| n.parse()).collect()
}

fn names<T: ToString>(items: impl IntoIterator<Item = T>) -> Vec<String> {
    items.into_iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackoutDto {
    pub days: Vec<String>,
    /// Empty blocks every shift of the listed days.
    #[serde(default)]
    pub shifts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub name: String,
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_weekly_shifts: Option<u32>,
    #[serde(default)]
    pub blackouts: Vec<BlackoutDto>,
    #[serde(default)]
    pub never_with: Vec<String>,
}

impl From<&Employee> for EmployeeDto {
    fn from(e: &Employee) -> Self {
        Self {
            name: e.name.clone(),
            roles: names(&e.roles),
            exact_weekly_shifts: e.rules.exact_weekly_shifts,
            blackouts: e
                .rules
                .blackouts
                .iter()
                .map(|b| BlackoutDto {
                    days: names(&b.days),
                    shifts: names(&b.shifts),
                })
                .collect(),
            never_with: e.rules.never_with.clone(),
        }
    }
}

impl EmployeeDto {
    pub fn to_employee(&self) -> Result<Employee, ConfigError> {
        let blackouts = self
            .blackouts
            .iter()
            .map(|b| {
                Ok(Blackout {
                    days: parse_all::<Day>(&b.days)?.into_iter().collect(),
                    shifts: parse_all::<ShiftSlot>(&b.shifts)?.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Employee {
            name: self.name.clone(),
            roles: parse_all::<Role>(&self.roles)?.into_iter().collect(),
            rules: EmployeeRules {
                exact_weekly_shifts: self.exact_weekly_shifts,
                blackouts,
                never_with: self.never_with.clone(),
            },
        })
    }
}

/// A catalog as stored in JSON files and accepted by the API. Omitted lists
/// default to the full week, all shifts and all roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDto {
    pub employees: Vec<EmployeeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shifts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_cap: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend_shifts: Option<u32>,
}

impl From<&Catalog> for CatalogDto {
    fn from(catalog: &Catalog) -> Self {
        Self {
            employees: catalog.employees.iter().map(EmployeeDto::from).collect(),
            days: Some(names(&catalog.days)),
            shifts: Some(names(&catalog.shifts)),
            roles: Some(names(&catalog.roles)),
            weekly_cap: Some(catalog.requirements.weekly_cap),
            weekend_shifts: Some(catalog.requirements.weekend_shifts),
        }
    }
}

impl CatalogDto {
    /// Parses names and validates the result.
    pub fn to_catalog(&self) -> Result<Catalog, ConfigError> {
        let employees = self
            .employees
            .iter()
            .map(EmployeeDto::to_employee)
            .collect::<Result<Vec<_>, _>>()?;

        let defaults = Requirements::default();
        let mut catalog = Catalog::new(employees).with_requirements(Requirements {
            weekly_cap: self.weekly_cap.unwrap_or(defaults.weekly_cap),
            weekend_shifts: self.weekend_shifts.unwrap_or(defaults.weekend_shifts),
        });
        if let Some(days) = &self.days {
            catalog.days = parse_all(days)?;
        }
        if let Some(shifts) = &self.shifts {
            catalog.shifts = parse_all(shifts)?;
        }
        if let Some(roles) = &self.roles {
            catalog.roles = parse_all(roles)?;
        }

        catalog.validate()?;
        Ok(catalog)
    }
}

/// One worked cell of a roster, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDto {
    pub employee: String,
    pub role: String,
    pub day: String,
    pub shift: String,
}

impl CellDto {
    pub fn to_key(&self, catalog: &Catalog) -> Result<AssignmentKey, ConfigError> {
        Ok(AssignmentKey {
            employee: catalog
                .employee_index(&self.employee)
                .ok_or_else(|| ConfigError::UnknownEmployee(self.employee.clone()))?,
            role: self.role.parse()?,
            day: self.day.parse()?,
            shift: self.shift.parse()?,
        })
    }
}

/// Solving job as returned by `GET /schedules/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub id: String,
    pub solver_status: SolverStatus,
    /// `OPTIMAL`, `FEASIBLE`, `INFEASIBLE` or `SOLVER_FAILED` once finished.
    pub status: Option<&'static str>,
    pub roster: Option<Roster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
    pub catalog: CatalogDto,
}

impl ScheduleDto {
    pub fn from_job(job: &SolveJob) -> Self {
        let failure = match &job.report {
            Some(RosterReport::SolverFailed(reason)) => Some(reason.clone()),
            _ => None,
        };
        Self {
            id: job.id.clone(),
            solver_status: job.status,
            status: job.report.as_ref().map(RosterReport::status),
            roster: job.report.as_ref().and_then(RosterReport::roster).cloned(),
            failure,
            error: job.error.clone(),
            duration_ms: job.duration.map(|d| d.as_millis() as u64),
            catalog: CatalogDto::from(&job.catalog),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub solver_engine: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub solver_status: SolverStatus,
    pub status: Option<&'static str>,
    pub spread: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub catalog: CatalogDto,
    pub assignments: Vec<CellDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintAnalysisDto {
    pub name: &'static str,
    /// Instances emitted for this family.
    pub total: usize,
    pub violations: usize,
    /// Labels of the violated instances.
    pub matches: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub feasible: bool,
    pub spread: Option<i64>,
    pub constraints: Vec<ConstraintAnalysisDto>,
    /// Variables outside their bounds, by name.
    pub out_of_bounds: Vec<String>,
}
