//! Error types for catalog validation and roster decoding.

use thiserror::Error;

use crate::domain::{Day, Role, ShiftSlot};

/// A malformed catalog, detected before any model is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("catalog has no {0}")]
    EmptyList(&'static str),
    #[error("duplicate employee `{0}`")]
    DuplicateEmployee(String),
    #[error("employee name must not be blank (position {0})")]
    BlankEmployeeName(usize),
    #[error("day {0} is duplicated or out of Monday..Sunday order")]
    DayOrder(Day),
    #[error("shift {0} is duplicated or out of Morning..Evening order")]
    ShiftOrder(ShiftSlot),
    #[error("role {0} is duplicated or out of order")]
    RoleOrder(Role),
    #[error("employee `{employee}` is qualified for {role}, which is not in the catalog roles")]
    RoleNotInCatalog { employee: String, role: Role },
    #[error("employee `{employee}` has a blackout on {day}, which is not a catalog day")]
    BlackoutDayNotInCatalog { employee: String, day: Day },
    #[error("employee `{employee}` has a blackout on {shift} shifts, which is not a catalog shift")]
    BlackoutShiftNotInCatalog { employee: String, shift: ShiftSlot },
    #[error("employee `{employee}` must never work with `{partner}`, who is not in the catalog")]
    UnknownPartner { employee: String, partner: String },
    #[error("employee `{0}` cannot be exclusive with themselves")]
    SelfExclusion(String),
    #[error("employee `{employee}` needs exactly {count} shifts, above the weekly cap of {cap}")]
    ExactCountAboveCap {
        employee: String,
        count: u32,
        cap: u32,
    },
    #[error("unknown employee `{0}`")]
    UnknownEmployee(String),
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("unknown day `{0}`")]
    UnknownDay(String),
    #[error("unknown shift `{0}`")]
    UnknownShift(String),
}

/// A solved assignment that does not decode into a consistent roster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("assignment has {actual} values, model has {expected} variables")]
    AssignmentSize { expected: usize, actual: usize },
    #[error("`{employee}` holds more than one role on {day} {shift}")]
    DoubleBooked {
        employee: String,
        day: Day,
        shift: ShiftSlot,
    },
    #[error("`{employee}` decodes to {decoded} shifts but the solver bound {bound}")]
    TotalMismatch {
        employee: String,
        decoded: u32,
        bound: i64,
    },
}

/// Anything that stops a roster from being produced, apart from the
/// solver's own terminal outcomes.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("invalid catalog: {0}")]
    Config(#[from] ConfigError),
    #[error("inconsistent solution: {0}")]
    Report(#[from] ReportError),
}
