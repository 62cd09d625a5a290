//! Weekly shift roster.
//!
//! Builds a constraint model over (employee, role, day, shift) booleans from
//! a staff [`domain::Catalog`], hands it to an injected [`solver::Solver`]
//! and decodes the outcome into a fixed-width roster report.
//!
//! Fairness is the only objective: the spread between the most and least
//! loaded employees without a fixed weekly count is minimised.

pub mod api;
#[cfg(feature = "console")]
pub mod console;
pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod dto;
pub mod error;
pub mod model;
pub mod report;
pub mod solver;
