//! Domain catalog for the weekly shift roster.
//!
//! Everything here is static configuration: who can work, which roles exist,
//! and how the week is sliced. Business rules that used to be bound to
//! specific people are carried as [`EmployeeRules`] on each employee.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default upper bound on shifts per employee per week.
pub const DEFAULT_WEEKLY_CAP: u32 = 10;

/// Default number of weekend shifts every employee works.
pub const DEFAULT_WEEKEND_SHIFTS: u32 = 2;

/// A role an employee can perform during a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Cashier,
    Restocker,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Cashier, Role::Restocker];

    /// Single-letter code used in the report grid.
    pub fn letter(self) -> char {
        match self {
            Role::Cashier => 'C',
            Role::Restocker => 'R',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Cashier => "Cashier",
            Role::Restocker => "Restocker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cashier" | "c" => Ok(Role::Cashier),
            "restocker" | "r" => Ok(Role::Restocker),
            _ => Err(ConfigError::UnknownRole(s.to_string())),
        }
    }
}

/// A day of the scheduled week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub const WEEKDAYS: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn is_weekend(self) -> bool {
        matches!(self, Day::Saturday | Day::Sunday)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        Day::ALL[weekday.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ConfigError;

    /// Accepts anything chrono's weekday parser does ("Mon", "monday", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Weekday>()
            .map(Day::from)
            .map_err(|_| ConfigError::UnknownDay(s.to_string()))
    }
}

/// One of the three fixed time windows of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftSlot {
    Morning,
    Afternoon,
    Evening,
}

impl ShiftSlot {
    pub const ALL: [ShiftSlot; 3] = [ShiftSlot::Morning, ShiftSlot::Afternoon, ShiftSlot::Evening];

    pub fn letter(self) -> char {
        match self {
            ShiftSlot::Morning => 'M',
            ShiftSlot::Afternoon => 'A',
            ShiftSlot::Evening => 'E',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftSlot::Morning => "Morning",
            ShiftSlot::Afternoon => "Afternoon",
            ShiftSlot::Evening => "Evening",
        }
    }
}

impl fmt::Display for ShiftSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftSlot {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "m" => Ok(ShiftSlot::Morning),
            "afternoon" | "a" => Ok(ShiftSlot::Afternoon),
            "evening" | "e" => Ok(ShiftSlot::Evening),
            _ => Err(ConfigError::UnknownShift(s.to_string())),
        }
    }
}

/// Days and shifts during which an employee cannot be assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub days: BTreeSet<Day>,
    /// Empty means every shift of the listed days.
    pub shifts: BTreeSet<ShiftSlot>,
}

impl Blackout {
    /// Blocks whole days.
    pub fn days(days: impl IntoIterator<Item = Day>) -> Self {
        Self {
            days: days.into_iter().collect(),
            shifts: BTreeSet::new(),
        }
    }

    /// Blocks the given shifts on the given days.
    pub fn shifts(
        days: impl IntoIterator<Item = Day>,
        shifts: impl IntoIterator<Item = ShiftSlot>,
    ) -> Self {
        Self {
            days: days.into_iter().collect(),
            shifts: shifts.into_iter().collect(),
        }
    }

    pub fn covers(&self, day: Day, shift: ShiftSlot) -> bool {
        self.days.contains(&day) && (self.shifts.is_empty() || self.shifts.contains(&shift))
    }
}

/// Per-employee policy rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRules {
    /// Exact number of shifts to work this week. Employees with a fixed
    /// count are left out of fairness balancing.
    pub exact_weekly_shifts: Option<u32>,
    pub blackouts: Vec<Blackout>,
    /// Names of employees never to share a shift with.
    pub never_with: Vec<String>,
}

/// An employee who can be assigned to shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub roles: BTreeSet<Role>,
    pub rules: EmployeeRules,
}

impl Employee {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: BTreeSet::new(),
            rules: EmployeeRules::default(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_exact_weekly_shifts(mut self, count: u32) -> Self {
        self.rules.exact_weekly_shifts = Some(count);
        self
    }

    pub fn with_blackout(mut self, blackout: Blackout) -> Self {
        self.rules.blackouts.push(blackout);
        self
    }

    pub fn never_with(mut self, partner: impl Into<String>) -> Self {
        self.rules.never_with.push(partner.into());
        self
    }

    pub fn is_qualified(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_fairness_exempt(&self) -> bool {
        self.rules.exact_weekly_shifts.is_some()
    }
}

/// Week-level staffing requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub weekly_cap: u32,
    pub weekend_shifts: u32,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            weekly_cap: DEFAULT_WEEKLY_CAP,
            weekend_shifts: DEFAULT_WEEKEND_SHIFTS,
        }
    }
}

/// The complete, ordered description of one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub employees: Vec<Employee>,
    pub days: Vec<Day>,
    pub shifts: Vec<ShiftSlot>,
    pub roles: Vec<Role>,
    pub requirements: Requirements,
}

impl Catalog {
    /// A full week with every shift and role.
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            employees,
            days: Day::ALL.to_vec(),
            shifts: ShiftSlot::ALL.to_vec(),
            roles: Role::ALL.to_vec(),
            requirements: Requirements::default(),
        }
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn employee_index(&self, name: &str) -> Option<usize> {
        self.employees.iter().position(|e| e.name == name)
    }

    /// Indices of the employees whose totals are balanced by the objective.
    pub fn fairness_pool(&self) -> Vec<usize> {
        self.employees
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_fairness_exempt())
            .map(|(i, _)| i)
            .collect()
    }

    /// Unordered employee pairs that must never share a shift, each listed
    /// once with the lower index first. Unknown partners are skipped.
    pub fn exclusive_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for (i, employee) in self.employees.iter().enumerate() {
            for partner in &employee.rules.never_with {
                if let Some(j) = self.employee_index(partner) {
                    if i != j {
                        pairs.insert((i.min(j), i.max(j)));
                    }
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Checks the catalog is well formed. Must pass before a model is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.employees.is_empty() {
            return Err(ConfigError::EmptyList("employees"));
        }
        if self.days.is_empty() {
            return Err(ConfigError::EmptyList("days"));
        }
        if self.shifts.is_empty() {
            return Err(ConfigError::EmptyList("shifts"));
        }
        if self.roles.is_empty() {
            return Err(ConfigError::EmptyList("roles"));
        }

        // Strictly ascending also rules out duplicates.
        if let Some(w) = self.days.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConfigError::DayOrder(w[1]));
        }
        if let Some(w) = self.shifts.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConfigError::ShiftOrder(w[1]));
        }
        if let Some(w) = self.roles.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConfigError::RoleOrder(w[1]));
        }

        let mut seen = HashSet::new();
        for (position, employee) in self.employees.iter().enumerate() {
            if employee.name.trim().is_empty() {
                return Err(ConfigError::BlankEmployeeName(position));
            }
            if !seen.insert(employee.name.as_str()) {
                return Err(ConfigError::DuplicateEmployee(employee.name.clone()));
            }
        }

        for employee in &self.employees {
            self.validate_employee(employee)?;
        }
        Ok(())
    }

    fn validate_employee(&self, employee: &Employee) -> Result<(), ConfigError> {
        if let Some(role) = employee.roles.iter().find(|r| !self.roles.contains(r)) {
            return Err(ConfigError::RoleNotInCatalog {
                employee: employee.name.clone(),
                role: *role,
            });
        }

        let rules = &employee.rules;
        if let Some(count) = rules.exact_weekly_shifts {
            if count > self.requirements.weekly_cap {
                return Err(ConfigError::ExactCountAboveCap {
                    employee: employee.name.clone(),
                    count,
                    cap: self.requirements.weekly_cap,
                });
            }
        }

        for blackout in &rules.blackouts {
            if let Some(day) = blackout.days.iter().find(|d| !self.days.contains(d)) {
                return Err(ConfigError::BlackoutDayNotInCatalog {
                    employee: employee.name.clone(),
                    day: *day,
                });
            }
            if let Some(shift) = blackout.shifts.iter().find(|s| !self.shifts.contains(s)) {
                return Err(ConfigError::BlackoutShiftNotInCatalog {
                    employee: employee.name.clone(),
                    shift: *shift,
                });
            }
        }

        for partner in &rules.never_with {
            if *partner == employee.name {
                return Err(ConfigError::SelfExclusion(employee.name.clone()));
            }
            if self.employee_index(partner).is_none() {
                return Err(ConfigError::UnknownPartner {
                    employee: employee.name.clone(),
                    partner: partner.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff() -> Vec<Employee> {
        vec![
            Employee::new("Ann").with_roles([Role::Cashier]),
            Employee::new("Bob")
                .with_roles([Role::Cashier, Role::Restocker])
                .never_with("Ann"),
        ]
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = Catalog::new(staff());
        assert_eq!(catalog.validate(), Ok(()));
        assert_eq!(catalog.days.len(), 7);
        assert_eq!(catalog.shifts.len(), 3);
    }

    #[test]
    fn test_duplicate_employee_is_named() {
        let mut employees = staff();
        employees.push(Employee::new("Ann").with_roles([Role::Restocker]));
        let err = Catalog::new(employees).validate().unwrap_err();
        assert_eq!(err, ConfigError::DuplicateEmployee("Ann".into()));
        assert!(err.to_string().contains("Ann"));
    }

    #[test]
    fn test_empty_lists_rejected() {
        assert_eq!(
            Catalog::new(vec![]).validate(),
            Err(ConfigError::EmptyList("employees"))
        );

        let mut catalog = Catalog::new(staff());
        catalog.shifts.clear();
        assert_eq!(catalog.validate(), Err(ConfigError::EmptyList("shifts")));
    }

    #[test]
    fn test_day_order_enforced() {
        let mut catalog = Catalog::new(staff());
        catalog.days = vec![Day::Monday, Day::Wednesday, Day::Tuesday];
        assert_eq!(catalog.validate(), Err(ConfigError::DayOrder(Day::Tuesday)));

        catalog.days = vec![Day::Monday, Day::Monday];
        assert_eq!(catalog.validate(), Err(ConfigError::DayOrder(Day::Monday)));
    }

    #[test]
    fn test_role_outside_catalog() {
        let mut catalog = Catalog::new(staff());
        catalog.roles = vec![Role::Cashier];
        assert_eq!(
            catalog.validate(),
            Err(ConfigError::RoleNotInCatalog {
                employee: "Bob".into(),
                role: Role::Restocker,
            })
        );
    }

    #[test]
    fn test_unknown_and_self_partner() {
        let catalog = Catalog::new(vec![Employee::new("Ann").never_with("Zed")]);
        assert_eq!(
            catalog.validate(),
            Err(ConfigError::UnknownPartner {
                employee: "Ann".into(),
                partner: "Zed".into(),
            })
        );

        let catalog = Catalog::new(vec![Employee::new("Ann").never_with("Ann")]);
        assert_eq!(catalog.validate(), Err(ConfigError::SelfExclusion("Ann".into())));
    }

    #[test]
    fn test_exact_count_above_cap() {
        let catalog = Catalog::new(vec![Employee::new("Ann").with_exact_weekly_shifts(11)]);
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::ExactCountAboveCap { count: 11, cap: 10, .. })
        ));
    }

    #[test]
    fn test_blackout_outside_catalog() {
        let mut catalog = Catalog::new(vec![
            Employee::new("Ann").with_blackout(Blackout::days([Day::Sunday]))
        ]);
        catalog.days = Day::WEEKDAYS.to_vec();
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::BlackoutDayNotInCatalog { day: Day::Sunday, .. })
        ));
    }

    #[test]
    fn test_exclusive_pairs_deduplicated() {
        let mut employees = staff();
        employees[0] = employees[0].clone().never_with("Bob");
        let catalog = Catalog::new(employees);
        assert_eq!(catalog.exclusive_pairs(), vec![(0, 1)]);
    }

    #[test]
    fn test_fairness_pool_skips_exact_counts() {
        let mut employees = staff();
        employees.push(Employee::new("Cid").with_exact_weekly_shifts(4));
        let catalog = Catalog::new(employees);
        assert_eq!(catalog.fairness_pool(), vec![0, 1]);
    }

    #[test]
    fn test_blackout_covers() {
        let weekday_days = Blackout::shifts(Day::WEEKDAYS, [ShiftSlot::Morning, ShiftSlot::Afternoon]);
        assert!(weekday_days.covers(Day::Monday, ShiftSlot::Morning));
        assert!(!weekday_days.covers(Day::Monday, ShiftSlot::Evening));
        assert!(!weekday_days.covers(Day::Saturday, ShiftSlot::Morning));

        let whole = Blackout::days([Day::Tuesday]);
        assert!(whole.covers(Day::Tuesday, ShiftSlot::Evening));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Mon".parse::<Day>(), Ok(Day::Monday));
        assert_eq!("sunday".parse::<Day>(), Ok(Day::Sunday));
        assert!("Funday".parse::<Day>().is_err());
        assert_eq!("evening".parse::<ShiftSlot>(), Ok(ShiftSlot::Evening));
        assert_eq!("CASHIER".parse::<Role>(), Ok(Role::Cashier));
        assert_eq!(
            "Baker".parse::<Role>(),
            Err(ConfigError::UnknownRole("Baker".into()))
        );
    }
}
