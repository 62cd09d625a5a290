//! Demo catalogs for the shift roster.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{Blackout, Catalog, Day, Employee, Requirements, Role, ShiftSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Generates a demo catalog.
pub fn generate(demo: DemoData) -> Catalog {
    match demo {
        DemoData::Small => store_staff(),
        DemoData::Large => generate_large(),
    }
}

/// The four-person store: Phil only restocks, works four evenings or
/// weekend shifts and never overlaps with Emma, who is off Monday to
/// Wednesday.
fn store_staff() -> Catalog {
    Catalog::new(vec![
        Employee::new("Phil")
            .with_roles([Role::Restocker])
            .with_exact_weekly_shifts(4)
            .with_blackout(Blackout::shifts(
                Day::WEEKDAYS,
                [ShiftSlot::Morning, ShiftSlot::Afternoon],
            ))
            .never_with("Emma"),
        Employee::new("Emma")
            .with_roles([Role::Cashier, Role::Restocker])
            .with_blackout(Blackout::days([Day::Monday, Day::Tuesday, Day::Wednesday])),
        Employee::new("David").with_roles([Role::Cashier, Role::Restocker]),
        Employee::new("Rebecca").with_roles([Role::Cashier]),
    ])
}

const LARGE_EMPLOYEE_COUNT: usize = 8;

/// Eight people with random qualifications and the odd day off. Each works
/// one weekend shift so the eight weekend slots are shared evenly.
fn generate_large() -> Catalog {
    let mut rng = StdRng::seed_from_u64(0);
    let names = generate_names(&mut rng);

    let employees = names
        .into_iter()
        .take(LARGE_EMPLOYEE_COUNT)
        .map(|name| {
            let roles: Vec<Role> = match rng.gen_range(0..4) {
                0 => vec![Role::Restocker],
                1 => vec![Role::Cashier],
                _ => Role::ALL.to_vec(),
            };
            let mut employee = Employee::new(name).with_roles(roles);
            if rng.gen_bool(0.3) {
                if let Some(day) = Day::WEEKDAYS.choose(&mut rng) {
                    employee = employee.with_blackout(Blackout::days([*day]));
                }
            }
            employee
        })
        .collect();

    Catalog::new(employees).with_requirements(Requirements {
        weekly_cap: 10,
        weekend_shifts: 1,
    })
}

const FIRST_NAMES: &[&str] = &[
    "Amy", "Beth", "Carl", "Dan", "Elsa", "Flo", "Gus", "Hugo", "Ivy", "Jay",
];
const LAST_NAMES: &[&str] = &[
    "Cole", "Fox", "Green", "Jones", "King", "Li", "Poe", "Rye", "Smith", "Watt",
];

fn generate_names(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

/// A hand-checked optimal roster for the SMALL catalog (spread 3).
#[cfg(test)]
pub(crate) fn reference_cells(catalog: &Catalog) -> Vec<crate::constraints::AssignmentKey> {
    use crate::constraints::AssignmentKey;
    use Day::*;
    use Role::*;
    use ShiftSlot::*;

    let cells = [
        ("Phil", Restocker, Monday, Evening),
        ("Phil", Restocker, Wednesday, Evening),
        ("Phil", Restocker, Saturday, Afternoon),
        ("Phil", Restocker, Sunday, Afternoon),
        ("Emma", Cashier, Thursday, Morning),
        ("Emma", Cashier, Thursday, Afternoon),
        ("Emma", Cashier, Friday, Afternoon),
        ("Emma", Cashier, Friday, Evening),
        ("Emma", Cashier, Saturday, Morning),
        ("Emma", Cashier, Sunday, Morning),
        ("David", Cashier, Monday, Morning),
        ("David", Cashier, Tuesday, Evening),
        ("David", Restocker, Tuesday, Afternoon),
        ("David", Cashier, Wednesday, Morning),
        ("David", Cashier, Wednesday, Afternoon),
        ("David", Restocker, Thursday, Evening),
        ("David", Restocker, Friday, Afternoon),
        ("David", Cashier, Saturday, Afternoon),
        ("David", Cashier, Sunday, Afternoon),
        ("Rebecca", Cashier, Monday, Afternoon),
        ("Rebecca", Cashier, Monday, Evening),
        ("Rebecca", Cashier, Tuesday, Morning),
        ("Rebecca", Cashier, Tuesday, Afternoon),
        ("Rebecca", Cashier, Wednesday, Evening),
        ("Rebecca", Cashier, Thursday, Evening),
        ("Rebecca", Cashier, Friday, Morning),
        ("Rebecca", Cashier, Saturday, Evening),
        ("Rebecca", Cashier, Sunday, Evening),
    ];

    cells
        .into_iter()
        .map(|(name, role, day, shift)| AssignmentKey {
            employee: catalog.employee_index(name).unwrap(),
            role,
            day,
            shift,
        })
        .collect()
}
