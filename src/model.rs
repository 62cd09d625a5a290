//! Solver-agnostic declarative model.
//!
//! A [`Model`] is a list of bounded integer variables, named constraints over
//! them and an optional objective to minimise. It knows nothing about
//! employees or shifts; the builder in [`crate::constraints`] produces one and
//! any [`crate::solver::Solver`] consumes it.

use serde::Serialize;
use std::fmt;

/// Handle to a variable inside one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A bounded integer variable. Booleans are integers in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

/// `sum(coefficient * variable) + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the given variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    pub fn with_term(mut self, var: VarId, coefficient: i64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, assignment: &Assignment) -> i64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * assignment.value(*var))
            .sum::<i64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    Eq,
    Le,
    Ge,
}

impl Comparison {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::Eq => "==",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `expr <cmp> rhs`
    Linear {
        expr: LinearExpr,
        cmp: Comparison,
        rhs: i64,
    },
    /// `target == min(operands)`
    MinEquality { target: VarId, operands: Vec<VarId> },
    /// `target == max(operands)`
    MaxEquality { target: VarId, operands: Vec<VarId> },
}

/// A named constraint. `group` ties instances of one rule together for
/// reporting; `label` names the tuple this instance was emitted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub group: &'static str,
    pub label: String,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        match &self.kind {
            ConstraintKind::Linear { expr, cmp, rhs } => cmp.holds(expr.evaluate(assignment), *rhs),
            ConstraintKind::MinEquality { target, operands } => operands
                .iter()
                .map(|v| assignment.value(*v))
                .min()
                .is_some_and(|m| m == assignment.value(*target)),
            ConstraintKind::MaxEquality { target, operands } => operands
                .iter()
                .map(|v| assignment.value(*v))
                .max()
                .is_some_and(|m| m == assignment.value(*target)),
        }
    }
}

/// One value per model variable, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<i64>,
}

impl Assignment {
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    /// All variables at zero.
    pub fn zeroed(model: &Model) -> Self {
        Self {
            values: vec![0; model.variable_count()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Missing values read as zero.
    pub fn value(&self, var: VarId) -> i64 {
        self.values.get(var.0).copied().unwrap_or(0)
    }

    pub fn set(&mut self, var: VarId, value: i64) {
        if let Some(slot) = self.values.get_mut(var.0) {
            *slot = value;
        }
    }

    pub fn is_true(&self, var: VarId) -> bool {
        self.value(var) != 0
    }
}

/// Result of checking an assignment against a model.
#[derive(Debug, Clone, Default)]
pub struct Evaluation<'m> {
    /// Constraints that do not hold.
    pub violated: Vec<&'m Constraint>,
    /// Variables whose value is outside their bounds.
    pub out_of_bounds: Vec<&'m Variable>,
    pub objective: Option<i64>,
}

impl Evaluation<'_> {
    pub fn is_feasible(&self) -> bool {
        self.violated.is_empty() && self.out_of_bounds.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Option<LinearExpr>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.new_int_var(0, 1, name)
    }

    pub fn new_int_var(&mut self, min: i64, max: i64, name: impl Into<String>) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            min,
            max,
        });
        id
    }

    pub fn add_linear(
        &mut self,
        group: &'static str,
        label: impl Into<String>,
        expr: LinearExpr,
        cmp: Comparison,
        rhs: i64,
    ) {
        self.constraints.push(Constraint {
            group,
            label: label.into(),
            kind: ConstraintKind::Linear { expr, cmp, rhs },
        });
    }

    pub fn add_min_equality(
        &mut self,
        group: &'static str,
        label: impl Into<String>,
        target: VarId,
        operands: Vec<VarId>,
    ) {
        self.constraints.push(Constraint {
            group,
            label: label.into(),
            kind: ConstraintKind::MinEquality { target, operands },
        });
    }

    pub fn add_max_equality(
        &mut self,
        group: &'static str,
        label: impl Into<String>,
        target: VarId,
        operands: Vec<VarId>,
    ) {
        self.constraints.push(Constraint {
            group,
            label: label.into(),
            kind: ConstraintKind::MaxEquality { target, operands },
        });
    }

    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = Some(objective);
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Checks every bound and constraint against `assignment`.
    pub fn evaluate(&self, assignment: &Assignment) -> Evaluation<'_> {
        let out_of_bounds = self
            .variables()
            .filter(|(id, v)| {
                let value = assignment.value(*id);
                value < v.min || value > v.max
            })
            .map(|(_, v)| v)
            .collect();
        let violated = self
            .constraints
            .iter()
            .filter(|c| !c.is_satisfied(assignment))
            .collect();

        Evaluation {
            violated,
            out_of_bounds,
            objective: self.objective.as_ref().map(|o| o.evaluate(assignment)),
        }
    }
}
