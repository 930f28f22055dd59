//! The canonical optimization problem.
//!
//! An [`Instance`] is the neutral middle form the translators meet at:
//! variables, at most one objective, constraints with bound-derived row
//! kinds, a compressed coefficient matrix, and the nonlinear expression
//! trees keyed to the rows they belong to.

use crate::error::{OslinkError, OslinkResult};
use crate::expr::Expr;
use crate::matrix::SparseMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variable domain kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    /// Continuous variable
    Continuous,
    /// Binary variable
    Binary,
    /// General integer variable
    Integer,
    /// Semicontinuous variable (zero or within bounds)
    SemiContinuous,
    /// Semiinteger variable (zero or integral within bounds)
    SemiInteger,
}

impl VarKind {
    /// The single-letter document code for this kind.
    pub fn letter(&self) -> char {
        match self {
            VarKind::Continuous => 'C',
            VarKind::Binary => 'B',
            VarKind::Integer => 'I',
            VarKind::SemiContinuous => 'D',
            VarKind::SemiInteger => 'J',
        }
    }

    /// Parses a single-letter document code.
    pub fn from_letter(c: char) -> Option<VarKind> {
        match c {
            'C' => Some(VarKind::Continuous),
            'B' => Some(VarKind::Binary),
            'I' => Some(VarKind::Integer),
            'D' => Some(VarKind::SemiContinuous),
            'J' => Some(VarKind::SemiInteger),
            _ => None,
        }
    }

    /// Whether the kind restricts the variable to discrete values.
    pub fn is_discrete(&self) -> bool {
        matches!(self, VarKind::Binary | VarKind::Integer | VarKind::SemiInteger)
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarKind::Continuous => "continuous",
            VarKind::Binary => "binary",
            VarKind::Integer => "integer",
            VarKind::SemiContinuous => "semicontinuous",
            VarKind::SemiInteger => "semiinteger",
        };
        write!(f, "{name}")
    }
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    /// Initial level, defaulting to zero.
    pub level: f64,
}

impl Variable {
    /// A continuous variable with the given bounds and a zero level.
    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64) -> Variable {
        Variable {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
            level: 0.0,
        }
    }
}

/// Row kind, derived from the constraint bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Equality,
    LessEqual,
    GreaterEqual,
    /// Two distinct finite bounds.
    Ranged,
    /// No finite bound on either side.
    Free,
}

/// A linear or nonlinear constraint row.
///
/// The row kind is not stored; it follows from the bounds. `constant` is a
/// fixed term added to the row activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub constant: f64,
}

impl Constraint {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Constraint {
        Constraint {
            name: name.into(),
            lower,
            upper,
            constant: 0.0,
        }
    }

    /// Equality row with both bounds at `rhs`.
    pub fn equality(name: impl Into<String>, rhs: f64) -> Constraint {
        Constraint::new(name, rhs, rhs)
    }

    /// The row kind implied by the bounds.
    pub fn kind(&self) -> RowKind {
        let unbounded_below = self.lower == f64::NEG_INFINITY;
        let unbounded_above = self.upper == f64::INFINITY;
        match (unbounded_below, unbounded_above) {
            (true, true) => RowKind::Free,
            (true, false) => RowKind::LessEqual,
            (false, true) => RowKind::GreaterEqual,
            (false, false) => {
                if self.lower == self.upper {
                    RowKind::Equality
                } else {
                    RowKind::Ranged
                }
            }
        }
    }

    /// The single right-hand side of a non-ranged row.
    ///
    /// Free rows report zero. For ranged rows the lower bound is returned;
    /// the translators reject ranged rows before this matters.
    pub fn rhs(&self) -> f64 {
        match self.kind() {
            RowKind::Equality | RowKind::GreaterEqual | RowKind::Ranged => self.lower,
            RowKind::LessEqual => self.upper,
            RowKind::Free => 0.0,
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Minimize,
    Maximize,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Minimize => write!(f, "min"),
            Sense::Maximize => write!(f, "max"),
        }
    }
}

/// One sparse linear objective coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjCoef {
    pub idx: usize,
    pub value: f64,
}

/// The single objective function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub sense: Sense,
    pub constant: f64,
    pub weight: f64,
    /// Sparse linear part, sorted by column index.
    pub coefficients: Vec<ObjCoef>,
}

impl Objective {
    pub fn minimize(name: impl Into<String>) -> Objective {
        Objective {
            name: name.into(),
            sense: Sense::Minimize,
            constant: 0.0,
            weight: 1.0,
            coefficients: Vec::new(),
        }
    }
}

/// Addressee of a nonlinear expression: the objective or a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRef {
    Objective,
    Constraint(usize),
}

/// A nonlinear expression attached to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearEntry {
    pub row: RowRef,
    pub tree: Expr,
}

/// Model class, as used for solver selection and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelClass {
    Lp,
    Mip,
    Nlp,
    Minlp,
    /// Constrained system without an objective.
    Cns,
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelClass::Lp => "LP",
            ModelClass::Mip => "MIP",
            ModelClass::Nlp => "NLP",
            ModelClass::Minlp => "MINLP",
            ModelClass::Cns => "CNS",
        };
        write!(f, "{name}")
    }
}

/// The canonical problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub description: String,
    pub variables: Vec<Variable>,
    /// At most one objective; `None` for constrained systems.
    pub objective: Option<Objective>,
    pub constraints: Vec<Constraint>,
    /// Linear coefficients, one row per constraint and one column per variable.
    pub coefficients: SparseMatrix,
    pub nonlinear: Vec<NonlinearEntry>,
}

impl Instance {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of discrete (binary, integer, semiinteger) variables.
    pub fn num_discrete(&self) -> usize {
        self.variables.iter().filter(|v| v.kind.is_discrete()).count()
    }

    /// The nonlinear expression attached to the objective, if any.
    pub fn objective_expression(&self) -> Option<&Expr> {
        self.nonlinear
            .iter()
            .find(|e| e.row == RowRef::Objective)
            .map(|e| &e.tree)
    }

    /// The nonlinear expression attached to constraint `idx`, if any.
    pub fn constraint_expression(&self, idx: usize) -> Option<&Expr> {
        self.nonlinear
            .iter()
            .find(|e| e.row == RowRef::Constraint(idx))
            .map(|e| &e.tree)
    }

    /// Classifies the instance by discreteness and nonlinearity.
    pub fn model_class(&self) -> ModelClass {
        if self.objective.is_none() {
            return ModelClass::Cns;
        }
        match (self.nonlinear.is_empty(), self.num_discrete() == 0) {
            (true, true) => ModelClass::Lp,
            (true, false) => ModelClass::Mip,
            (false, true) => ModelClass::Nlp,
            (false, false) => ModelClass::Minlp,
        }
    }

    /// Checks the cross-field invariants of the instance.
    pub fn validate(&self) -> OslinkResult<()> {
        let n = self.num_variables();
        let m = self.num_constraints();
        if self.coefficients.num_rows() != m || self.coefficients.num_cols() != n {
            return Err(OslinkError::Validation(format!(
                "coefficient matrix is {}x{} for {} constraints and {} variables",
                self.coefficients.num_rows(),
                self.coefficients.num_cols(),
                m,
                n
            )));
        }
        for (i, var) in self.variables.iter().enumerate() {
            if var.lower.is_nan() || var.upper.is_nan() {
                return Err(OslinkError::Validation(format!(
                    "variable {i} has a NaN bound"
                )));
            }
            if var.lower > var.upper {
                return Err(OslinkError::Validation(format!(
                    "variable {i} has lower bound {} above upper bound {}",
                    var.lower, var.upper
                )));
            }
        }
        if let Some(obj) = &self.objective {
            for coef in &obj.coefficients {
                if coef.idx >= n {
                    return Err(OslinkError::Validation(format!(
                        "objective coefficient references column {} of {n}",
                        coef.idx
                    )));
                }
            }
            for w in obj.coefficients.windows(2) {
                if w[1].idx <= w[0].idx {
                    return Err(OslinkError::Validation(
                        "objective coefficients must be strictly sorted by column".to_string(),
                    ));
                }
            }
        }
        let mut seen_obj = false;
        let mut seen_rows = vec![false; m];
        for entry in &self.nonlinear {
            match entry.row {
                RowRef::Objective => {
                    if self.objective.is_none() {
                        return Err(OslinkError::Validation(
                            "nonlinear expression attached to a missing objective".to_string(),
                        ));
                    }
                    if seen_obj {
                        return Err(OslinkError::Validation(
                            "duplicate nonlinear expression for the objective".to_string(),
                        ));
                    }
                    seen_obj = true;
                }
                RowRef::Constraint(i) => {
                    if i >= m {
                        return Err(OslinkError::Validation(format!(
                            "nonlinear expression references row {i} of {m}"
                        )));
                    }
                    if seen_rows[i] {
                        return Err(OslinkError::Validation(format!(
                            "duplicate nonlinear expression for row {i}"
                        )));
                    }
                    seen_rows[i] = true;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixLayout;

    fn small_instance() -> Instance {
        Instance {
            name: "small".to_string(),
            description: String::new(),
            variables: vec![
                Variable::continuous("x0", 0.0, f64::INFINITY),
                Variable::continuous("x1", 0.0, 10.0),
            ],
            objective: Some(Objective {
                name: "obj".to_string(),
                sense: Sense::Minimize,
                constant: 0.0,
                weight: 1.0,
                coefficients: vec![
                    ObjCoef { idx: 0, value: 1.0 },
                    ObjCoef { idx: 1, value: 2.0 },
                ],
            }),
            constraints: vec![Constraint::new("e0", f64::NEG_INFINITY, 4.0)],
            coefficients: SparseMatrix::from_triplets(
                MatrixLayout::ColumnMajor,
                1,
                2,
                &[(0, 0, 1.0), (0, 1, 1.0)],
            )
            .unwrap(),
            nonlinear: Vec::new(),
        }
    }

    #[test]
    fn test_row_kind_from_bounds() {
        let free = Constraint::new("f", f64::NEG_INFINITY, f64::INFINITY);
        assert_eq!(free.kind(), RowKind::Free);
        assert_eq!(free.rhs(), 0.0);

        let le = Constraint::new("le", f64::NEG_INFINITY, 5.0);
        assert_eq!(le.kind(), RowKind::LessEqual);
        assert_eq!(le.rhs(), 5.0);

        let ge = Constraint::new("ge", -1.0, f64::INFINITY);
        assert_eq!(ge.kind(), RowKind::GreaterEqual);
        assert_eq!(ge.rhs(), -1.0);

        let eq = Constraint::equality("eq", 3.0);
        assert_eq!(eq.kind(), RowKind::Equality);
        assert_eq!(eq.rhs(), 3.0);

        let ranged = Constraint::new("r", 1.0, 2.0);
        assert_eq!(ranged.kind(), RowKind::Ranged);
    }

    #[test]
    fn test_model_class() {
        let mut inst = small_instance();
        assert_eq!(inst.model_class(), ModelClass::Lp);

        inst.variables[1].kind = VarKind::Integer;
        assert_eq!(inst.model_class(), ModelClass::Mip);

        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::Square(Box::new(Expr::var(0))),
        });
        assert_eq!(inst.model_class(), ModelClass::Minlp);

        inst.variables[1].kind = VarKind::Continuous;
        assert_eq!(inst.model_class(), ModelClass::Nlp);

        inst.objective = None;
        assert_eq!(inst.model_class(), ModelClass::Cns);
    }

    #[test]
    fn test_validate_accepts_small_instance() {
        assert!(small_instance().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_matrix_shape_mismatch() {
        let mut inst = small_instance();
        inst.coefficients = SparseMatrix::empty(MatrixLayout::ColumnMajor, 5, 5);
        assert!(matches!(
            inst.validate(),
            Err(OslinkError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unsorted_objective() {
        let mut inst = small_instance();
        if let Some(obj) = &mut inst.objective {
            obj.coefficients.reverse();
        }
        assert!(inst.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_nonlinear_row() {
        let mut inst = small_instance();
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::var(0),
        });
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::var(1),
        });
        assert!(inst.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_crossed_bounds() {
        let mut inst = small_instance();
        inst.variables[0].lower = 2.0;
        inst.variables[0].upper = 1.0;
        assert!(inst.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_objective_expression_without_objective() {
        let mut inst = small_instance();
        inst.objective = None;
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Objective,
            tree: Expr::var(0),
        });
        assert!(inst.validate().is_err());
    }

    #[test]
    fn test_var_kind_letters() {
        for kind in [
            VarKind::Continuous,
            VarKind::Binary,
            VarKind::Integer,
            VarKind::SemiContinuous,
            VarKind::SemiInteger,
        ] {
            assert_eq!(VarKind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(VarKind::from_letter('Q'), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let inst = small_instance();
        let json = serde_json::to_string(&inst).unwrap();
        let back: Instance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inst);
    }
}
