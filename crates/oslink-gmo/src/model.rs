//! The native model object.
//!
//! An in-memory rendition of the native modeling system's model API. It
//! keeps the API's two signature quirks because the translators are written
//! against them: declaration calls (`add_row`, `add_col`, and the row
//! indexes inside column entries) take one-based indexes, while every read
//! accessor is zero-based; and infinite bounds cross the declaration
//! boundary as special sentinel codes, not IEEE infinities. Internally all
//! values are plain IEEE floats.

use crate::instr::Tape;
use oslink_core::{ModelClass, ModelStatus, OslinkError, OslinkResult, Sense, SolveStatus};

/// Special value codes of the native system.
pub mod special {
    /// Undefined value.
    pub const UNDEF: f64 = 1.0e300;
    /// Not available.
    pub const NA: f64 = 2.0e300;
    /// Plus infinity.
    pub const PINF: f64 = 3.0e300;
    /// Minus infinity.
    pub const MINF: f64 = 4.0e300;
    /// Epsilon.
    pub const EPS: f64 = 5.0e300;
}

/// How the native model carries its objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjStyle {
    /// A designated objective variable, tied in by an extra equality row.
    #[default]
    Variable,
    /// A function over the columns, kept outside the row space.
    Function,
}

/// Native row kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeRowKind {
    Equality,
    GreaterEqual,
    LessEqual,
    NonBinding,
}

/// Native column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeColKind {
    Continuous,
    Binary,
    Integer,
    Sos1,
    Sos2,
    SemiContinuous,
    SemiInteger,
}

impl NativeColKind {
    pub fn name(&self) -> &'static str {
        match self {
            NativeColKind::Continuous => "continuous",
            NativeColKind::Binary => "binary",
            NativeColKind::Integer => "integer",
            NativeColKind::Sos1 => "sos1",
            NativeColKind::Sos2 => "sos2",
            NativeColKind::SemiContinuous => "semicontinuous",
            NativeColKind::SemiInteger => "semiinteger",
        }
    }
}

/// Native basis status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum BasisStatus {
    Lower = 0,
    Upper = 1,
    Basic = 2,
    #[default]
    Superbasic = 3,
}

/// One Jacobian entry supplied at column declaration.
///
/// The row index is one-based, like every other declaration index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacEntry {
    pub row: usize,
    pub value: f64,
    pub nonlinear: bool,
}

/// One function-style objective entry, with a zero-based column index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjEntry {
    pub col: usize,
    pub value: f64,
    pub nonlinear: bool,
}

/// A declared row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: NativeRowKind,
    pub rhs: f64,
    pub level: f64,
    pub marginal: f64,
    pub basis: BasisStatus,
    pub tape: Option<Tape>,
}

/// A declared column. Bounds are stored as IEEE values; entry row indexes
/// are stored zero-based after the declaration-side translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Col {
    pub kind: NativeColKind,
    pub lower: f64,
    pub level: f64,
    pub upper: f64,
    pub marginal: f64,
    pub basis: BasisStatus,
    pub prior: f64,
    pub entries: Vec<JacEntry>,
}

/// Aggregate counts reported into the model after a translation pass.
///
/// All indexes here are zero-based. The kind tallies count declared rows and
/// columns only, not the synthetic objective row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelStats {
    pub num_rows: usize,
    pub num_cols: usize,
    pub num_nonzeros: usize,
    pub rows_equality: usize,
    pub rows_greater: usize,
    pub rows_less: usize,
    pub rows_nonbinding: usize,
    pub cols_continuous: usize,
    pub cols_binary: usize,
    pub cols_integer: usize,
    pub objective_row: Option<usize>,
    pub objective_col: Option<usize>,
}

/// The native model object.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelObject {
    ident: String,
    sense: Sense,
    class: ModelClass,
    obj_style: ObjStyle,
    minus_inf: f64,
    plus_inf: f64,
    declared_rows: usize,
    declared_cols: usize,
    declared_nonzeros: usize,
    rows: Vec<Row>,
    cols: Vec<Col>,
    objective: Vec<ObjEntry>,
    obj_constant: f64,
    obj_jac_val: f64,
    constants: Vec<f64>,
    objective_tape: Option<Tape>,
    stats: ModelStats,
    model_status: ModelStatus,
    solve_status: SolveStatus,
    objective_value: Option<f64>,
}

impl ModelObject {
    /// A fresh model with nothing declared and error statuses, the state a
    /// model is in until a solution has been written.
    pub fn new(ident: &str) -> ModelObject {
        ModelObject {
            ident: ident.to_string(),
            sense: Sense::Minimize,
            class: ModelClass::Lp,
            obj_style: ObjStyle::Variable,
            minus_inf: f64::NEG_INFINITY,
            plus_inf: f64::INFINITY,
            declared_rows: 0,
            declared_cols: 0,
            declared_nonzeros: 0,
            rows: Vec::new(),
            cols: Vec::new(),
            objective: Vec::new(),
            obj_constant: 0.0,
            obj_jac_val: -1.0,
            constants: Vec::new(),
            objective_tape: None,
            stats: ModelStats::default(),
            model_status: ModelStatus::ErrorNoSolution,
            solve_status: SolveStatus::SystemError,
            objective_value: None,
        }
    }

    /// Sizes the model. Declarations must then fill it exactly.
    pub fn init(&mut self, num_rows: usize, num_cols: usize, num_nonzeros: usize) {
        self.declared_rows = num_rows;
        self.declared_cols = num_cols;
        self.declared_nonzeros = num_nonzeros;
        self.rows.reserve(num_rows);
        self.cols.reserve(num_cols);
    }

    /// Declares the next row. `idx` is one-based and must arrive in order.
    pub fn add_row(
        &mut self,
        idx: usize,
        kind: NativeRowKind,
        rhs: f64,
        basis: BasisStatus,
    ) -> OslinkResult<()> {
        if idx != self.rows.len() + 1 {
            return Err(OslinkError::Validation(format!(
                "row declared out of order: got index {idx}, expected {}",
                self.rows.len() + 1
            )));
        }
        if self.rows.len() == self.declared_rows {
            return Err(OslinkError::Validation(format!(
                "more rows declared than the {} the model was sized for",
                self.declared_rows
            )));
        }
        self.rows.push(Row {
            kind,
            rhs,
            level: special::NA,
            marginal: special::NA,
            basis,
            tape: None,
        });
        Ok(())
    }

    /// Declares the next column. `idx` is one-based and must arrive in
    /// order; entry row indexes are one-based and must reference rows that
    /// are already declared. Bounds equal to the sentinel codes are stored
    /// as IEEE infinities.
    #[allow(clippy::too_many_arguments)]
    pub fn add_col(
        &mut self,
        idx: usize,
        kind: NativeColKind,
        lower: f64,
        level: f64,
        upper: f64,
        basis: BasisStatus,
        prior: f64,
        entries: Vec<JacEntry>,
    ) -> OslinkResult<()> {
        if idx != self.cols.len() + 1 {
            return Err(OslinkError::Validation(format!(
                "column declared out of order: got index {idx}, expected {}",
                self.cols.len() + 1
            )));
        }
        if self.cols.len() == self.declared_cols {
            return Err(OslinkError::Validation(format!(
                "more columns declared than the {} the model was sized for",
                self.declared_cols
            )));
        }
        let held = self.num_nonzeros();
        if held + entries.len() > self.declared_nonzeros {
            return Err(OslinkError::Validation(format!(
                "column {idx} brings the entry count past the {} the model was sized for",
                self.declared_nonzeros
            )));
        }
        let mut translated = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.row == 0 || entry.row > self.rows.len() {
                return Err(OslinkError::Validation(format!(
                    "column {idx} references row index {} outside the declared 1..={}",
                    entry.row,
                    self.rows.len()
                )));
            }
            translated.push(JacEntry {
                row: entry.row - 1,
                ..entry
            });
        }
        translated.sort_by_key(|e| e.row);
        self.cols.push(Col {
            kind,
            lower: from_declared_bound(lower),
            level,
            upper: from_declared_bound(upper),
            marginal: special::NA,
            basis,
            prior,
            entries: translated,
        });
        Ok(())
    }

    /// Checks that the declarations filled the model exactly as sized.
    pub fn complete(&self) -> OslinkResult<()> {
        if self.rows.len() != self.declared_rows {
            return Err(OslinkError::Validation(format!(
                "model sized for {} rows but {} declared",
                self.declared_rows,
                self.rows.len()
            )));
        }
        if self.cols.len() != self.declared_cols {
            return Err(OslinkError::Validation(format!(
                "model sized for {} columns but {} declared",
                self.declared_cols,
                self.cols.len()
            )));
        }
        if self.num_nonzeros() != self.declared_nonzeros {
            return Err(OslinkError::Validation(format!(
                "model sized for {} entries but {} declared",
                self.declared_nonzeros,
                self.num_nonzeros()
            )));
        }
        Ok(())
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_nonzeros(&self) -> usize {
        self.cols.iter().map(|c| c.entries.len()).sum()
    }

    /// Number of rows carrying an instruction tape.
    pub fn num_nonlinear_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.tape.is_some()).count()
    }

    /// Number of nonlinear-flagged entries in the objective vector.
    pub fn objective_nonlinear_nonzeros(&self) -> usize {
        self.objective.iter().filter(|e| e.nonlinear).count()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cols(&self) -> &[Col] {
        &self.cols
    }

    /// The negative-infinity sentinel read accessors report.
    pub fn minus_infinity(&self) -> f64 {
        self.minus_inf
    }

    /// The positive-infinity sentinel read accessors report.
    pub fn plus_infinity(&self) -> f64 {
        self.plus_inf
    }

    pub fn set_minus_infinity(&mut self, value: f64) {
        self.minus_inf = value;
    }

    pub fn set_plus_infinity(&mut self, value: f64) {
        self.plus_inf = value;
    }

    /// Lower bounds of all columns, with infinities mapped to the
    /// configured sentinel.
    pub fn var_lower_bounds(&self) -> Vec<f64> {
        self.cols
            .iter()
            .map(|c| {
                if c.lower == f64::NEG_INFINITY {
                    self.minus_inf
                } else {
                    c.lower
                }
            })
            .collect()
    }

    /// Upper bounds of all columns, with infinities mapped to the
    /// configured sentinel.
    pub fn var_upper_bounds(&self) -> Vec<f64> {
        self.cols
            .iter()
            .map(|c| {
                if c.upper == f64::INFINITY {
                    self.plus_inf
                } else {
                    c.upper
                }
            })
            .collect()
    }

    /// The linear coefficient structure in column-major compressed form:
    /// start offsets, zero-based row indexes, values, and nonlinearity
    /// flags, one flag per entry.
    pub fn matrix_column_major(&self) -> (Vec<usize>, Vec<usize>, Vec<f64>, Vec<bool>) {
        let nnz = self.num_nonzeros();
        let mut starts = Vec::with_capacity(self.cols.len() + 1);
        let mut rows = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        let mut nlflags = Vec::with_capacity(nnz);
        starts.push(0);
        for col in &self.cols {
            for entry in &col.entries {
                rows.push(entry.row);
                values.push(entry.value);
                nlflags.push(entry.nonlinear);
            }
            starts.push(rows.len());
        }
        (starts, rows, values, nlflags)
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.sense = sense;
    }

    pub fn model_class(&self) -> ModelClass {
        self.class
    }

    pub fn set_model_class(&mut self, class: ModelClass) {
        self.class = class;
    }

    pub fn obj_style(&self) -> ObjStyle {
        self.obj_style
    }

    pub fn set_obj_style(&mut self, style: ObjStyle) {
        self.obj_style = style;
    }

    /// The sparse objective vector, sorted by column.
    pub fn objective(&self) -> &[ObjEntry] {
        &self.objective
    }

    pub fn obj_constant(&self) -> f64 {
        self.obj_constant
    }

    /// Sets the function-style objective. Columns are zero-based and must
    /// be strictly ascending and already declared.
    pub fn set_objective(&mut self, constant: f64, entries: Vec<ObjEntry>) -> OslinkResult<()> {
        for entry in &entries {
            if entry.col >= self.cols.len() {
                return Err(OslinkError::Validation(format!(
                    "objective references column {} of {}",
                    entry.col,
                    self.cols.len()
                )));
            }
        }
        for w in entries.windows(2) {
            if w[1].col <= w[0].col {
                return Err(OslinkError::Validation(
                    "objective entries must be strictly sorted by column".to_string(),
                ));
            }
        }
        self.obj_constant = constant;
        self.objective = entries;
        Ok(())
    }

    /// Derivative of the objective row with respect to the objective
    /// variable. The native default is -1.
    pub fn obj_jacobian_value(&self) -> f64 {
        self.obj_jac_val
    }

    pub fn set_obj_jacobian_value(&mut self, value: f64) {
        self.obj_jac_val = value;
    }

    pub fn constants_pool(&self) -> &[f64] {
        &self.constants
    }

    pub fn set_constants(&mut self, pool: Vec<f64>) {
        self.constants = pool;
    }

    pub fn objective_tape(&self) -> Option<&Tape> {
        self.objective_tape.as_ref()
    }

    pub fn set_objective_tape(&mut self, tape: Tape) {
        self.objective_tape = Some(tape);
    }

    /// The instruction tape of row `idx` (zero-based), if that row is
    /// nonlinear.
    pub fn row_tape(&self, idx: usize) -> Option<&Tape> {
        self.rows.get(idx).and_then(|r| r.tape.as_ref())
    }

    /// Attaches an instruction tape to row `idx` (zero-based).
    pub fn set_row_tape(&mut self, idx: usize, tape: Tape) -> OslinkResult<()> {
        match self.rows.get_mut(idx) {
            Some(row) => {
                row.tape = Some(tape);
                Ok(())
            }
            None => Err(OslinkError::Validation(format!(
                "no row {idx} to attach a tape to"
            ))),
        }
    }

    pub fn stats(&self) -> &ModelStats {
        &self.stats
    }

    pub fn set_stats(&mut self, stats: ModelStats) {
        self.stats = stats;
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model_status
    }

    pub fn set_model_status(&mut self, status: ModelStatus) {
        self.model_status = status;
    }

    pub fn solve_status(&self) -> SolveStatus {
        self.solve_status
    }

    pub fn set_solve_status(&mut self, status: SolveStatus) {
        self.solve_status = status;
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    pub fn set_objective_value(&mut self, value: f64) {
        self.objective_value = Some(value);
    }

    /// Writes a full solution: levels, marginals, and basis statuses for
    /// every column and every row. Slice lengths must match the model.
    #[allow(clippy::too_many_arguments)]
    pub fn set_solution(
        &mut self,
        col_levels: &[f64],
        col_marginals: &[f64],
        col_basis: &[BasisStatus],
        row_levels: &[f64],
        row_marginals: &[f64],
        row_basis: &[BasisStatus],
    ) -> OslinkResult<()> {
        let n = self.cols.len();
        let m = self.rows.len();
        if col_levels.len() != n || col_marginals.len() != n || col_basis.len() != n {
            return Err(OslinkError::Validation(format!(
                "column solution arrays must have length {n}"
            )));
        }
        if row_levels.len() != m || row_marginals.len() != m || row_basis.len() != m {
            return Err(OslinkError::Validation(format!(
                "row solution arrays must have length {m}"
            )));
        }
        for (i, col) in self.cols.iter_mut().enumerate() {
            col.level = col_levels[i];
            col.marginal = col_marginals[i];
            col.basis = col_basis[i];
        }
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.level = row_levels[i];
            row.marginal = row_marginals[i];
            row.basis = row_basis[i];
        }
        Ok(())
    }
}

/// Maps declaration-side sentinel codes to IEEE infinities; plain values
/// pass through.
fn from_declared_bound(value: f64) -> f64 {
    if value == special::MINF {
        f64::NEG_INFINITY
    } else if value == special::PINF {
        f64::INFINITY
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized_model(rows: usize, cols: usize, nnz: usize) -> ModelObject {
        let mut model = ModelObject::new("test");
        model.init(rows, cols, nnz);
        model
    }

    #[test]
    fn test_declaration_is_one_based_and_ordered() {
        let mut model = sized_model(2, 0, 0);
        assert!(model
            .add_row(1, NativeRowKind::Equality, 1.0, BasisStatus::Superbasic)
            .is_ok());
        // skipping index 2 is out of order
        let err = model.add_row(3, NativeRowKind::Equality, 1.0, BasisStatus::Superbasic);
        assert!(matches!(err, Err(OslinkError::Validation(_))));
        // zero is never a declaration index
        let err = model.add_row(0, NativeRowKind::Equality, 1.0, BasisStatus::Superbasic);
        assert!(matches!(err, Err(OslinkError::Validation(_))));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut model = sized_model(1, 0, 0);
        model
            .add_row(1, NativeRowKind::NonBinding, 0.0, BasisStatus::Superbasic)
            .unwrap();
        let err = model.add_row(2, NativeRowKind::NonBinding, 0.0, BasisStatus::Superbasic);
        assert!(err.is_err());
    }

    #[test]
    fn test_entry_rows_are_one_based() {
        let mut model = sized_model(1, 1, 1);
        model
            .add_row(1, NativeRowKind::Equality, 0.0, BasisStatus::Superbasic)
            .unwrap();
        let err = model.add_col(
            1,
            NativeColKind::Continuous,
            0.0,
            0.0,
            1.0,
            BasisStatus::Superbasic,
            1.0,
            vec![JacEntry {
                row: 0,
                value: 1.0,
                nonlinear: false,
            }],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_sentinel_bounds_become_infinities() {
        let mut model = sized_model(0, 1, 0);
        model
            .add_col(
                1,
                NativeColKind::Continuous,
                special::MINF,
                0.0,
                special::PINF,
                BasisStatus::Superbasic,
                1.0,
                Vec::new(),
            )
            .unwrap();
        assert_eq!(model.cols()[0].lower, f64::NEG_INFINITY);
        assert_eq!(model.cols()[0].upper, f64::INFINITY);
        // default read sentinels are the IEEE infinities themselves
        assert_eq!(model.var_lower_bounds(), vec![f64::NEG_INFINITY]);
        // configured sentinels come back out instead
        model.set_minus_infinity(special::MINF);
        model.set_plus_infinity(special::PINF);
        assert_eq!(model.var_lower_bounds(), vec![special::MINF]);
        assert_eq!(model.var_upper_bounds(), vec![special::PINF]);
    }

    #[test]
    fn test_matrix_column_major_shape() {
        let mut model = sized_model(2, 2, 3);
        model
            .add_row(1, NativeRowKind::Equality, 0.0, BasisStatus::Superbasic)
            .unwrap();
        model
            .add_row(2, NativeRowKind::LessEqual, 5.0, BasisStatus::Superbasic)
            .unwrap();
        model
            .add_col(
                1,
                NativeColKind::Continuous,
                0.0,
                0.0,
                1.0,
                BasisStatus::Superbasic,
                1.0,
                vec![
                    JacEntry {
                        row: 2,
                        value: 3.0,
                        nonlinear: false,
                    },
                    JacEntry {
                        row: 1,
                        value: 2.0,
                        nonlinear: true,
                    },
                ],
            )
            .unwrap();
        model
            .add_col(
                2,
                NativeColKind::Continuous,
                0.0,
                0.0,
                1.0,
                BasisStatus::Superbasic,
                1.0,
                vec![JacEntry {
                    row: 1,
                    value: 4.0,
                    nonlinear: false,
                }],
            )
            .unwrap();
        model.complete().unwrap();

        let (starts, rows, values, nlflags) = model.matrix_column_major();
        assert_eq!(starts, vec![0, 2, 3]);
        // entries are sorted by row within each column, zero-based
        assert_eq!(rows, vec![0, 1, 0]);
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(nlflags, vec![true, false, false]);
    }

    #[test]
    fn test_complete_checks_fill() {
        let mut model = sized_model(1, 1, 0);
        assert!(model.complete().is_err());
        model
            .add_row(1, NativeRowKind::Equality, 0.0, BasisStatus::Superbasic)
            .unwrap();
        model
            .add_col(
                1,
                NativeColKind::Continuous,
                0.0,
                0.0,
                1.0,
                BasisStatus::Superbasic,
                1.0,
                Vec::new(),
            )
            .unwrap();
        assert!(model.complete().is_ok());
    }

    #[test]
    fn test_objective_must_be_sorted() {
        let mut model = sized_model(0, 2, 0);
        for i in 0..2 {
            model
                .add_col(
                    i + 1,
                    NativeColKind::Continuous,
                    0.0,
                    0.0,
                    1.0,
                    BasisStatus::Superbasic,
                    1.0,
                    Vec::new(),
                )
                .unwrap();
        }
        let err = model.set_objective(
            0.0,
            vec![
                ObjEntry {
                    col: 1,
                    value: 1.0,
                    nonlinear: false,
                },
                ObjEntry {
                    col: 0,
                    value: 2.0,
                    nonlinear: false,
                },
            ],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_set_solution_checks_lengths() {
        let mut model = sized_model(1, 2, 0);
        model
            .add_row(1, NativeRowKind::Equality, 0.0, BasisStatus::Superbasic)
            .unwrap();
        for i in 0..2 {
            model
                .add_col(
                    i + 1,
                    NativeColKind::Continuous,
                    0.0,
                    0.0,
                    1.0,
                    BasisStatus::Superbasic,
                    1.0,
                    Vec::new(),
                )
                .unwrap();
        }
        let err = model.set_solution(
            &[1.0],
            &[0.0],
            &[BasisStatus::Basic],
            &[0.0],
            &[0.0],
            &[BasisStatus::Basic],
        );
        assert!(err.is_err());
        assert!(model
            .set_solution(
                &[1.0, 2.0],
                &[0.0, 0.0],
                &[BasisStatus::Basic, BasisStatus::Lower],
                &[3.0],
                &[0.5],
                &[BasisStatus::Basic],
            )
            .is_ok());
        assert_eq!(model.cols()[1].level, 2.0);
        assert_eq!(model.rows()[0].marginal, 0.5);
    }

    #[test]
    fn test_fresh_model_reports_error_statuses() {
        let model = ModelObject::new("fresh");
        assert_eq!(model.model_status().code(), 13);
        assert_eq!(model.solve_status().code(), 13);
    }
}
