//! Forward translation: native model object to canonical instance.
//!
//! Variable and row names are synthesized (`x00000000`, `e00000000`) since
//! the native model carries no dictionary here. Nonlinear-flagged entries
//! are squeezed out of the linear matrix; their contribution lives in the
//! decoded expression trees instead.

use crate::decode::decode;
use crate::model::{ModelObject, NativeColKind, NativeRowKind};
use oslink_core::{
    Constraint, Expr, Instance, MatrixLayout, ModelClass, NonlinearEntry, ObjCoef, Objective,
    OslinkError, OslinkResult, RowRef, SparseMatrix, VarKind, Variable,
};

/// Builds a canonical instance from a native model.
pub fn build_instance(model: &ModelObject) -> OslinkResult<Instance> {
    let n = model.num_cols();
    let m = model.num_rows();

    let lower_bounds = model.var_lower_bounds();
    let upper_bounds = model.var_upper_bounds();
    let mut variables = Vec::with_capacity(n);
    for (j, col) in model.cols().iter().enumerate() {
        let kind = match col.kind {
            NativeColKind::Continuous => VarKind::Continuous,
            NativeColKind::Binary => VarKind::Binary,
            NativeColKind::Integer => VarKind::Integer,
            other => {
                return Err(OslinkError::UnsupportedVariableType {
                    index: j,
                    kind: other.name().to_string(),
                })
            }
        };
        variables.push(Variable {
            name: format!("x{j:08}"),
            kind,
            lower: from_native_bound(lower_bounds[j], model),
            upper: from_native_bound(upper_bounds[j], model),
            level: col.level,
        });
    }

    // constrained systems have no objective on the canonical side
    let objective = if model.model_class() == ModelClass::Cns {
        None
    } else {
        let coefficients = model
            .objective()
            .iter()
            .filter(|entry| !entry.nonlinear)
            .map(|entry| ObjCoef {
                idx: entry.col,
                value: entry.value,
            })
            .collect();
        Some(Objective {
            name: "objective".to_string(),
            sense: model.sense(),
            constant: model.obj_constant(),
            weight: 1.0,
            coefficients,
        })
    };

    let mut constraints = Vec::with_capacity(m);
    for (i, row) in model.rows().iter().enumerate() {
        let (lower, upper) = match row.kind {
            NativeRowKind::Equality => (row.rhs, row.rhs),
            NativeRowKind::LessEqual => (f64::NEG_INFINITY, row.rhs),
            NativeRowKind::GreaterEqual => (row.rhs, f64::INFINITY),
            NativeRowKind::NonBinding => (f64::NEG_INFINITY, f64::INFINITY),
        };
        constraints.push(Constraint {
            name: format!("e{i:08}"),
            lower,
            upper,
            constant: 0.0,
        });
    }

    // squeeze the nonlinear-flagged entries out of the native column-major
    // arrays in place, recomputing the start offsets as we go
    let (mut starts, mut rows, mut values, nlflags) = model.matrix_column_major();
    let mut shift = 0usize;
    for col in 0..n {
        starts[col + 1] -= shift;
        let mut k = starts[col];
        while k < starts[col + 1] {
            values[k] = values[k + shift];
            rows[k] = rows[k + shift];
            if nlflags[k + shift] {
                shift += 1;
                starts[col + 1] -= 1;
            } else {
                k += 1;
            }
        }
    }
    let nz = values.len() - shift;
    rows.truncate(nz);
    values.truncate(nz);
    let coefficients = SparseMatrix::new(MatrixLayout::ColumnMajor, m, n, starts, rows, values)?;

    let expected = model.num_nonlinear_rows()
        + if model.objective_nonlinear_nonzeros() > 0 {
            1
        } else {
            0
        };
    let mut nonlinear = Vec::with_capacity(expected);
    if model.objective_nonlinear_nonzeros() > 0 {
        let tape = model.objective_tape().ok_or_else(|| {
            OslinkError::MalformedTape(
                "objective marked nonlinear but carries no instruction tape".to_string(),
            )
        })?;
        let tree = decode(tape, model.constants_pool(), n)?;
        nonlinear.push(NonlinearEntry {
            row: RowRef::Objective,
            tree: scale_objective(tree, model.obj_jacobian_value()),
        });
    }
    for (i, row) in model.rows().iter().enumerate() {
        if let Some(tape) = &row.tape {
            nonlinear.push(NonlinearEntry {
                row: RowRef::Constraint(i),
                tree: decode(tape, model.constants_pool(), n)?,
            });
        }
    }
    if nonlinear.len() != expected {
        return Err(OslinkError::Validation(format!(
            "built {} nonlinear expressions where the model promises {expected}",
            nonlinear.len()
        )));
    }

    let instance = Instance {
        name: model.ident().to_string(),
        description: "generated from a native model object".to_string(),
        variables,
        objective,
        constraints,
        coefficients,
        nonlinear,
    };
    instance.validate()?;
    Ok(instance)
}

/// Maps the model's configured infinity sentinels to IEEE infinities.
fn from_native_bound(value: f64, model: &ModelObject) -> f64 {
    if value == model.minus_infinity() {
        f64::NEG_INFINITY
    } else if value == model.plus_infinity() {
        f64::INFINITY
    } else {
        value
    }
}

/// Rescales a decoded objective tree by the objective Jacobian value.
///
/// The native objective row reads `f(x) + objjacval * objvar = rhs`.
/// Solving for the objective variable scales the tree by `-1/objjacval`,
/// which is the identity at the native default of -1.
fn scale_objective(tree: Expr, obj_jac_val: f64) -> Expr {
    if obj_jac_val == 1.0 {
        Expr::negate(tree)
    } else if obj_jac_val != -1.0 {
        Expr::times(tree, Expr::Number(-1.0 / obj_jac_val))
    } else {
        tree
    }
}
