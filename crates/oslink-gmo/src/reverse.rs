//! Reverse translation: canonical instance to native model object.
//!
//! Declarations run in two passes, rows first, then columns with their
//! entries, because the native API wants every entry's row declared before
//! the column referencing it. Anything the native form cannot hold (ranged
//! rows, exotic variable kinds, nonlinear expressions) fails before the
//! first declaration call, so a failed translation leaves no partial model.

use crate::model::{
    special, BasisStatus, JacEntry, ModelObject, ModelStats, NativeColKind, NativeRowKind,
    ObjEntry, ObjStyle,
};
use oslink_core::{
    Instance, ModelClass, OslinkError, OslinkResult, RowKind, Sense, VarKind,
};

/// Options for the reverse translation.
#[derive(Debug, Clone)]
pub struct ReverseOptions {
    /// Identifier stamped on the built model.
    pub ident: String,
    /// How the built model carries the objective.
    pub obj_style: ObjStyle,
}

impl Default for ReverseOptions {
    fn default() -> ReverseOptions {
        ReverseOptions {
            ident: "oslink object".to_string(),
            obj_style: ObjStyle::Variable,
        }
    }
}

/// Builds a native model from a canonical instance.
pub fn build_model(instance: &Instance, options: &ReverseOptions) -> OslinkResult<ModelObject> {
    instance.validate()?;
    if !instance.nonlinear.is_empty() {
        return Err(OslinkError::Unsupported(
            "nonlinear expressions cannot be carried into the native model".to_string(),
        ));
    }

    let n = instance.num_variables();
    let m = instance.num_constraints();

    // resolve every declaration first so nothing representable is declared
    // before a failure
    let mut row_decls = Vec::with_capacity(m);
    for (i, con) in instance.constraints.iter().enumerate() {
        let kind = match con.kind() {
            RowKind::Equality => NativeRowKind::Equality,
            RowKind::LessEqual => NativeRowKind::LessEqual,
            RowKind::GreaterEqual => NativeRowKind::GreaterEqual,
            RowKind::Free => NativeRowKind::NonBinding,
            RowKind::Ranged => return Err(OslinkError::RangedConstraint { index: i }),
        };
        let rhs = match con.kind() {
            RowKind::Free => 0.0,
            _ => con.rhs() - con.constant,
        };
        row_decls.push((kind, rhs));
    }
    let mut col_kinds = Vec::with_capacity(n);
    for (j, var) in instance.variables.iter().enumerate() {
        let kind = match var.kind {
            VarKind::Continuous => NativeColKind::Continuous,
            VarKind::Binary => NativeColKind::Binary,
            VarKind::Integer => NativeColKind::Integer,
            other => {
                return Err(OslinkError::UnsupportedVariableType {
                    index: j,
                    kind: other.to_string(),
                })
            }
        };
        col_kinds.push(kind);
    }

    let synthetic = instance.objective.is_some() && options.obj_style == ObjStyle::Variable;
    let obj_coefs: Vec<(usize, f64)> = match &instance.objective {
        Some(obj) => obj
            .coefficients
            .iter()
            .filter(|c| c.value != 0.0)
            .map(|c| (c.idx, c.value))
            .collect(),
        None => Vec::new(),
    };

    let num_rows = m + usize::from(synthetic);
    let num_cols = n + usize::from(synthetic);
    let num_nonzeros = instance.coefficients.nnz()
        + if synthetic { obj_coefs.len() + 1 } else { 0 };

    let mut model = ModelObject::new(&options.ident);
    model.set_obj_style(options.obj_style);
    model.set_model_class(if instance.objective.is_none() {
        ModelClass::Cns
    } else if instance.num_discrete() > 0 {
        ModelClass::Mip
    } else {
        ModelClass::Lp
    });
    if let Some(obj) = &instance.objective {
        model.set_sense(obj.sense);
    } else {
        model.set_sense(Sense::Minimize);
    }
    model.init(num_rows, num_cols, num_nonzeros);

    // pass 1: rows, tallying kinds in the same sweep
    let mut stats = ModelStats {
        num_rows,
        num_cols,
        num_nonzeros,
        ..ModelStats::default()
    };
    for (i, &(kind, rhs)) in row_decls.iter().enumerate() {
        match kind {
            NativeRowKind::Equality => stats.rows_equality += 1,
            NativeRowKind::GreaterEqual => stats.rows_greater += 1,
            NativeRowKind::LessEqual => stats.rows_less += 1,
            NativeRowKind::NonBinding => stats.rows_nonbinding += 1,
        }
        model.add_row(i + 1, kind, rhs, BasisStatus::Superbasic)?;
    }
    if synthetic {
        // the objective row carries any objective constant on its
        // right-hand side
        let constant = instance.objective.as_ref().map_or(0.0, |o| o.constant);
        model.add_row(
            num_rows,
            NativeRowKind::Equality,
            -constant,
            BasisStatus::Superbasic,
        )?;
    }

    // pass 2: columns with their entries, merging the rerouted objective
    // coefficient into each column's entry list
    let matrix = instance.coefficients.to_column_major();
    let mut next_obj = 0usize;
    for (j, var) in instance.variables.iter().enumerate() {
        let objcoef = if next_obj < obj_coefs.len() && obj_coefs[next_obj].0 == j {
            let value = obj_coefs[next_obj].1;
            next_obj += 1;
            value
        } else {
            0.0
        };

        let (seg_rows, seg_values) = matrix.segment(j);
        let mut entries = Vec::with_capacity(seg_rows.len() + 1);
        for (&row, &value) in seg_rows.iter().zip(seg_values) {
            entries.push(JacEntry {
                row: row + 1,
                value,
                nonlinear: false,
            });
        }
        if synthetic && objcoef != 0.0 {
            entries.push(JacEntry {
                row: num_rows,
                value: objcoef,
                nonlinear: false,
            });
        }

        match col_kinds[j] {
            NativeColKind::Continuous => stats.cols_continuous += 1,
            NativeColKind::Binary => stats.cols_binary += 1,
            NativeColKind::Integer => stats.cols_integer += 1,
            _ => {}
        }

        // clamp the initial level into the bounds while everything is
        // still IEEE, then hand the bounds over in sentinel form
        let level = var.level.clamp(var.lower, var.upper);
        model.add_col(
            j + 1,
            col_kinds[j],
            to_declared_bound(var.lower),
            level,
            to_declared_bound(var.upper),
            BasisStatus::Superbasic,
            1.0,
            entries,
        )?;
    }
    if synthetic {
        model.add_col(
            num_cols,
            NativeColKind::Continuous,
            special::MINF,
            0.0,
            special::PINF,
            BasisStatus::Superbasic,
            1.0,
            vec![JacEntry {
                row: num_rows,
                value: -1.0,
                nonlinear: false,
            }],
        )?;
    } else if let Some(obj) = &instance.objective {
        model.set_objective(
            obj.constant,
            obj_coefs
                .iter()
                .map(|&(col, value)| ObjEntry {
                    col,
                    value,
                    nonlinear: false,
                })
                .collect(),
        )?;
    }

    if synthetic {
        stats.objective_row = Some(num_rows - 1);
        stats.objective_col = Some(num_cols - 1);
    }
    model.set_stats(stats);
    model.complete()?;
    Ok(model)
}

/// Maps IEEE infinities to the declaration-side sentinel codes.
fn to_declared_bound(value: f64) -> f64 {
    if value == f64::NEG_INFINITY {
        special::MINF
    } else if value == f64::INFINITY {
        special::PINF
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::build_instance;
    use oslink_core::{
        Constraint, Expr, MatrixLayout, NonlinearEntry, ObjCoef, Objective, RowRef, SparseMatrix,
        Variable,
    };

    /// minimize x0 + 2*x1 + 5 subject to x0 + x1 <= 10 and x0 - x1 = 1
    fn small_instance() -> Instance {
        Instance {
            name: "small".to_string(),
            description: String::new(),
            variables: vec![
                Variable::continuous("a", 0.0, f64::INFINITY),
                Variable::continuous("b", 0.0, 8.0),
            ],
            objective: Some(Objective {
                name: "obj".to_string(),
                sense: Sense::Minimize,
                constant: 5.0,
                weight: 1.0,
                coefficients: vec![
                    ObjCoef { idx: 0, value: 1.0 },
                    ObjCoef { idx: 1, value: 2.0 },
                ],
            }),
            constraints: vec![
                Constraint::new("c0", f64::NEG_INFINITY, 10.0),
                Constraint::equality("c1", 1.0),
            ],
            coefficients: SparseMatrix::from_triplets(
                MatrixLayout::ColumnMajor,
                2,
                2,
                &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, -1.0)],
            )
            .unwrap(),
            nonlinear: Vec::new(),
        }
    }

    #[test]
    fn test_variable_style_grows_model_by_one() {
        let model = build_model(&small_instance(), &ReverseOptions::default()).unwrap();
        assert_eq!(model.num_rows(), 3);
        assert_eq!(model.num_cols(), 3);
        // 4 matrix entries + 2 objective entries + 1 tie-in
        assert_eq!(model.num_nonzeros(), 7);

        let obj_row = &model.rows()[2];
        assert_eq!(obj_row.kind, NativeRowKind::Equality);
        assert_eq!(obj_row.rhs, -5.0);

        let obj_col = &model.cols()[2];
        assert_eq!(obj_col.kind, NativeColKind::Continuous);
        assert_eq!(obj_col.lower, f64::NEG_INFINITY);
        assert_eq!(obj_col.upper, f64::INFINITY);
        assert_eq!(obj_col.entries.len(), 1);
        assert_eq!(obj_col.entries[0].row, 2);
        assert_eq!(obj_col.entries[0].value, -1.0);
    }

    #[test]
    fn test_objective_coefficients_rerouted_into_columns() {
        let model = build_model(&small_instance(), &ReverseOptions::default()).unwrap();
        // column 0 holds its two matrix entries plus the rerouted objective
        // coefficient on the last row
        let entries: Vec<(usize, f64)> = model.cols()[0]
            .entries
            .iter()
            .map(|e| (e.row, e.value))
            .collect();
        assert_eq!(entries, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
        let entries: Vec<(usize, f64)> = model.cols()[1]
            .entries
            .iter()
            .map(|e| (e.row, e.value))
            .collect();
        assert_eq!(entries, vec![(0, 1.0), (1, -1.0), (2, 2.0)]);
    }

    #[test]
    fn test_stats_tally_declared_rows_and_cols_only() {
        let model = build_model(&small_instance(), &ReverseOptions::default()).unwrap();
        let stats = model.stats();
        assert_eq!(stats.num_rows, 3);
        assert_eq!(stats.num_cols, 3);
        assert_eq!(stats.rows_equality, 1);
        assert_eq!(stats.rows_less, 1);
        assert_eq!(stats.rows_greater, 0);
        assert_eq!(stats.cols_continuous, 2);
        assert_eq!(stats.objective_row, Some(2));
        assert_eq!(stats.objective_col, Some(2));
    }

    #[test]
    fn test_function_style_keeps_dimensions() {
        let options = ReverseOptions {
            obj_style: ObjStyle::Function,
            ..ReverseOptions::default()
        };
        let model = build_model(&small_instance(), &options).unwrap();
        assert_eq!(model.num_rows(), 2);
        assert_eq!(model.num_cols(), 2);
        assert_eq!(model.obj_constant(), 5.0);
        let coefs: Vec<(usize, f64)> = model
            .objective()
            .iter()
            .map(|e| (e.col, e.value))
            .collect();
        assert_eq!(coefs, vec![(0, 1.0), (1, 2.0)]);
        assert_eq!(model.stats().objective_row, None);
    }

    #[test]
    fn test_ranged_row_fails_before_declarations() {
        let mut instance = small_instance();
        instance.constraints[1] = Constraint::new("ranged", 1.0, 2.0);
        let err = build_model(&instance, &ReverseOptions::default());
        assert!(matches!(
            err,
            Err(OslinkError::RangedConstraint { index: 1 })
        ));
    }

    #[test]
    fn test_exotic_variable_kind_fails_before_declarations() {
        let mut instance = small_instance();
        instance.variables[1].kind = VarKind::SemiContinuous;
        let err = build_model(&instance, &ReverseOptions::default());
        assert!(matches!(
            err,
            Err(OslinkError::UnsupportedVariableType { index: 1, .. })
        ));
    }

    #[test]
    fn test_nonlinear_instance_is_rejected() {
        let mut instance = small_instance();
        instance.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::Square(Box::new(Expr::var(0))),
        });
        assert!(matches!(
            build_model(&instance, &ReverseOptions::default()),
            Err(OslinkError::Unsupported(_))
        ));
    }

    #[test]
    fn test_discrete_variables_make_it_a_mip() {
        let mut instance = small_instance();
        instance.variables[0].kind = VarKind::Binary;
        instance.variables[0].upper = 1.0;
        let model = build_model(&instance, &ReverseOptions::default()).unwrap();
        assert_eq!(model.model_class(), ModelClass::Mip);
        assert_eq!(model.stats().cols_binary, 1);
        assert_eq!(model.stats().cols_continuous, 1);
    }

    #[test]
    fn test_zero_objective_coefficient_not_declared() {
        let mut instance = small_instance();
        if let Some(obj) = &mut instance.objective {
            obj.coefficients[1].value = 0.0;
        }
        let model = build_model(&instance, &ReverseOptions::default()).unwrap();
        // one fewer rerouted entry
        assert_eq!(model.num_nonzeros(), 6);
        assert_eq!(model.cols()[1].entries.len(), 2);
    }

    #[test]
    fn test_initial_levels_clamped_into_bounds() {
        let mut instance = small_instance();
        instance.variables[0].level = -4.0;
        instance.variables[1].level = 99.0;
        let model = build_model(&instance, &ReverseOptions::default()).unwrap();
        assert_eq!(model.cols()[0].level, 0.0);
        assert_eq!(model.cols()[1].level, 8.0);
    }

    #[test]
    fn test_instance_without_objective_is_a_constrained_system() {
        let mut instance = small_instance();
        instance.objective = None;
        let model = build_model(&instance, &ReverseOptions::default()).unwrap();
        assert_eq!(model.model_class(), ModelClass::Cns);
        assert_eq!(model.num_rows(), 2);
        assert_eq!(model.num_cols(), 2);
        assert_eq!(model.stats().objective_row, None);
    }

    #[test]
    fn test_function_style_round_trip_is_stable() {
        let options = ReverseOptions {
            obj_style: ObjStyle::Function,
            ..ReverseOptions::default()
        };
        let first = build_model(&small_instance(), &options).unwrap();
        let relayed = build_instance(&first).unwrap();
        let second = build_model(&relayed, &options).unwrap();
        assert_eq!(first, second);
    }
}
