//! Writes a canonical solve result into a native model.

use crate::model::{special, BasisStatus, ModelObject};
use oslink_core::{GeneralStatusKind, ModelStatus, SolveResult, SolveStatus};
use tracing::{error, warn};

/// Writes `result` into `model`: status codes always, then levels,
/// marginals, and the objective value when the document carries a usable
/// solution.
///
/// The mapping is total. A missing or error header, a dimension mismatch,
/// or an out-of-range value index lands as an error status pair on the
/// model instead of failing the call.
pub fn write_solution(result: &SolveResult, model: &mut ModelObject) {
    let general = match &result.general {
        None => {
            error!("result document has no general status, reporting a solver failure");
            model.set_model_status(ModelStatus::ErrorNoSolution);
            model.set_solve_status(SolveStatus::SolverError);
            return;
        }
        Some(general) => general,
    };
    match &general.kind {
        GeneralStatusKind::Error => {
            error!(
                description = %general.description,
                "result document reports an error"
            );
            model.set_model_status(ModelStatus::ErrorNoSolution);
            model.set_solve_status(SolveStatus::SolverError);
            return;
        }
        GeneralStatusKind::Warning => {
            warn!(
                description = %general.description,
                "result document reports a warning"
            );
        }
        _ => {}
    }

    let (model_status, solve_status) = result.native_status();
    model.set_model_status(model_status);
    model.set_solve_status(solve_status);
    let solution = match result.first_solution() {
        None => return,
        Some(solution) => solution,
    };

    // the counts the document declares cover the problem-sized part of the
    // model; a synthetic objective row or column sits past that part
    let expected_cols = model.num_cols() - usize::from(model.stats().objective_col.is_some());
    let expected_rows = model.num_rows() - usize::from(model.stats().objective_row.is_some());
    if let Some(nvar) = result.num_variables {
        if nvar != expected_cols {
            error!("result document reports {nvar} variables for a model with {expected_cols}");
            model.set_model_status(ModelStatus::ErrorNoSolution);
            model.set_solve_status(SolveStatus::SystemError);
            return;
        }
    }
    if let Some(ncon) = result.num_constraints {
        if ncon != expected_rows {
            error!("result document reports {ncon} constraints for a model with {expected_rows}");
            model.set_model_status(ModelStatus::ErrorNoSolution);
            model.set_solve_status(SolveStatus::SystemError);
            return;
        }
    }

    // not-available defaults with a superbasic basis, then the sparse
    // overlays from the document
    let n = model.num_cols();
    let m = model.num_rows();
    let mut col_levels = vec![special::NA; n];
    let mut col_marginals = vec![special::NA; n];
    let col_basis = vec![BasisStatus::Superbasic; n];
    let row_levels = vec![special::NA; m];
    let mut row_marginals = vec![special::NA; m];
    let row_basis = vec![BasisStatus::Superbasic; m];

    for &(idx, value) in &solution.variable_values {
        if idx >= expected_cols {
            report_bad_index(model, "variable", idx, expected_cols);
            return;
        }
        col_levels[idx] = value;
    }
    for &(idx, value) in &solution.reduced_costs {
        if idx >= expected_cols {
            report_bad_index(model, "reduced cost", idx, expected_cols);
            return;
        }
        col_marginals[idx] = value;
    }
    for &(idx, value) in &solution.dual_values {
        if idx >= expected_rows {
            report_bad_index(model, "dual value", idx, expected_rows);
            return;
        }
        row_marginals[idx] = value;
    }

    if let Err(err) = model.set_solution(
        &col_levels,
        &col_marginals,
        &col_basis,
        &row_levels,
        &row_marginals,
        &row_basis,
    ) {
        error!("failed to store the solution: {err}");
        model.set_model_status(ModelStatus::ErrorNoSolution);
        model.set_solve_status(SolveStatus::SystemError);
        return;
    }
    if let Some(value) = solution.objective_value {
        model.set_objective_value(value);
    }
}

fn report_bad_index(model: &mut ModelObject, what: &str, idx: usize, limit: usize) {
    error!("solution references {what} index {idx} of {limit}, reporting a system failure");
    model.set_model_status(ModelStatus::ErrorNoSolution);
    model.set_solve_status(SolveStatus::SystemError);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NativeColKind, NativeRowKind};
    use oslink_core::{GeneralStatus, Solution, SolutionStatus};

    fn two_var_model() -> ModelObject {
        let mut model = ModelObject::new("solwrite");
        model.init(1, 2, 0);
        model
            .add_row(1, NativeRowKind::LessEqual, 10.0, BasisStatus::Superbasic)
            .unwrap();
        for j in 0..2 {
            model
                .add_col(
                    j + 1,
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
        model
    }

    fn success_result(solutions: Vec<Solution>) -> SolveResult {
        SolveResult {
            general: Some(GeneralStatus {
                kind: GeneralStatusKind::Success,
                description: String::new(),
            }),
            num_variables: Some(2),
            num_constraints: Some(1),
            solutions,
            ..SolveResult::empty()
        }
    }

    #[test]
    fn test_missing_header_reports_solver_failure() {
        let mut model = two_var_model();
        write_solution(&SolveResult::empty(), &mut model);
        assert_eq!(model.model_status().code(), 13);
        assert_eq!(model.solve_status().code(), 10);
    }

    #[test]
    fn test_error_header_reports_solver_failure() {
        let mut model = two_var_model();
        let result = SolveResult {
            general: Some(GeneralStatus {
                kind: GeneralStatusKind::Error,
                description: "it broke".to_string(),
            }),
            ..SolveResult::empty()
        };
        write_solution(&result, &mut model);
        assert_eq!(model.model_status(), ModelStatus::ErrorNoSolution);
        assert_eq!(model.solve_status(), SolveStatus::SolverError);
    }

    #[test]
    fn test_empty_solution_list_reports_none_returned() {
        let mut model = two_var_model();
        write_solution(&success_result(Vec::new()), &mut model);
        assert_eq!(model.model_status(), ModelStatus::NoSolutionReturned);
        assert_eq!(model.solve_status(), SolveStatus::Normal);
    }

    #[test]
    fn test_globally_optimal_maps_to_optimal_normal() {
        let mut model = two_var_model();
        let result = success_result(vec![Solution::new(SolutionStatus::GloballyOptimal)]);
        write_solution(&result, &mut model);
        assert_eq!(model.model_status(), ModelStatus::Optimal);
        assert_eq!(model.solve_status(), SolveStatus::Normal);
    }

    #[test]
    fn test_unsure_maps_to_intermediate_not_error() {
        let mut model = two_var_model();
        let result = success_result(vec![Solution::new(SolutionStatus::Unsure)]);
        write_solution(&result, &mut model);
        assert_eq!(model.model_status(), ModelStatus::IntermediateInfeasible);
        assert_eq!(model.solve_status(), SolveStatus::Normal);
    }

    #[test]
    fn test_values_overlay_not_available_defaults() {
        let mut model = two_var_model();
        let mut solution = Solution::new(SolutionStatus::Optimal);
        solution.variable_values = vec![(1, 7.5)];
        solution.reduced_costs = vec![(0, 0.25)];
        solution.dual_values = vec![(0, -1.5)];
        solution.objective_value = Some(42.0);
        write_solution(&success_result(vec![solution]), &mut model);

        assert_eq!(model.cols()[0].level, special::NA);
        assert_eq!(model.cols()[1].level, 7.5);
        assert_eq!(model.cols()[0].marginal, 0.25);
        assert_eq!(model.cols()[1].marginal, special::NA);
        assert_eq!(model.rows()[0].marginal, -1.5);
        assert_eq!(model.rows()[0].level, special::NA);
        assert_eq!(model.cols()[0].basis, BasisStatus::Superbasic);
        assert_eq!(model.objective_value(), Some(42.0));
    }

    #[test]
    fn test_dimension_mismatch_reports_system_failure() {
        let mut model = two_var_model();
        let mut result = success_result(vec![Solution::new(SolutionStatus::Optimal)]);
        result.num_variables = Some(5);
        write_solution(&result, &mut model);
        assert_eq!(model.model_status(), ModelStatus::ErrorNoSolution);
        assert_eq!(model.solve_status(), SolveStatus::SystemError);
    }

    #[test]
    fn test_out_of_range_value_index_reports_system_failure() {
        let mut model = two_var_model();
        let mut solution = Solution::new(SolutionStatus::Optimal);
        solution.variable_values = vec![(9, 1.0)];
        write_solution(&success_result(vec![solution]), &mut model);
        assert_eq!(model.model_status(), ModelStatus::ErrorNoSolution);
        assert_eq!(model.solve_status(), SolveStatus::SystemError);
    }

    #[test]
    fn test_synthetic_objective_part_excluded_from_dimension_check() {
        use crate::reverse::{build_model, ReverseOptions};
        use oslink_core::{
            Constraint, MatrixLayout, ObjCoef, Objective, Sense, SparseMatrix, Variable,
        };

        let instance = oslink_core::Instance {
            name: "dims".to_string(),
            description: String::new(),
            variables: vec![
                Variable::continuous("a", 0.0, 1.0),
                Variable::continuous("b", 0.0, 1.0),
            ],
            objective: Some(Objective {
                name: "obj".to_string(),
                sense: Sense::Minimize,
                constant: 0.0,
                weight: 1.0,
                coefficients: vec![ObjCoef { idx: 0, value: 1.0 }],
            }),
            constraints: vec![Constraint::new("c0", f64::NEG_INFINITY, 1.0)],
            coefficients: SparseMatrix::from_triplets(
                MatrixLayout::ColumnMajor,
                1,
                2,
                &[(0, 0, 1.0), (0, 1, 1.0)],
            )
            .unwrap(),
            nonlinear: Vec::new(),
        };
        let mut model = build_model(&instance, &ReverseOptions::default()).unwrap();
        assert_eq!(model.num_cols(), 3);

        // the document talks about the 2-variable problem, not the grown model
        let result = success_result(vec![Solution::new(SolutionStatus::Optimal)]);
        write_solution(&result, &mut model);
        assert_eq!(model.model_status(), ModelStatus::Optimal);
        assert_eq!(model.solve_status(), SolveStatus::Normal);
    }
}
