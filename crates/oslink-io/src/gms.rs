//! GAMS text-model emission.
//!
//! Produces a plain algebraic model from an [`Instance`]: equation and
//! variable declarations, bound statements, one definition block per row,
//! and the closing model/solve statements. Names are positional (`x3`,
//! `eq0`) so the emitted text lines up with the variable references inside
//! rendered expressions. Ranged rows and semicontinuous variables have no
//! counterpart in this surface and are fatal.

use std::collections::BTreeMap;

use oslink_core::{
    Constraint, Expr, Instance, Objective, OslinkError, OslinkResult, RowKind, RowRef, VarKind,
};

/// Emits an instance as GAMS model text.
pub fn write_gms(instance: &Instance) -> OslinkResult<String> {
    instance.validate()?;
    for (index, var) in instance.variables.iter().enumerate() {
        if matches!(var.kind, VarKind::SemiContinuous | VarKind::SemiInteger) {
            return Err(OslinkError::UnsupportedVariableType {
                index,
                kind: var.kind.letter().to_string(),
            });
        }
    }

    let num_rows = instance.num_constraints();
    let mut trees: BTreeMap<i64, &Expr> = BTreeMap::new();
    for entry in &instance.nonlinear {
        let key = match entry.row {
            RowRef::Objective => -1,
            RowRef::Constraint(i) => i as i64,
        };
        trees.insert(key, &entry.tree);
    }
    let matrix = instance.coefficients.to_row_major();

    let mut out = String::with_capacity(1024);
    push_declarations(&mut out, instance);
    push_bounds(&mut out, instance);

    // definition blocks: the objective first, then rows in index order
    let mut covered = vec![false; num_rows];
    if let (Some(obj), Some(tree)) = (&instance.objective, trees.get(&-1)) {
        push_objective_block(&mut out, obj, Some(tree));
    }
    for (&key, tree) in &trees {
        if key < 0 {
            continue;
        }
        let j = key as usize;
        covered[j] = true;
        out.push_str(&format!("eq{j}.. {}\n", tree.render()));
        let (indexes, values) = matrix.segment(j);
        push_terms(&mut out, indexes.iter().copied().zip(values.iter().copied()));
        push_relation(&mut out, &instance.constraints[j], j)?;
    }
    if let Some(obj) = &instance.objective {
        if !trees.contains_key(&-1) {
            push_objective_block(&mut out, obj, None);
        }
    }
    for (j, con) in instance.constraints.iter().enumerate() {
        if covered[j] {
            continue;
        }
        out.push_str(&format!("eq{j}.. "));
        let (indexes, values) = matrix.segment(j);
        let written =
            push_terms(&mut out, indexes.iter().copied().zip(values.iter().copied()));
        if written == 0 {
            out.push_str("0\n");
        }
        push_relation(&mut out, con, j)?;
    }

    out.push_str("Model m /all/;\n\n");
    match &instance.objective {
        Some(obj) => out.push_str(&format!(
            "Solve m {} Obj using {};\n\n",
            obj.sense,
            instance.model_class()
        )),
        None => out.push_str("Solve m using CNS;\n\n"),
    }
    Ok(out)
}

fn push_declarations(out: &mut String, instance: &Instance) {
    let num_rows = instance.num_constraints();
    match &instance.objective {
        Some(_) => {
            out.push_str("Equations eqObj");
            for j in 0..num_rows {
                out.push_str(&format!(", eq{j}\n"));
            }
            out.push_str(";\n\n");
        }
        None if num_rows > 0 => {
            out.push_str("Equations eq0");
            for j in 1..num_rows {
                out.push_str(&format!(", eq{j}\n"));
            }
            out.push_str(";\n\n");
        }
        None => {}
    }

    let continuous: Vec<usize> = kind_indexes(instance, VarKind::Continuous);
    match &instance.objective {
        Some(_) => {
            out.push_str("Variables Obj");
            for i in &continuous {
                out.push_str(&format!(", x{i}\n"));
            }
            out.push_str(";\n\n");
        }
        None => {
            if let Some((first, rest)) = continuous.split_first() {
                out.push_str(&format!("Variables x{first}"));
                for i in rest {
                    out.push_str(&format!(", x{i}\n"));
                }
                out.push_str(";\n\n");
            }
        }
    }

    push_kind_section(out, "Binary Variables ", &kind_indexes(instance, VarKind::Binary));
    push_kind_section(out, "Integer Variables ", &kind_indexes(instance, VarKind::Integer));
}

fn kind_indexes(instance: &Instance, kind: VarKind) -> Vec<usize> {
    instance
        .variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.kind == kind)
        .map(|(i, _)| i)
        .collect()
}

fn push_kind_section(out: &mut String, header: &str, indexes: &[usize]) {
    if indexes.is_empty() {
        return;
    }
    out.push_str(header);
    for (pos, i) in indexes.iter().enumerate() {
        out.push_str(&format!("x{i}"));
        if pos + 1 != indexes.len() {
            out.push_str(", \n");
        }
    }
    out.push_str(";\n\n");
}

/// Bound statements for every variable whose bounds differ from the GAMS
/// defaults of its declaration section (free for `Variables`, [0,1] for
/// binaries, [0,+inf) for integers).
fn push_bounds(out: &mut String, instance: &Instance) {
    for (i, var) in instance.variables.iter().enumerate() {
        let (default_lower, default_upper) = match var.kind {
            VarKind::Continuous => (f64::NEG_INFINITY, f64::INFINITY),
            VarKind::Binary => (0.0, 1.0),
            VarKind::Integer => (0.0, f64::INFINITY),
            VarKind::SemiContinuous | VarKind::SemiInteger => continue,
        };
        let mut wrote = false;
        if var.lower != default_lower {
            out.push_str(&format!("x{i}.lo = {};\n", var.lower));
            wrote = true;
        }
        if var.upper != default_upper {
            out.push_str(&format!("x{i}.up = {};\n", var.upper));
            wrote = true;
        }
        if wrote {
            out.push('\n');
        }
    }
    out.push('\n');
}

fn push_objective_block(out: &mut String, obj: &Objective, tree: Option<&Expr>) {
    match tree {
        Some(tree) => out.push_str(&format!("eqObj.. {}\n", tree.render())),
        None => out.push_str("eqObj.. "),
    }
    push_terms(out, obj.coefficients.iter().map(|c| (c.idx, c.value)));
    // the constant keeps the left side non-empty even without coefficients
    out.push_str(&format!(" + {} =E= Obj;\n\n", obj.constant));
}

fn push_terms(out: &mut String, terms: impl Iterator<Item = (usize, f64)>) -> usize {
    let mut written = 0;
    for (idx, value) in terms {
        if value == 0.0 {
            continue;
        }
        out.push_str(" + ");
        if value != 1.0 {
            if value < 0.0 {
                out.push_str(&format!("({value})"));
            } else {
                out.push_str(&format!("{value}"));
            }
            out.push_str(" * ");
        }
        out.push_str(&format!("x{idx}\n"));
        written += 1;
    }
    written
}

fn push_relation(out: &mut String, con: &Constraint, index: usize) -> OslinkResult<()> {
    let (letter, rhs) = match con.kind() {
        RowKind::Equality => ('E', con.rhs() - con.constant),
        RowKind::LessEqual => ('L', con.rhs() - con.constant),
        RowKind::GreaterEqual => ('G', con.rhs() - con.constant),
        RowKind::Free => ('N', 0.0),
        RowKind::Ranged => return Err(OslinkError::RangedConstraint { index }),
    };
    out.push_str(&format!(" ={letter}= {rhs};\n\n"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oslink_core::{
        MatrixLayout, NonlinearEntry, ObjCoef, Sense, SparseMatrix, Variable,
    };

    fn linear_instance() -> Instance {
        Instance {
            name: "small".to_string(),
            description: String::new(),
            variables: vec![
                Variable::continuous("a", 0.0, 10.0),
                Variable::continuous("b", f64::NEG_INFINITY, f64::INFINITY),
            ],
            objective: Some(Objective {
                name: "cost".to_string(),
                sense: Sense::Minimize,
                constant: 0.0,
                weight: 1.0,
                coefficients: vec![ObjCoef { idx: 0, value: 3.0 }],
            }),
            constraints: vec![Constraint::new("cap", f64::NEG_INFINITY, 4.0)],
            coefficients: SparseMatrix::from_triplets(
                MatrixLayout::ColumnMajor,
                1,
                2,
                &[(0, 0, 2.0), (0, 1, 1.0)],
            )
            .unwrap(),
            nonlinear: Vec::new(),
        }
    }

    #[test]
    fn test_linear_model_emission() {
        let text = write_gms(&linear_instance()).unwrap();
        let expected = "Equations eqObj, eq0
;

Variables Obj, x0
, x1
;

x0.lo = 0;
x0.up = 10;


eqObj..  + 3 * x0
 + 0 =E= Obj;

eq0..  + 2 * x0
 + x1
 =L= 4;

Model m /all/;

Solve m min Obj using LP;

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_discrete_sections_and_bounds() {
        let mut inst = linear_instance();
        inst.variables.push(Variable {
            name: "pick".to_string(),
            kind: VarKind::Binary,
            lower: 1.0,
            upper: 1.0,
            level: 0.0,
        });
        inst.variables.push(Variable {
            name: "also".to_string(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
            level: 0.0,
        });
        inst.variables.push(Variable {
            name: "count".to_string(),
            kind: VarKind::Integer,
            lower: 0.0,
            upper: 5.0,
            level: 0.0,
        });
        inst.coefficients = SparseMatrix::from_triplets(
            MatrixLayout::ColumnMajor,
            1,
            5,
            &[(0, 0, 2.0), (0, 1, 1.0)],
        )
        .unwrap();

        let text = write_gms(&inst).unwrap();
        assert!(text.contains("Binary Variables x2, \nx3;\n\n"));
        assert!(text.contains("Integer Variables x4;\n\n"));
        // the fixed binary gets a .lo, the defaulted one nothing
        assert!(text.contains("x2.lo = 1;\n"));
        assert!(!text.contains("x3.lo"));
        assert!(!text.contains("x3.up"));
        assert!(text.contains("x4.up = 5;\n"));
        assert!(text.contains("Solve m min Obj using MIP;\n"));
    }

    #[test]
    fn test_nonlinear_row_block() {
        let mut inst = linear_instance();
        inst.constraints[0] = Constraint::equality("bal", 1.0);
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::Sin(Box::new(Expr::var(0))),
        });
        let text = write_gms(&inst).unwrap();
        assert!(text.contains("eq0.. sin(x0)\n + 2 * x0\n + x1\n =E= 1;\n\n"));
        assert!(text.contains("Solve m min Obj using NLP;\n"));
        // the linear objective block still follows the nonlinear rows
        let row_at = text.find("eq0..").unwrap();
        let obj_at = text.find("eqObj.. ").unwrap();
        assert!(obj_at > row_at);
    }

    #[test]
    fn test_nonlinear_objective_block_comes_first() {
        let mut inst = linear_instance();
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Objective,
            tree: Expr::power(Expr::var(1), Expr::Number(2.0)),
        });
        inst.nonlinear.push(NonlinearEntry {
            row: RowRef::Constraint(0),
            tree: Expr::Exp(Box::new(Expr::var(0))),
        });
        let text = write_gms(&inst).unwrap();
        assert!(text.contains("eqObj.. (x1 ** 2)\n + 3 * x0\n + 0 =E= Obj;\n\n"));
        let obj_at = text.find("eqObj.. (").unwrap();
        let row_at = text.find("eq0.. exp(x0)").unwrap();
        assert!(obj_at < row_at);
    }

    #[test]
    fn test_constrained_system_emission() {
        let inst = Instance {
            name: "square".to_string(),
            description: String::new(),
            variables: vec![Variable::continuous(
                "a",
                f64::NEG_INFINITY,
                f64::INFINITY,
            )],
            objective: None,
            constraints: vec![Constraint::equality("bal", 2.0)],
            coefficients: SparseMatrix::from_triplets(
                MatrixLayout::ColumnMajor,
                1,
                1,
                &[(0, 0, 1.0)],
            )
            .unwrap(),
            nonlinear: Vec::new(),
        };
        let text = write_gms(&inst).unwrap();
        let expected = "Equations eq0;

Variables x0;


eq0..  + x0
 =E= 2;

Model m /all/;

Solve m using CNS;

";
        assert_eq!(text, expected);
        assert!(!text.contains("Obj"));
    }

    #[test]
    fn test_ranged_row_is_fatal() {
        let mut inst = linear_instance();
        inst.constraints[0] = Constraint::new("r", 1.0, 4.0);
        let err = write_gms(&inst).unwrap_err();
        assert!(matches!(err, OslinkError::RangedConstraint { index: 0 }));
    }

    #[test]
    fn test_semicontinuous_variable_is_fatal() {
        let mut inst = linear_instance();
        inst.variables[1].kind = VarKind::SemiContinuous;
        inst.variables[1].lower = 1.0;
        inst.variables[1].upper = 5.0;
        let err = write_gms(&inst).unwrap_err();
        assert!(matches!(
            err,
            OslinkError::UnsupportedVariableType { index: 1, .. }
        ));
    }

    #[test]
    fn test_row_constant_folds_into_rhs() {
        let mut inst = linear_instance();
        inst.constraints[0].constant = 1.5;
        let text = write_gms(&inst).unwrap();
        assert!(text.contains(" =L= 2.5;\n"));
    }

    #[test]
    fn test_free_and_empty_row() {
        let mut inst = linear_instance();
        inst.constraints[0] = Constraint::new("note", f64::NEG_INFINITY, f64::INFINITY);
        inst.coefficients = SparseMatrix::empty(MatrixLayout::ColumnMajor, 1, 2);
        let text = write_gms(&inst).unwrap();
        assert!(text.contains("eq0.. 0\n =N= 0;\n\n"));
    }

    #[test]
    fn test_zero_and_negative_coefficients() {
        let mut inst = linear_instance();
        inst.coefficients = SparseMatrix::new(
            MatrixLayout::ColumnMajor,
            1,
            2,
            vec![0, 1, 2],
            vec![0, 0],
            vec![0.0, -2.5],
        )
        .unwrap();
        let text = write_gms(&inst).unwrap();
        // the explicit zero is dropped, the negative is parenthesized
        assert!(text.contains("eq0..  + (-2.5) * x1\n =L= 4;\n\n"));
    }
}
