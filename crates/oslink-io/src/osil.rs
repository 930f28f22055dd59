//! Reader and writer for the XML problem-instance format.
//!
//! The reader is an event-driven pass over the document: sections fill the
//! flat parts of the [`Instance`] directly, and expression trees are built
//! bottom-up on an explicit frame stack. The writer emits the same element
//! vocabulary, omitting attributes that hold their schema default so a
//! written document reads back as an equal instance.

use std::fs;
use std::path::Path;

use oslink_core::{
    Constraint, Expr, Instance, MatrixLayout, NonlinearEntry, ObjCoef, Objective, OslinkError,
    OslinkResult, RowRef, Sense, SparseMatrix, VarKind, Variable,
};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::xml::{
    attribute_value, f64_attr, i64_attr, local_name_as_str, parse_f64, parse_usize, usize_attr,
    xml_error,
};

/// Parses a problem document into a validated [`Instance`].
pub fn read_osil(xml: &str) -> OslinkResult<Instance> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut parser = Parser::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.handle_start(e)?,
            Ok(Event::Empty(ref e)) => parser.handle_empty(e)?,
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(xml_error)?;
                parser.handle_text(text.trim())?;
            }
            Ok(Event::End(ref e)) => parser.handle_end(e)?,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error(err)),
        }
    }
    parser.finish()
}

/// Reads and parses a problem document from a file.
pub fn read_osil_file(path: impl AsRef<Path>) -> OslinkResult<Instance> {
    let xml = fs::read_to_string(path)?;
    read_osil(&xml)
}

/// Which compressed-array container an `<el>` belongs to.
#[derive(Clone, Copy, PartialEq)]
enum NumericTarget {
    Starts,
    Indexes,
    Values,
}

/// Expression operators, keyed by their element names.
#[derive(Clone, Copy, PartialEq)]
enum ExprOp {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Negate,
    Sum,
    Product,
    Min,
    Max,
    Abs,
    Square,
    Sqrt,
    Ln,
    Exp,
    Sin,
    Cos,
}

impl ExprOp {
    fn from_tag(tag: &str) -> Option<ExprOp> {
        match tag {
            "plus" => Some(ExprOp::Plus),
            "minus" => Some(ExprOp::Minus),
            "times" => Some(ExprOp::Times),
            "divide" => Some(ExprOp::Divide),
            "power" => Some(ExprOp::Power),
            "negate" => Some(ExprOp::Negate),
            "sum" => Some(ExprOp::Sum),
            "product" => Some(ExprOp::Product),
            "min" => Some(ExprOp::Min),
            "max" => Some(ExprOp::Max),
            "abs" => Some(ExprOp::Abs),
            "square" => Some(ExprOp::Square),
            "squareRoot" => Some(ExprOp::Sqrt),
            "ln" => Some(ExprOp::Ln),
            "exp" => Some(ExprOp::Exp),
            "sin" => Some(ExprOp::Sin),
            "cos" => Some(ExprOp::Cos),
            _ => None,
        }
    }
}

struct ExprFrame {
    op: ExprOp,
    children: Vec<Expr>,
}

struct Parser {
    name: String,
    description: String,
    variables: Vec<Variable>,
    objectives: Vec<Objective>,
    constraints: Vec<Constraint>,
    nonlinear: Vec<NonlinearEntry>,
    declared_variables: Option<usize>,
    declared_objectives: Option<usize>,
    declared_constraints: Option<usize>,
    declared_nonzeros: Option<usize>,
    declared_expressions: Option<usize>,
    obj_declared_coefs: Option<usize>,
    starts: Vec<usize>,
    indexes: Vec<usize>,
    values: Vec<f64>,
    layout: Option<MatrixLayout>,
    in_coefficients: bool,
    numeric_target: Option<NumericTarget>,
    expr_row: Option<RowRef>,
    expr_stack: Vec<ExprFrame>,
    expr_root: Option<Expr>,
    coef_idx: Option<usize>,
    active_tag: Option<String>,
}

impl Parser {
    fn new() -> Parser {
        Parser {
            name: String::new(),
            description: String::new(),
            variables: Vec::new(),
            objectives: Vec::new(),
            constraints: Vec::new(),
            nonlinear: Vec::new(),
            declared_variables: None,
            declared_objectives: None,
            declared_constraints: None,
            declared_nonzeros: None,
            declared_expressions: None,
            obj_declared_coefs: None,
            starts: Vec::new(),
            indexes: Vec::new(),
            values: Vec::new(),
            layout: None,
            in_coefficients: false,
            numeric_target: None,
            expr_row: None,
            expr_stack: Vec::new(),
            expr_root: None,
            coef_idx: None,
            active_tag: None,
        }
    }

    fn handle_start(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        self.active_tag = Some(tag.to_string());
        if self.expr_row.is_some() {
            return self.expression_element(tag, e);
        }
        match tag {
            "variables" => self.declared_variables = usize_attr(e, "numberOfVariables")?,
            "var" => self.push_variable(e)?,
            "objectives" => self.declared_objectives = usize_attr(e, "numberOfObjectives")?,
            "obj" => self.push_objective(e)?,
            "coef" => {
                self.coef_idx = Some(usize_attr(e, "idx")?.ok_or_else(|| {
                    OslinkError::MalformedDocument("<coef> without an idx attribute".to_string())
                })?);
            }
            "constraints" => self.declared_constraints = usize_attr(e, "numberOfConstraints")?,
            "con" => self.push_constraint(e)?,
            "linearConstraintCoefficients" => {
                self.declared_nonzeros = usize_attr(e, "numberOfValues")?;
                self.in_coefficients = true;
            }
            "start" => self.numeric_target = Some(NumericTarget::Starts),
            "rowIdx" => {
                self.set_layout(MatrixLayout::ColumnMajor)?;
                self.numeric_target = Some(NumericTarget::Indexes);
            }
            "colIdx" => {
                self.set_layout(MatrixLayout::RowMajor)?;
                self.numeric_target = Some(NumericTarget::Indexes);
            }
            "nonlinearExpressions" => {
                self.declared_expressions = usize_attr(e, "numberOfNonlinearExpressions")?;
            }
            "nl" => self.begin_expression(e)?,
            "value" if self.in_coefficients => {
                self.numeric_target = Some(NumericTarget::Values);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_empty(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        if self.expr_row.is_some() {
            return self.expression_element(tag, e);
        }
        match tag {
            "variables" => self.declared_variables = usize_attr(e, "numberOfVariables")?,
            "var" => self.push_variable(e)?,
            "objectives" => self.declared_objectives = usize_attr(e, "numberOfObjectives")?,
            "obj" => {
                self.push_objective(e)?;
                self.close_objective()?;
            }
            "coef" => {
                return Err(OslinkError::MalformedDocument(
                    "objective coefficient without a value".to_string(),
                ));
            }
            "constraints" => self.declared_constraints = usize_attr(e, "numberOfConstraints")?,
            "con" => self.push_constraint(e)?,
            "linearConstraintCoefficients" => {
                self.declared_nonzeros = usize_attr(e, "numberOfValues")?;
            }
            "nonlinearExpressions" => {
                self.declared_expressions = usize_attr(e, "numberOfNonlinearExpressions")?;
            }
            "nl" => {
                return Err(OslinkError::MalformedDocument(
                    "<nl> holds no expression".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) -> OslinkResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        match self.active_tag.as_deref() {
            Some("name") => self.name = text.to_string(),
            Some("description") => self.description = text.to_string(),
            Some("coef") => {
                let idx = self.coef_idx.take().ok_or_else(|| {
                    OslinkError::MalformedDocument("stray objective coefficient text".to_string())
                })?;
                let value = parse_f64("coefficient", text)?;
                let obj = self.objectives.last_mut().ok_or_else(|| {
                    OslinkError::MalformedDocument(
                        "objective coefficient outside an objective".to_string(),
                    )
                })?;
                obj.coefficients.push(ObjCoef { idx, value });
            }
            Some("el") => match self.numeric_target {
                Some(NumericTarget::Starts) => self.starts.push(parse_usize("start", text)?),
                Some(NumericTarget::Indexes) => self.indexes.push(parse_usize("index", text)?),
                Some(NumericTarget::Values) => self.values.push(parse_f64("value", text)?),
                None => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn handle_end(&mut self, e: &quick_xml::events::BytesEnd) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        self.active_tag = None;
        if tag == "nl" {
            return self.finish_expression();
        }
        if self.expr_row.is_some() {
            match ExprOp::from_tag(tag) {
                Some(_) => {
                    let frame = self.expr_stack.pop().ok_or_else(|| {
                        OslinkError::MalformedDocument(format!("unexpected </{tag}>"))
                    })?;
                    let expr = build_expr(frame.op, frame.children)?;
                    return self.attach(expr);
                }
                // leaf elements were attached at their start tag
                None => return Ok(()),
            }
        }
        match tag {
            "start" | "rowIdx" | "colIdx" | "value" => self.numeric_target = None,
            "linearConstraintCoefficients" => self.in_coefficients = false,
            "obj" => self.close_objective()?,
            "coef" => {
                if self.coef_idx.take().is_some() {
                    return Err(OslinkError::MalformedDocument(
                        "objective coefficient without a value".to_string(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn push_variable(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let index = self.variables.len();
        let kind = match attribute_value(e, "type")? {
            None => VarKind::Continuous,
            Some(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => VarKind::from_letter(c).ok_or_else(|| {
                        OslinkError::UnsupportedVariableType {
                            index,
                            kind: text.clone(),
                        }
                    })?,
                    _ => return Err(OslinkError::UnsupportedVariableType { index, kind: text }),
                }
            }
        };
        self.variables.push(Variable {
            name: attribute_value(e, "name")?.unwrap_or_default(),
            kind,
            lower: bound_attr(e, "lb")?.unwrap_or(0.0),
            upper: bound_attr(e, "ub")?.unwrap_or(f64::INFINITY),
            level: f64_attr(e, "init")?.unwrap_or(0.0),
        });
        Ok(())
    }

    fn push_objective(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let sense = match attribute_value(e, "maxOrMin")?.as_deref() {
            None | Some("min") => Sense::Minimize,
            Some("max") => Sense::Maximize,
            Some(other) => {
                return Err(OslinkError::MalformedDocument(format!(
                    "bad objective direction '{other}'"
                )));
            }
        };
        self.obj_declared_coefs = usize_attr(e, "numberOfObjCoef")?;
        self.objectives.push(Objective {
            name: attribute_value(e, "name")?.unwrap_or_default(),
            sense,
            constant: f64_attr(e, "constant")?.unwrap_or(0.0),
            weight: f64_attr(e, "weight")?.unwrap_or(1.0),
            coefficients: Vec::new(),
        });
        Ok(())
    }

    fn close_objective(&mut self) -> OslinkResult<()> {
        let declared = self.obj_declared_coefs.take();
        let obj = self.objectives.last_mut().ok_or_else(|| {
            OslinkError::MalformedDocument("unexpected </obj>".to_string())
        })?;
        if let Some(declared) = declared {
            if declared != obj.coefficients.len() {
                return Err(OslinkError::MalformedDocument(format!(
                    "objective declares {declared} coefficients but lists {}",
                    obj.coefficients.len()
                )));
            }
        }
        obj.coefficients.sort_by_key(|c| c.idx);
        Ok(())
    }

    fn push_constraint(&mut self, e: &BytesStart) -> OslinkResult<()> {
        self.constraints.push(Constraint {
            name: attribute_value(e, "name")?.unwrap_or_default(),
            lower: bound_attr(e, "lb")?.unwrap_or(f64::NEG_INFINITY),
            upper: bound_attr(e, "ub")?.unwrap_or(f64::INFINITY),
            constant: f64_attr(e, "constant")?.unwrap_or(0.0),
        });
        Ok(())
    }

    fn set_layout(&mut self, layout: MatrixLayout) -> OslinkResult<()> {
        match self.layout {
            None => {
                self.layout = Some(layout);
                Ok(())
            }
            Some(existing) if existing == layout => Ok(()),
            Some(_) => Err(OslinkError::MalformedDocument(
                "coefficient block holds both row and column indexes".to_string(),
            )),
        }
    }

    fn begin_expression(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let idx = i64_attr(e, "idx")?.ok_or_else(|| {
            OslinkError::MalformedDocument("<nl> without an idx attribute".to_string())
        })?;
        let row = match idx {
            -1 => RowRef::Objective,
            i if i >= 0 => RowRef::Constraint(i as usize),
            _ => {
                return Err(OslinkError::MalformedDocument(format!(
                    "bad expression row index {idx}"
                )));
            }
        };
        self.expr_row = Some(row);
        self.expr_root = None;
        self.expr_stack.clear();
        Ok(())
    }

    fn expression_element(&mut self, tag: &str, e: &BytesStart) -> OslinkResult<()> {
        if let Some(leaf) = leaf_from_tag(tag, e)? {
            return self.attach(leaf);
        }
        if let Some(op) = ExprOp::from_tag(tag) {
            self.expr_stack.push(ExprFrame {
                op,
                children: Vec::new(),
            });
            return Ok(());
        }
        Err(OslinkError::Unsupported(format!(
            "expression element <{tag}>"
        )))
    }

    fn attach(&mut self, expr: Expr) -> OslinkResult<()> {
        match self.expr_stack.last_mut() {
            Some(frame) => frame.children.push(expr),
            None => {
                if self.expr_root.is_some() {
                    return Err(OslinkError::MalformedDocument(
                        "expression has more than one root".to_string(),
                    ));
                }
                self.expr_root = Some(expr);
            }
        }
        Ok(())
    }

    fn finish_expression(&mut self) -> OslinkResult<()> {
        let row = self.expr_row.take().ok_or_else(|| {
            OslinkError::MalformedDocument("unexpected </nl>".to_string())
        })?;
        if !self.expr_stack.is_empty() {
            return Err(OslinkError::MalformedDocument(
                "unterminated expression operator".to_string(),
            ));
        }
        let tree = self.expr_root.take().ok_or_else(|| {
            OslinkError::MalformedDocument("<nl> holds no expression".to_string())
        })?;
        self.nonlinear.push(NonlinearEntry { row, tree });
        Ok(())
    }

    fn finish(mut self) -> OslinkResult<Instance> {
        check_count("variables", self.declared_variables, self.variables.len())?;
        check_count("objectives", self.declared_objectives, self.objectives.len())?;
        check_count("constraints", self.declared_constraints, self.constraints.len())?;
        check_count(
            "nonlinear expressions",
            self.declared_expressions,
            self.nonlinear.len(),
        )?;
        let objective = match self.objectives.len() {
            0 => None,
            1 => self.objectives.pop(),
            count => return Err(OslinkError::MultiObjective { count }),
        };
        let coefficients = if self.values.is_empty() {
            check_count("coefficient values", self.declared_nonzeros, 0)?;
            SparseMatrix::empty(
                MatrixLayout::ColumnMajor,
                self.constraints.len(),
                self.variables.len(),
            )
        } else {
            check_count("coefficient values", self.declared_nonzeros, self.values.len())?;
            let layout = self.layout.ok_or_else(|| {
                OslinkError::MalformedDocument(
                    "coefficient block without row or column indexes".to_string(),
                )
            })?;
            SparseMatrix::new(
                layout,
                self.constraints.len(),
                self.variables.len(),
                self.starts,
                self.indexes,
                self.values,
            )?
        };
        let instance = Instance {
            name: self.name,
            description: self.description,
            variables: self.variables,
            objective,
            constraints: self.constraints,
            coefficients,
            nonlinear: self.nonlinear,
        };
        instance.validate()?;
        Ok(instance)
    }
}

fn leaf_from_tag(tag: &str, e: &BytesStart) -> OslinkResult<Option<Expr>> {
    match tag {
        "number" => Ok(Some(Expr::Number(f64_attr(e, "value")?.unwrap_or(0.0)))),
        "PI" => Ok(Some(Expr::Pi)),
        "variable" => {
            let idx = usize_attr(e, "idx")?.ok_or_else(|| {
                OslinkError::MalformedDocument("<variable> without an idx attribute".to_string())
            })?;
            let coef = f64_attr(e, "coef")?.unwrap_or(1.0);
            Ok(Some(Expr::Variable { idx, coef }))
        }
        _ => Ok(None),
    }
}

fn build_expr(op: ExprOp, children: Vec<Expr>) -> OslinkResult<Expr> {
    Ok(match op {
        ExprOp::Plus => {
            let (a, b) = two("plus", children)?;
            Expr::plus(a, b)
        }
        ExprOp::Minus => {
            let (a, b) = two("minus", children)?;
            Expr::minus(a, b)
        }
        ExprOp::Times => {
            let (a, b) = two("times", children)?;
            Expr::times(a, b)
        }
        ExprOp::Divide => {
            let (a, b) = two("divide", children)?;
            Expr::divide(a, b)
        }
        ExprOp::Power => {
            let (a, b) = two("power", children)?;
            Expr::power(a, b)
        }
        ExprOp::Negate => Expr::negate(one("negate", children)?),
        ExprOp::Sum => Expr::sum(children)?,
        ExprOp::Product => Expr::product(children)?,
        ExprOp::Min => Expr::min(children)?,
        ExprOp::Max => Expr::max(children)?,
        ExprOp::Abs => Expr::Abs(Box::new(one("abs", children)?)),
        ExprOp::Square => Expr::Square(Box::new(one("square", children)?)),
        ExprOp::Sqrt => Expr::Sqrt(Box::new(one("squareRoot", children)?)),
        ExprOp::Ln => Expr::Ln(Box::new(one("ln", children)?)),
        ExprOp::Exp => Expr::Exp(Box::new(one("exp", children)?)),
        ExprOp::Sin => Expr::Sin(Box::new(one("sin", children)?)),
        ExprOp::Cos => Expr::Cos(Box::new(one("cos", children)?)),
    })
}

fn two(tag: &'static str, mut children: Vec<Expr>) -> OslinkResult<(Expr, Expr)> {
    if children.len() != 2 {
        return Err(fixed_arity(tag, 2, children.len()));
    }
    // length checked above
    let right = children.swap_remove(1);
    let left = children.swap_remove(0);
    Ok((left, right))
}

fn one(tag: &'static str, mut children: Vec<Expr>) -> OslinkResult<Expr> {
    if children.len() != 1 {
        return Err(fixed_arity(tag, 1, children.len()));
    }
    Ok(children.swap_remove(0))
}

fn fixed_arity(tag: &str, want: usize, got: usize) -> OslinkError {
    OslinkError::MalformedDocument(format!("<{tag}> takes {want} children, found {got}"))
}

fn check_count(what: &str, declared: Option<usize>, actual: usize) -> OslinkResult<()> {
    if let Some(declared) = declared {
        if declared != actual {
            return Err(OslinkError::MalformedDocument(format!(
                "document declares {declared} {what} but lists {actual}"
            )));
        }
    }
    Ok(())
}

/// Serializes an instance as a problem document.
pub fn write_osil(instance: &Instance) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<osil xmlns=\"os.optimizationservices.org\">\n");
    out.push_str(" <instanceHeader>\n");
    if !instance.name.is_empty() {
        out.push_str(&format!("  <name>{}</name>\n", escape(&instance.name)));
    }
    if !instance.description.is_empty() {
        out.push_str(&format!(
            "  <description>{}</description>\n",
            escape(&instance.description)
        ));
    }
    out.push_str(" </instanceHeader>\n");
    out.push_str(" <instanceData>\n");

    out.push_str(&format!(
        "  <variables numberOfVariables=\"{}\">\n",
        instance.variables.len()
    ));
    for var in &instance.variables {
        out.push_str("   <var");
        if !var.name.is_empty() {
            out.push_str(&format!(" name=\"{}\"", escape(&var.name)));
        }
        if var.lower != 0.0 {
            out.push_str(&format!(" lb=\"{}\"", bound_text(var.lower)));
        }
        if var.upper != f64::INFINITY {
            out.push_str(&format!(" ub=\"{}\"", bound_text(var.upper)));
        }
        if var.kind != VarKind::Continuous {
            out.push_str(&format!(" type=\"{}\"", var.kind.letter()));
        }
        if var.level != 0.0 {
            out.push_str(&format!(" init=\"{}\"", var.level));
        }
        out.push_str("/>\n");
    }
    out.push_str("  </variables>\n");

    match &instance.objective {
        Some(obj) => {
            out.push_str("  <objectives numberOfObjectives=\"1\">\n");
            out.push_str("   <obj");
            if !obj.name.is_empty() {
                out.push_str(&format!(" name=\"{}\"", escape(&obj.name)));
            }
            if obj.sense == Sense::Maximize {
                out.push_str(" maxOrMin=\"max\"");
            }
            if obj.constant != 0.0 {
                out.push_str(&format!(" constant=\"{}\"", obj.constant));
            }
            if obj.weight != 1.0 {
                out.push_str(&format!(" weight=\"{}\"", obj.weight));
            }
            out.push_str(&format!(
                " numberOfObjCoef=\"{}\">\n",
                obj.coefficients.len()
            ));
            for coef in &obj.coefficients {
                out.push_str(&format!(
                    "    <coef idx=\"{}\">{}</coef>\n",
                    coef.idx, coef.value
                ));
            }
            out.push_str("   </obj>\n");
            out.push_str("  </objectives>\n");
        }
        None => out.push_str("  <objectives numberOfObjectives=\"0\"/>\n"),
    }

    out.push_str(&format!(
        "  <constraints numberOfConstraints=\"{}\">\n",
        instance.constraints.len()
    ));
    for con in &instance.constraints {
        out.push_str("   <con");
        if !con.name.is_empty() {
            out.push_str(&format!(" name=\"{}\"", escape(&con.name)));
        }
        if con.lower != f64::NEG_INFINITY {
            out.push_str(&format!(" lb=\"{}\"", bound_text(con.lower)));
        }
        if con.upper != f64::INFINITY {
            out.push_str(&format!(" ub=\"{}\"", bound_text(con.upper)));
        }
        if con.constant != 0.0 {
            out.push_str(&format!(" constant=\"{}\"", con.constant));
        }
        out.push_str("/>\n");
    }
    out.push_str("  </constraints>\n");

    let matrix = &instance.coefficients;
    if matrix.nnz() > 0 {
        out.push_str(&format!(
            "  <linearConstraintCoefficients numberOfValues=\"{}\">\n",
            matrix.nnz()
        ));
        push_el_list(&mut out, "start", matrix.starts());
        let index_tag = match matrix.layout() {
            MatrixLayout::ColumnMajor => "rowIdx",
            MatrixLayout::RowMajor => "colIdx",
        };
        push_el_list(&mut out, index_tag, matrix.indexes());
        push_el_list(&mut out, "value", matrix.values());
        out.push_str("  </linearConstraintCoefficients>\n");
    }

    if !instance.nonlinear.is_empty() {
        out.push_str(&format!(
            "  <nonlinearExpressions numberOfNonlinearExpressions=\"{}\">\n",
            instance.nonlinear.len()
        ));
        for entry in &instance.nonlinear {
            let idx: i64 = match entry.row {
                RowRef::Objective => -1,
                RowRef::Constraint(i) => i as i64,
            };
            out.push_str(&format!("   <nl idx=\"{idx}\">"));
            push_expr(&mut out, &entry.tree);
            out.push_str("</nl>\n");
        }
        out.push_str("  </nonlinearExpressions>\n");
    }

    out.push_str(" </instanceData>\n");
    out.push_str("</osil>\n");
    out
}

fn push_el_list<T: std::fmt::Display>(out: &mut String, tag: &str, items: &[T]) {
    out.push_str(&format!("   <{tag}>"));
    for item in items {
        out.push_str(&format!("<el>{item}</el>"));
    }
    out.push_str(&format!("</{tag}>\n"));
}

fn push_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Number(v) => out.push_str(&format!("<number value=\"{v}\"/>")),
        Expr::Pi => out.push_str("<PI/>"),
        Expr::Variable { idx, coef } => {
            if *coef == 1.0 {
                out.push_str(&format!("<variable idx=\"{idx}\"/>"));
            } else {
                out.push_str(&format!("<variable idx=\"{idx}\" coef=\"{coef}\"/>"));
            }
        }
        Expr::Plus(a, b) => push_binary(out, "plus", a, b),
        Expr::Minus(a, b) => push_binary(out, "minus", a, b),
        Expr::Times(a, b) => push_binary(out, "times", a, b),
        Expr::Divide(a, b) => push_binary(out, "divide", a, b),
        Expr::Power(a, b) => push_binary(out, "power", a, b),
        Expr::Negate(a) => push_unary(out, "negate", a),
        Expr::Sum(children) => push_nary(out, "sum", children),
        Expr::Product(children) => push_nary(out, "product", children),
        Expr::Min(children) => push_nary(out, "min", children),
        Expr::Max(children) => push_nary(out, "max", children),
        Expr::Abs(a) => push_unary(out, "abs", a),
        Expr::Square(a) => push_unary(out, "square", a),
        Expr::Sqrt(a) => push_unary(out, "squareRoot", a),
        Expr::Ln(a) => push_unary(out, "ln", a),
        Expr::Exp(a) => push_unary(out, "exp", a),
        Expr::Sin(a) => push_unary(out, "sin", a),
        Expr::Cos(a) => push_unary(out, "cos", a),
    }
}

fn push_binary(out: &mut String, tag: &str, a: &Expr, b: &Expr) {
    out.push_str(&format!("<{tag}>"));
    push_expr(out, a);
    push_expr(out, b);
    out.push_str(&format!("</{tag}>"));
}

fn push_unary(out: &mut String, tag: &str, a: &Expr) {
    out.push_str(&format!("<{tag}>"));
    push_expr(out, a);
    out.push_str(&format!("</{tag}>"));
}

fn push_nary(out: &mut String, tag: &str, children: &[Expr]) {
    out.push_str(&format!("<{tag}>"));
    for child in children {
        push_expr(out, child);
    }
    out.push_str(&format!("</{tag}>"));
}

fn bound_text(value: f64) -> String {
    if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{value}")
    }
}

fn bound_attr(event: &BytesStart, key: &str) -> OslinkResult<Option<f64>> {
    match attribute_value(event, key)? {
        None => Ok(None),
        Some(text) => match text.as_str() {
            "INF" | "+INF" => Ok(Some(f64::INFINITY)),
            "-INF" => Ok(Some(f64::NEG_INFINITY)),
            _ => parse_f64(key, &text).map(Some),
        },
    }
}
