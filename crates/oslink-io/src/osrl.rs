//! Reader and writer for the XML result format.
//!
//! The reader fills a [`SolveResult`] directly while walking the document.
//! Most fields are optional in the wild, so absent sections simply leave
//! their defaults in place; only structural contradictions are errors. The
//! one deliberately lenient spot is the solve time, where an unparseable
//! value logs a warning and reads as zero rather than discarding an
//! otherwise usable result.

use std::fs;
use std::path::Path;

use oslink_core::{
    GeneralStatus, GeneralStatusKind, OslinkError, OslinkResult, Solution, SolutionStatus,
    SolveResult,
};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::xml::{
    attribute_value, f64_attr, local_name_as_str, parse_f64, usize_attr, xml_error,
};

/// Parses a result document into a [`SolveResult`].
pub fn read_osrl(xml: &str) -> OslinkResult<SolveResult> {
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

/// Reads and parses a result document from a file.
pub fn read_osrl_file(path: impl AsRef<Path>) -> OslinkResult<SolveResult> {
    let xml = fs::read_to_string(path)?;
    read_osrl(&xml)
}

/// Which value list the current `var`/`obj`/`con` entries belong to.
#[derive(Clone, Copy, PartialEq)]
enum ValueSection {
    VariableValues,
    ReducedCosts,
    ObjectiveValues,
    DualValues,
}

/// Which per-solution block the walk is inside.
#[derive(Clone, Copy, PartialEq)]
enum SolutionBlock {
    Variables,
    Objectives,
    Constraints,
}

struct Parser {
    result: SolveResult,
    declared_solutions: Option<usize>,
    current: Option<Solution>,
    block: Option<SolutionBlock>,
    section: Option<ValueSection>,
    pending_idx: Option<usize>,
    active_tag: Option<String>,
}

impl Parser {
    fn new() -> Parser {
        Parser {
            result: SolveResult::empty(),
            declared_solutions: None,
            current: None,
            block: None,
            section: None,
            pending_idx: None,
            active_tag: None,
        }
    }

    fn handle_start(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        self.active_tag = Some(tag.to_string());
        match tag {
            "generalStatus" => self.general_status(e)?,
            "optimization" => self.optimization(e)?,
            "solution" => {
                self.current = Some(Solution::new(SolutionStatus::from_token("")));
            }
            "status" => self.solution_status(e)?,
            "variables" if self.current.is_some() => self.block = Some(SolutionBlock::Variables),
            "objectives" if self.current.is_some() => self.block = Some(SolutionBlock::Objectives),
            "constraints" if self.current.is_some() => {
                self.block = Some(SolutionBlock::Constraints);
            }
            "values" => {
                self.section = match self.block {
                    Some(SolutionBlock::Variables) => Some(ValueSection::VariableValues),
                    Some(SolutionBlock::Objectives) => Some(ValueSection::ObjectiveValues),
                    _ => None,
                };
            }
            "other" if self.block == Some(SolutionBlock::Variables) => {
                let name = attribute_value(e, "name")?.unwrap_or_default();
                if name == "reduced costs" {
                    self.section = Some(ValueSection::ReducedCosts);
                }
            }
            "dualValues" if self.block == Some(SolutionBlock::Constraints) => {
                self.section = Some(ValueSection::DualValues);
            }
            "var" => self.open_entry(e)?,
            "con" if self.section == Some(ValueSection::DualValues) => {
                self.pending_idx = Some(required_idx(e)?);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_empty(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        match tag {
            "generalStatus" => self.general_status(e)?,
            "optimization" => self.optimization(e)?,
            "solution" => {
                self.result
                    .solutions
                    .push(Solution::new(SolutionStatus::from_token("")));
            }
            "status" => self.solution_status(e)?,
            "var" => {
                self.open_entry(e)?;
                // a primal entry carries its value as text, so a self-closed
                // form has none
                if self.pending_idx.take().is_some() {
                    return Err(OslinkError::MalformedDocument(
                        "<var> entry without a value".to_string(),
                    ));
                }
            }
            "con" if self.section == Some(ValueSection::DualValues) => {
                return Err(OslinkError::MalformedDocument(
                    "<con> entry without a value".to_string(),
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
            Some("message") => match self.current.as_mut() {
                Some(solution) => solution.message = text.to_string(),
                None => self.result.message = text.to_string(),
            },
            Some("serviceName") => self.result.service_name = text.to_string(),
            Some("instanceName") => self.result.instance_name = text.to_string(),
            Some("time") => {
                self.result.time_seconds = match text.parse() {
                    Ok(seconds) => seconds,
                    Err(_) => {
                        warn!(value = text, "unparseable solve time, reading as zero");
                        0.0
                    }
                };
            }
            Some("var") if self.section == Some(ValueSection::VariableValues) => {
                let idx = self.take_pending()?;
                let value = parse_f64("variable value", text)?;
                self.solution_mut()?.variable_values.push((idx, value));
            }
            Some("obj") if self.section == Some(ValueSection::ObjectiveValues) => {
                let value = parse_f64("objective value", text)?;
                self.solution_mut()?.objective_value = Some(value);
            }
            Some("con") if self.section == Some(ValueSection::DualValues) => {
                let idx = self.take_pending()?;
                let value = parse_f64("dual value", text)?;
                self.solution_mut()?.dual_values.push((idx, value));
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_end(&mut self, e: &quick_xml::events::BytesEnd) -> OslinkResult<()> {
        let name = e.local_name();
        let tag = local_name_as_str(&name);
        self.active_tag = None;
        match tag {
            "solution" => {
                let solution = self.current.take().ok_or_else(|| {
                    OslinkError::MalformedDocument("unexpected </solution>".to_string())
                })?;
                self.result.solutions.push(solution);
            }
            "variables" | "objectives" | "constraints" => {
                self.block = None;
                self.section = None;
            }
            "values" | "other" | "dualValues" => self.section = None,
            "var" | "con" => {
                if self.pending_idx.take().is_some() {
                    return Err(OslinkError::MalformedDocument(format!(
                        "<{tag}> entry without a value"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn general_status(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let kind = attribute_value(e, "type")?.unwrap_or_default();
        self.result.general = Some(GeneralStatus {
            kind: GeneralStatusKind::from_token(&kind),
            description: attribute_value(e, "description")?.unwrap_or_default(),
        });
        Ok(())
    }

    fn optimization(&mut self, e: &BytesStart) -> OslinkResult<()> {
        self.declared_solutions = usize_attr(e, "numberOfSolutions")?;
        self.result.num_variables = usize_attr(e, "numberOfVariables")?;
        self.result.num_constraints = usize_attr(e, "numberOfConstraints")?;
        Ok(())
    }

    fn solution_status(&mut self, e: &BytesStart) -> OslinkResult<()> {
        let kind = attribute_value(e, "type")?.unwrap_or_default();
        let description = attribute_value(e, "description")?.unwrap_or_default();
        if let Some(solution) = self.current.as_mut() {
            solution.status = SolutionStatus::from_token(&kind);
            solution.status_description = description;
        }
        Ok(())
    }

    /// A `var` element is a primal level (text value) or a reduced cost
    /// (attribute value) depending on the enclosing section.
    fn open_entry(&mut self, e: &BytesStart) -> OslinkResult<()> {
        match self.section {
            Some(ValueSection::VariableValues) => {
                self.pending_idx = Some(required_idx(e)?);
            }
            Some(ValueSection::ReducedCosts) => {
                let idx = required_idx(e)?;
                let value = f64_attr(e, "value")?.ok_or_else(|| {
                    OslinkError::MalformedDocument(
                        "reduced cost entry without a value attribute".to_string(),
                    )
                })?;
                self.solution_mut()?.reduced_costs.push((idx, value));
            }
            _ => {}
        }
        Ok(())
    }

    fn solution_mut(&mut self) -> OslinkResult<&mut Solution> {
        self.current.as_mut().ok_or_else(|| {
            OslinkError::MalformedDocument("solution values outside a solution".to_string())
        })
    }

    fn take_pending(&mut self) -> OslinkResult<usize> {
        self.pending_idx.take().ok_or_else(|| {
            OslinkError::MalformedDocument("stray value text in a value list".to_string())
        })
    }

    fn finish(self) -> OslinkResult<SolveResult> {
        if let Some(declared) = self.declared_solutions {
            if declared != self.result.solutions.len() {
                return Err(OslinkError::MalformedDocument(format!(
                    "document declares {declared} solutions but lists {}",
                    self.result.solutions.len()
                )));
            }
        }
        Ok(self.result)
    }
}

fn required_idx(e: &BytesStart) -> OslinkResult<usize> {
    usize_attr(e, "idx")?.ok_or_else(|| {
        OslinkError::MalformedDocument("value entry without an idx attribute".to_string())
    })
}

/// Serializes a result as a result document.
pub fn write_osrl(result: &SolveResult) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<osrl xmlns=\"os.optimizationservices.org\">\n");

    if let Some(general) = &result.general {
        out.push_str(" <general>\n");
        out.push_str(&format!(
            "  <generalStatus type=\"{}\"",
            escape(general.kind.token())
        ));
        if !general.description.is_empty() {
            out.push_str(&format!(
                " description=\"{}\"",
                escape(&general.description)
            ));
        }
        out.push_str("/>\n");
        if !result.message.is_empty() {
            out.push_str(&format!(
                "  <message>{}</message>\n",
                escape(&result.message)
            ));
        }
        if !result.service_name.is_empty() {
            out.push_str(&format!(
                "  <serviceName>{}</serviceName>\n",
                escape(&result.service_name)
            ));
        }
        if !result.instance_name.is_empty() {
            out.push_str(&format!(
                "  <instanceName>{}</instanceName>\n",
                escape(&result.instance_name)
            ));
        }
        if result.time_seconds != 0.0 {
            out.push_str(&format!("  <time>{}</time>\n", result.time_seconds));
        }
        out.push_str(" </general>\n");
    }

    let has_optimization = !result.solutions.is_empty()
        || result.num_variables.is_some()
        || result.num_constraints.is_some();
    if has_optimization {
        out.push_str(&format!(
            " <optimization numberOfSolutions=\"{}\"",
            result.solutions.len()
        ));
        if let Some(n) = result.num_variables {
            out.push_str(&format!(" numberOfVariables=\"{n}\""));
        }
        if let Some(m) = result.num_constraints {
            out.push_str(&format!(" numberOfConstraints=\"{m}\""));
        }
        if result.solutions.is_empty() {
            out.push_str("/>\n");
        } else {
            out.push_str(">\n");
            for solution in &result.solutions {
                push_solution(&mut out, solution);
            }
            out.push_str(" </optimization>\n");
        }
    }

    out.push_str("</osrl>\n");
    out
}

fn push_solution(out: &mut String, solution: &Solution) {
    out.push_str("  <solution>\n");
    out.push_str(&format!(
        "   <status type=\"{}\"",
        escape(solution.status.token())
    ));
    if !solution.status_description.is_empty() {
        out.push_str(&format!(
            " description=\"{}\"",
            escape(&solution.status_description)
        ));
    }
    out.push_str("/>\n");
    if !solution.message.is_empty() {
        out.push_str(&format!(
            "   <message>{}</message>\n",
            escape(&solution.message)
        ));
    }

    if !solution.variable_values.is_empty() || !solution.reduced_costs.is_empty() {
        out.push_str("   <variables>\n");
        if !solution.variable_values.is_empty() {
            out.push_str("    <values>\n");
            for (idx, value) in &solution.variable_values {
                out.push_str(&format!("     <var idx=\"{idx}\">{value}</var>\n"));
            }
            out.push_str("    </values>\n");
        }
        if !solution.reduced_costs.is_empty() {
            out.push_str("    <other name=\"reduced costs\">\n");
            for (idx, value) in &solution.reduced_costs {
                out.push_str(&format!("     <var idx=\"{idx}\" value=\"{value}\"/>\n"));
            }
            out.push_str("    </other>\n");
        }
        out.push_str("   </variables>\n");
    }

    if let Some(value) = solution.objective_value {
        out.push_str("   <objectives>\n    <values>\n");
        out.push_str(&format!("     <obj idx=\"-1\">{value}</obj>\n"));
        out.push_str("    </values>\n   </objectives>\n");
    }

    if !solution.dual_values.is_empty() {
        out.push_str("   <constraints>\n    <dualValues>\n");
        for (idx, value) in &solution.dual_values {
            out.push_str(&format!("     <con idx=\"{idx}\">{value}</con>\n"));
        }
        out.push_str("    </dualValues>\n   </constraints>\n");
    }

    out.push_str("  </solution>\n");
}
