//! Trace records: one CSV line summarizing a solve.
//!
//! A record is assembled from the problem and result documents together.
//! Field order and the `NA` placeholders follow the trace file convention,
//! so partially filled records still line up column by column.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use oslink_core::{
    GeneralStatusKind, Instance, ModelStatus, OslinkError, OslinkResult, Sense, SolveResult,
    SolveStatus,
};

/// Header lines written once at the top of a fresh trace file.
pub const TRACE_HEADER: &str = "* Trace Record Definition\n\
     * InputFileName,ModelType,SolverName,Direction,ModelStatus,SolverStatus,ObjectiveValue,SolverTime\n";

const COIN_PREFIX: &str = "Solved with Coin Solver: ";

/// One trace line: model identity, solver identity, and solve outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub instance_name: String,
    pub model_type: String,
    pub solver_name: String,
    /// 0 for minimization, 1 for maximization.
    pub direction: i32,
    pub model_status: ModelStatus,
    pub solve_status: SolveStatus,
    pub objective_value: f64,
    pub solver_time: f64,
}

impl Default for TraceRecord {
    fn default() -> TraceRecord {
        TraceRecord {
            instance_name: "NA".to_string(),
            model_type: "NA".to_string(),
            solver_name: "NA".to_string(),
            direction: 0,
            model_status: ModelStatus::ErrorNoSolution,
            solve_status: SolveStatus::SystemError,
            objective_value: 0.0,
            solver_time: 0.0,
        }
    }
}

impl TraceRecord {
    /// Fills a record from a problem document and its solve result.
    ///
    /// A result without a header reports a solver failure immediately, with
    /// every other field left at its placeholder. An error header keeps the
    /// model metadata but likewise reports a failure, leaving the objective
    /// and time at zero. Both documents naming different instances is an
    /// error.
    pub fn from_documents(instance: &Instance, result: &SolveResult) -> OslinkResult<TraceRecord> {
        let mut record = TraceRecord::default();

        let general = match &result.general {
            None => {
                record.model_status = ModelStatus::ErrorNoSolution;
                record.solve_status = SolveStatus::SolverError;
                return Ok(record);
            }
            Some(general) => general,
        };

        if !result.instance_name.is_empty()
            && !instance.name.is_empty()
            && result.instance_name != instance.name
        {
            return Err(OslinkError::MalformedDocument(format!(
                "result is for instance '{}', not '{}'",
                result.instance_name, instance.name
            )));
        }
        if !result.instance_name.is_empty() {
            record.instance_name = result.instance_name.clone();
        }
        record.model_type = instance.model_class().to_string();
        if !result.service_name.is_empty() {
            record.solver_name = solver_name_from_service(&result.service_name);
        }
        if let Some(obj) = &instance.objective {
            record.direction = match obj.sense {
                Sense::Minimize => 0,
                Sense::Maximize => 1,
            };
        }

        if general.kind == GeneralStatusKind::Error {
            record.model_status = ModelStatus::ErrorNoSolution;
            record.solve_status = SolveStatus::SolverError;
            return Ok(record);
        }

        let (model, solve) = match result.first_solution() {
            None => (ModelStatus::NoSolutionReturned, SolveStatus::Normal),
            Some(solution) => {
                record.objective_value = solution.objective_value.unwrap_or(0.0);
                solution.status.native_pair()
            }
        };
        record.model_status = model;
        record.solve_status = solve;
        record.solver_time = result.time_seconds;
        Ok(record)
    }

    /// Appends the record to a trace file, writing the header first when the
    /// file is empty or new.
    pub fn append_to(&self, path: impl AsRef<Path>) -> OslinkResult<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(TRACE_HEADER.as_bytes())?;
        }
        writeln!(file, "{self}")?;
        Ok(())
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            self.instance_name,
            self.model_type,
            self.solver_name,
            self.direction,
            self.model_status.code(),
            self.solve_status.code(),
            self.objective_value,
            self.solver_time
        )
    }
}

/// Maps the result's service name to a solver name: the Coin service prefix
/// is stripped, otherwise known solver names are matched as substrings, and
/// anything else passes through verbatim.
fn solver_name_from_service(service: &str) -> String {
    if let Some(rest) = service.strip_prefix(COIN_PREFIX) {
        return rest.to_string();
    }
    for (needle, name) in [
        ("LINDO", "LindoSolver"),
        ("Knitro", "Knitro"),
        ("Bonmin", "Bonmin"),
        ("Couenne", "Couenne"),
        ("Ipopt", "Ipopt"),
    ] {
        if service.contains(needle) {
            return name.to_string();
        }
    }
    service.to_string()
}
