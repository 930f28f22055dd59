//! The canonical solve result.
//!
//! Mirrors the result document: a general header, service metadata, and a
//! list of solutions with sparse value overlays. Helper methods fold the
//! whole document down to the native status code pair.

use crate::status::{ModelStatus, SolutionStatus, SolveStatus};
use serde::{Deserialize, Serialize};

/// Outcome kind of the result header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralStatusKind {
    Success,
    Warning,
    Error,
    /// A kind outside the known vocabulary, carried verbatim.
    Unknown(String),
}

impl GeneralStatusKind {
    pub fn from_token(token: &str) -> GeneralStatusKind {
        match token {
            "success" | "normal" => GeneralStatusKind::Success,
            "warning" => GeneralStatusKind::Warning,
            "error" => GeneralStatusKind::Error,
            other => GeneralStatusKind::Unknown(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            GeneralStatusKind::Success => "success",
            GeneralStatusKind::Warning => "warning",
            GeneralStatusKind::Error => "error",
            GeneralStatusKind::Unknown(token) => token,
        }
    }
}

/// The general status header of a result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStatus {
    pub kind: GeneralStatusKind,
    pub description: String,
}

/// One reported solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub status_description: String,
    pub message: String,
    /// Sparse primal values as `(column, value)` pairs.
    pub variable_values: Vec<(usize, f64)>,
    /// Sparse reduced costs as `(column, value)` pairs.
    pub reduced_costs: Vec<(usize, f64)>,
    /// Sparse duals as `(row, value)` pairs.
    pub dual_values: Vec<(usize, f64)>,
    pub objective_value: Option<f64>,
}

impl Solution {
    pub fn new(status: SolutionStatus) -> Solution {
        Solution {
            status,
            status_description: String::new(),
            message: String::new(),
            variable_values: Vec::new(),
            reduced_costs: Vec::new(),
            dual_values: Vec::new(),
            objective_value: None,
        }
    }
}

/// The canonical solve result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// `None` when the document had no usable header.
    pub general: Option<GeneralStatus>,
    pub service_name: String,
    pub instance_name: String,
    pub message: String,
    pub time_seconds: f64,
    /// Variable count the document declares, when it declares one.
    pub num_variables: Option<usize>,
    /// Constraint count the document declares, when it declares one.
    pub num_constraints: Option<usize>,
    pub solutions: Vec<Solution>,
}

impl SolveResult {
    /// An empty result with no header, the shape of an unreadable document.
    pub fn empty() -> SolveResult {
        SolveResult {
            general: None,
            service_name: String::new(),
            instance_name: String::new(),
            message: String::new(),
            time_seconds: 0.0,
            num_variables: None,
            num_constraints: None,
            solutions: Vec::new(),
        }
    }

    pub fn first_solution(&self) -> Option<&Solution> {
        self.solutions.first()
    }

    /// Folds the whole result down to the native status code pair.
    ///
    /// A missing header or an error header reports a solver failure with no
    /// solution; an empty solution list reports that none was returned;
    /// otherwise the first solution's status decides.
    pub fn native_status(&self) -> (ModelStatus, SolveStatus) {
        let general = match &self.general {
            None => return (ModelStatus::ErrorNoSolution, SolveStatus::SolverError),
            Some(general) => general,
        };
        if general.kind == GeneralStatusKind::Error {
            return (ModelStatus::ErrorNoSolution, SolveStatus::SolverError);
        }
        match self.first_solution() {
            None => (ModelStatus::NoSolutionReturned, SolveStatus::Normal),
            Some(sol) => sol.status.native_pair(),
        }
    }
}
