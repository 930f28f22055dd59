//! Status vocabularies and the mapping between them.
//!
//! Result documents report a textual solution status; the native model wants
//! a pair of numeric codes (model status, solve status). The mapping lives
//! here, in one place, so every consumer reports the same codes for the same
//! document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Solution status token of a result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SolutionStatus {
    Unbounded,
    GloballyOptimal,
    LocallyOptimal,
    Optimal,
    BestSoFar,
    Feasible,
    Infeasible,
    StoppedByLimit,
    Unsure,
    Error,
    Other,
    /// A token outside the known vocabulary, carried verbatim.
    Unknown(String),
}

impl SolutionStatus {
    /// Parses a document status token. Unknown tokens are carried, not lost.
    pub fn from_token(token: &str) -> SolutionStatus {
        match token {
            "unbounded" => SolutionStatus::Unbounded,
            "globallyOptimal" => SolutionStatus::GloballyOptimal,
            "locallyOptimal" => SolutionStatus::LocallyOptimal,
            "optimal" => SolutionStatus::Optimal,
            "bestSoFar" => SolutionStatus::BestSoFar,
            "feasible" => SolutionStatus::Feasible,
            "infeasible" => SolutionStatus::Infeasible,
            "stoppedByLimit" => SolutionStatus::StoppedByLimit,
            "unsure" => SolutionStatus::Unsure,
            "error" => SolutionStatus::Error,
            "other" => SolutionStatus::Other,
            other => SolutionStatus::Unknown(other.to_string()),
        }
    }

    /// The document token for this status.
    pub fn token(&self) -> &str {
        match self {
            SolutionStatus::Unbounded => "unbounded",
            SolutionStatus::GloballyOptimal => "globallyOptimal",
            SolutionStatus::LocallyOptimal => "locallyOptimal",
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::BestSoFar => "bestSoFar",
            SolutionStatus::Feasible => "feasible",
            SolutionStatus::Infeasible => "infeasible",
            SolutionStatus::StoppedByLimit => "stoppedByLimit",
            SolutionStatus::Unsure => "unsure",
            SolutionStatus::Error => "error",
            SolutionStatus::Other => "other",
            SolutionStatus::Unknown(token) => token,
        }
    }

    /// The native status code pair for this solution status.
    ///
    /// Every token maps to a pair; an unknown token reports an unknown
    /// error rather than failing. Only a limit stop changes the solve
    /// status away from normal completion.
    pub fn native_pair(&self) -> (ModelStatus, SolveStatus) {
        match self {
            SolutionStatus::Unbounded => (ModelStatus::Unbounded, SolveStatus::Normal),
            SolutionStatus::GloballyOptimal => (ModelStatus::Optimal, SolveStatus::Normal),
            SolutionStatus::LocallyOptimal => (ModelStatus::LocallyOptimal, SolveStatus::Normal),
            SolutionStatus::Optimal => (ModelStatus::Optimal, SolveStatus::Normal),
            SolutionStatus::BestSoFar => (ModelStatus::Feasible, SolveStatus::Normal),
            SolutionStatus::Feasible => (ModelStatus::Feasible, SolveStatus::Normal),
            SolutionStatus::Infeasible => (ModelStatus::Infeasible, SolveStatus::Normal),
            SolutionStatus::StoppedByLimit => {
                (ModelStatus::IntermediateInfeasible, SolveStatus::IterationLimit)
            }
            SolutionStatus::Unsure => (ModelStatus::IntermediateInfeasible, SolveStatus::Normal),
            SolutionStatus::Error => (ModelStatus::ErrorUnknown, SolveStatus::Normal),
            SolutionStatus::Other => (ModelStatus::IntermediateInfeasible, SolveStatus::Normal),
            SolutionStatus::Unknown(_) => (ModelStatus::ErrorUnknown, SolveStatus::Normal),
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Native model status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ModelStatus {
    Optimal = 1,
    LocallyOptimal = 2,
    Unbounded = 3,
    Infeasible = 4,
    IntermediateInfeasible = 6,
    Feasible = 7,
    ErrorUnknown = 12,
    ErrorNoSolution = 13,
    NoSolutionReturned = 14,
}

impl ModelStatus {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStatus::Optimal => "optimal",
            ModelStatus::LocallyOptimal => "locally optimal",
            ModelStatus::Unbounded => "unbounded",
            ModelStatus::Infeasible => "infeasible",
            ModelStatus::IntermediateInfeasible => "intermediate infeasible",
            ModelStatus::Feasible => "feasible",
            ModelStatus::ErrorUnknown => "error unknown",
            ModelStatus::ErrorNoSolution => "error no solution",
            ModelStatus::NoSolutionReturned => "no solution returned",
        };
        write!(f, "{name}")
    }
}

/// Native solve status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum SolveStatus {
    Normal = 1,
    IterationLimit = 2,
    SolverError = 10,
    SystemError = 13,
}

impl SolveStatus {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Normal => "normal completion",
            SolveStatus::IterationLimit => "iteration interrupt",
            SolveStatus::SolverError => "solver error",
            SolveStatus::SystemError => "system error",
        };
        write!(f, "{name}")
    }
}
