//! Canonical optimization problem and result schema for the oslink translators.
//!
//! This crate holds the neutral middle layer the two translation directions
//! meet at: a canonical [`Instance`] (variables, one objective, constraints,
//! a compressed coefficient matrix, nonlinear expression trees) and a
//! canonical [`SolveResult`] with its status vocabulary. The native model
//! object and the translators live in `oslink-gmo`; the document readers and
//! writers live in `oslink-io`.
//!
//! Everything here is fail-fast: invalid compressed matrices, malformed
//! expression arities, and out-of-range references surface as a typed
//! [`OslinkError`] at construction or validation time, never as a silently
//! wrong model later.

pub mod error;
pub mod expr;
pub mod instance;
pub mod matrix;
pub mod result;
pub mod status;

pub use error::{OslinkError, OslinkResult};
pub use expr::{Expr, PowerSpelling};
pub use instance::{
    Constraint, Instance, ModelClass, NonlinearEntry, ObjCoef, Objective, RowKind, RowRef, Sense,
    VarKind, Variable,
};
pub use matrix::{MatrixLayout, SparseMatrix};
pub use result::{GeneralStatus, GeneralStatusKind, Solution, SolveResult};
pub use status::{ModelStatus, SolutionStatus, SolveStatus};
