//! # oslink-gmo: Native Model Object & Translation
//!
//! The native solver-side model object and the translation layer between it
//! and the canonical [`oslink_core::Instance`] / [`oslink_core::SolveResult`]
//! forms.
//!
//! ## Design Philosophy
//!
//! **Fatal over lossy**: a construct the canonical form cannot carry (special
//! ordered sets, semicontinuous variables, unknown instruction codes) fails
//! the translation with a typed error instead of producing a silently wrong
//! document.
//!
//! **Explicit boundaries**: bounds live as IEEE infinities inside the model.
//! Sentinel codes are translated exactly once on the way in (declaration) and
//! once on the way out (bulk getters), so no value is ever double-converted.
//!
//! ## Index Conventions
//!
//! The declaration surface ([`ModelObject::add_row`], [`ModelObject::add_col`],
//! [`JacEntry::row`]) is one-based and sequential, matching the host system
//! that drives it. Everything read back out (accessors, matrix segments,
//! [`ModelStats`]) is zero-based.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oslink_gmo::{
//!     build_instance, BasisStatus, JacEntry, ModelObject, NativeColKind, NativeRowKind, ObjEntry,
//! };
//!
//! fn main() -> Result<(), oslink_core::OslinkError> {
//!     let mut model = ModelObject::new("demo");
//!     model.init(1, 2, 2);
//!     model.add_row(1, NativeRowKind::LessEqual, 4.0, BasisStatus::Basic)?;
//!     for j in 0..2 {
//!         model.add_col(
//!             j + 1,
//!             NativeColKind::Continuous,
//!             0.0,
//!             0.0,
//!             10.0,
//!             BasisStatus::Basic,
//!             1.0,
//!             vec![JacEntry { row: 1, value: 1.0, nonlinear: false }],
//!         )?;
//!     }
//!     model.complete()?;
//!     model.set_objective(0.0, vec![ObjEntry { col: 0, value: 3.0, nonlinear: false }])?;
//!
//!     let instance = build_instance(&model)?;
//!     println!("{} variables", instance.variables.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`model`] - The native model object: rows, columns, Jacobian, statuses
//! - [`instr`] - The postfix instruction tape and its opcode vocabulary
//! - [`decode`] - Tape replay into canonical expression trees
//! - [`forward`] - Native model to canonical instance
//! - [`reverse`] - Canonical instance to native model
//! - [`solution`] - Canonical solve result back into the native model
//!
//! ## Integration with oslink-io
//!
//! This crate never touches documents. The oslink-io crate reads and writes
//! the XML instance/result formats; what flows across the boundary is always
//! the canonical types of [`oslink_core`].

pub mod decode;
pub mod forward;
pub mod instr;
pub mod model;
pub mod reverse;
pub mod solution;

pub use decode::decode;
pub use forward::build_instance;
pub use instr::{FuncCode, Instr, OpCode, Tape};
pub use model::{
    special, BasisStatus, Col, JacEntry, ModelObject, ModelStats, NativeColKind, NativeRowKind,
    ObjEntry, ObjStyle, Row,
};
pub use reverse::{build_model, ReverseOptions};
pub use solution::write_solution;
