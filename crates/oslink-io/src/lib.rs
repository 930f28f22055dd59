//! # oslink-io: Problem & Result Documents
//!
//! Readers and writers for the XML interchange documents, the GAMS text-model
//! emitter, and the trace record summary line.
//!
//! ## Design Philosophy
//!
//! **Event-driven parsing**: both XML readers are single-pass quick-xml walks
//! that fill the canonical types directly; expression trees are assembled
//! bottom-up on an explicit frame stack, never through a DOM.
//!
//! **Strict structure, lenient values**: declared counts, cross references,
//! and arities must hold and fail the parse when they do not. Optional
//! metadata falls back to schema defaults, and the one value kept lenient is
//! the solve time, which logs a warning and reads as zero.
//!
//! **Round trips**: a document produced by a writer reads back as an equal
//! canonical value.
//!
//! ## Quick Start: Translate a Problem Document
//!
//! ```rust,no_run
//! use oslink_io::{read_osil_file, write_gms};
//!
//! fn main() -> Result<(), oslink_core::OslinkError> {
//!     let instance = read_osil_file("model.osil")?;
//!     let text = write_gms(&instance)?;
//!     std::fs::write("model.gms", text)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Documents
//!
//! | Document | Direction | Notes |
//! |----------|-----------|-------|
//! | Problem instance (OSiL) | read + write | linear parts and expression trees |
//! | Solve result (OSrL) | read + write | sparse value overlays, unknown status tags carried |
//! | GAMS model text | write | positional names, ranged rows fatal |
//! | Trace record | write | CSV line, header-on-empty-file append |
//!
//! ## Module Overview
//!
//! - [`osil`] - problem document reader and writer
//! - [`osrl`] - result document reader and writer
//! - [`gms`] - GAMS text-model emission
//! - [`trace`] - trace record assembly and file append
//!
//! ## Integration with oslink-core
//!
//! Readers produce and writers consume the canonical types from
//! [`oslink_core`]: [`oslink_core::Instance`] for problems and
//! [`oslink_core::SolveResult`] for results. Instances are validated on
//! read, so downstream translators can rely on their cross-field
//! invariants.

pub mod gms;
pub mod osil;
pub mod osrl;
pub mod trace;

mod xml;

pub use gms::write_gms;
pub use osil::{read_osil, read_osil_file, write_osil};
pub use osrl::{read_osrl, read_osrl_file, write_osrl};
pub use trace::{TraceRecord, TRACE_HEADER};
