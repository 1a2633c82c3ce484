//! `gradebook-engine` computes calc columns for grade tables.
//!
//! The engine is pure and synchronous: it reads a raw row and its
//! course schema, evaluates each calc column's declared formula, and
//! assembles full rows/tables with computed values placed at their
//! schema positions. Nothing here performs I/O or mutates its inputs,
//! so derivation can run from any execution context.
//!
//! Formula *shapes* live in `gradebook-model` (they are schema data);
//! this crate owns their semantics.

mod derive;
mod eval;

pub use derive::{derive_row, full_row, full_table};
pub use eval::eval;
