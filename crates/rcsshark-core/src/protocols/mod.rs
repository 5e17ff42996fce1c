//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: table ids, bit masks and loop conventions (source of truth)
//! - `reader`: bounds-checked reads that also record the field tree
//! - `parser`: dispatch and domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; the CLI handles file access.

pub(crate) mod common;
pub mod dvb_s2_table;
