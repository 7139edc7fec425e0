//! In-memory table store for emberdb
//!
//! Tables are ordered sequences of schema-less JSON records, owned
//! exclusively by the worker. Scans run compiled logic fragments from
//! [`crate::eval`] against each record in insertion order.
//!
//! # Invariants
//!
//! - Insertion order is stable across every non-sorting operation
//! - Mutating scans match first, mutate second: an evaluation fault never
//!   leaves a table half-mutated
//! - `replace` substitutes deep copies of the template, never shared
//!   references

mod errors;
mod registry;
mod sorter;
mod table;

pub use errors::{TableError, TableResult};
pub use registry::TableRegistry;
pub use sorter::RecordSorter;
pub use table::{MemoryTable, TYPE_FIELD};
