//! SQL adapter shape for relational backends.
//!
//! One adapter, no inheritance: backend quirks (placeholder style, limit
//! clause, id allocation) live in a [`Dialect`] strategy struct selected at
//! startup, and the [`QueryCatalog`] renders every parameterized statement
//! once against that dialect. The concrete driver attaches at the
//! [`SqlExecutor`] seam.

mod backend;
mod dialect;
mod executor;

pub use backend::SqlBackingStore;
pub use dialect::{Dialect, IdAllocation, LimitStyle, Placeholder, QueryCatalog};
pub use executor::{SqlExecutor, SqlRow, SqlValue};
