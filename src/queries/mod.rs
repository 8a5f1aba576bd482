//! Store-backed queries.
//!
//! Each query type borrows a [`Connection`](crate::connection::Connection)
//! and is cheap to construct per call.

pub mod aggregates;
pub mod population;

pub use aggregates::LineItemQuery;
pub use population::{EntityScope, PopulationQuery};
