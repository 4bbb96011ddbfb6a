//! Query module - shared filter and pagination value objects.

mod query_model;

pub use query_model::{DateRange, Pagination, SortDirection};
