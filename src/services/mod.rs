//! Table query construction, pagination and data access.

pub mod paginate;
pub mod pg_table;
pub mod query_builder;
pub mod table_data;
pub mod table_registry;
