//! Request and response shapes for the table list endpoints.

pub mod pagination;
pub mod table;
