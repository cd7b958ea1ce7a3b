//! Fetch one page of a table and assemble the list envelope.

use async_trait::async_trait;

use crate::models::pagination::TableResponse;
use crate::services::paginate::paginate;
use crate::services::query_builder::{CountQuery, QueryDescriptor, TableContext};

/// Read access to one table's rows.
///
/// Errors are the repository's own; [`get_table_data`] hands them back untouched.
#[async_trait]
pub trait TableRepository: Send + Sync {
    type Row: Send;
    type Error: Send;

    /// Rows matching the descriptor, honoring `take`/`skip` and ordering.
    async fn find_many(&self, query: &QueryDescriptor) -> Result<Vec<Self::Row>, Self::Error>;

    /// Size of the filtered set, ignoring pagination.
    async fn count(&self, query: &CountQuery) -> Result<u64, Self::Error>;
}

/// Run the page read and the count read, then build the pagination list.
pub async fn get_table_data<R: TableRepository>(
    repo: &R,
    ctx: &TableContext,
    boundary_count: u64,
) -> Result<TableResponse<R::Row>, R::Error> {
    let query = ctx.construct_query();

    let list = repo.find_many(&query).await?;
    let total = repo.count(&query.count_query()).await?;

    let current_page = ctx.page();
    let pagination = paginate(total, query.take, boundary_count, current_page);

    tracing::debug!(
        table = %ctx.table_key(),
        total,
        rows = list.len(),
        page = current_page,
        "Fetched table page"
    );

    Ok(TableResponse {
        list,
        current_page,
        pagination,
    })
}
