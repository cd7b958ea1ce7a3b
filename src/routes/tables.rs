//! Generic table routes: one paginated list endpoint per registered table.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::errors::{ApiResponse, AppError};
use crate::models::pagination::TableResponse;
use crate::models::table::{TableBody, TableQuery};
use crate::services::pg_table::PgTableRepository;
use crate::services::query_builder::TableContext;
use crate::services::{table_data, table_registry};
use crate::AppState;

/// GET /api/v1/tables — keys of the tables served by the list endpoint.
pub async fn index() -> Json<ApiResponse<Vec<&'static str>>> {
    ApiResponse::success(table_registry::keys())
}

/// POST /api/v1/tables/{table_key} — one page of rows with filters, sorting and page list.
pub async fn list(
    State(state): State<AppState>,
    Path(table_key): Path<String>,
    Query(query): Query<TableQuery>,
    Json(body): Json<TableBody>,
) -> Result<Json<ApiResponse<TableResponse<Value>>>, AppError> {
    let source = table_registry::lookup(&table_key)?;
    let ctx = TableContext::initialize(query, body, table_key);
    let repo = PgTableRepository::new(state.db.clone(), source);
    let result =
        table_data::get_table_data(&repo, &ctx, state.config.table_boundary_count).await?;
    Ok(ApiResponse::success(result))
}
