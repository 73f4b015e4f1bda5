use axum::extract::{Query, State};
use axum::Json;

use crate::app::AppState;
use crate::error::AppError;
use crate::models::search::{QuerySpec, ResultPage, SearchRequest, SimpleSearchQuery};
use crate::search::projector::project;
use crate::search::query::is_valid_order_by;

/// Axum handler for `GET /api/documents/search?sql=...&maxResults=...`.
pub async fn simple_search_handler(
    State(state): State<AppState>,
    Query(params): Query<SimpleSearchQuery>,
) -> Result<Json<ResultPage>, AppError> {
    if params.sql.trim().is_empty() {
        return Err(AppError::BadRequest("sql is required".into()));
    }

    let spec = QuerySpec::from(params);
    let page = project(state.document_store.as_ref(), &spec).await?;
    Ok(Json(page))
}

/// Axum handler for `POST /api/documents/search`.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ResultPage>, AppError> {
    validate_request(&request)?;

    let spec = QuerySpec::from(request);
    let page = project(state.document_store.as_ref(), &spec).await?;
    Ok(Json(page))
}

fn validate_request(request: &SearchRequest) -> Result<(), AppError> {
    if request.sql_query.trim().is_empty() {
        return Err(AppError::BadRequest("sqlQuery is required".into()));
    }

    if let Some(order_by) = request.order_by.as_deref().filter(|o| !o.is_empty()) {
        if !is_valid_order_by(order_by) {
            return Err(AppError::BadRequest(format!(
                "Invalid orderBy '{order_by}'"
            )));
        }
    }

    Ok(())
}
