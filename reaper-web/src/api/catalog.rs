//! Public SaaS catalog search

use axum::{
    extract::{Query, State},
    Json,
};
use reaper_common::db::{products, SaasProduct};
use serde::Deserialize;
use tracing::error;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
}

/// GET /api/catalog?search=
///
/// Verified products by name. A failed query is logged and yields an empty
/// list so the catalog page still renders.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<Vec<SaasProduct>> {
    match products::search_products(&state.db, query.search.as_deref()).await {
        Ok(products) => Json(products),
        Err(e) => {
            error!("Catalog search failed: {}", e);
            Json(Vec::new())
        }
    }
}
