//! Demo endpoint serving a generated table in the grid-control wire format.
//!
//! `GET /data` and `POST /data` accept the paging, sort and search
//! parameters a grid control sends and answer with
//! `{sEcho, iTotalRecords, iTotalDisplayRecords, aaData}`. `/health`
//! reports status and row count.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json as AxumJson,
    routing::get,
    Form, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use pagepipe::{FetchQuery, MemoryTable, PageResponse, PipeResult};

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub table: MemoryTable,
}

/// Build the router for a table.
pub fn router(table: MemoryTable) -> Router {
    let state = Arc::new(ServerState { table });

    Router::new()
        .route("/data", get(handle_query).post(handle_form))
        .route("/health", get(handle_health))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Serve on an already bound listener until the task is dropped.
pub async fn serve(listener: tokio::net::TcpListener, table: MemoryTable) -> PipeResult<()> {
    let rows = table.len();
    let addr = listener.local_addr()?;
    tracing::info!("Demo endpoint listening on http://{addr}/data ({rows} rows)");

    axum::serve(listener, router(table)).await?;
    Ok(())
}

/// Bind `addr` and serve.
pub async fn run(addr: &str, table: MemoryTable) -> PipeResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, table).await
}

async fn handle_query(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> AxumJson<PageResponse> {
    AxumJson(answer(&state, params))
}

async fn handle_form(
    State(state): State<Arc<ServerState>>,
    Form(params): Form<Vec<(String, String)>>,
) -> AxumJson<PageResponse> {
    AxumJson(answer(&state, params))
}

fn answer(state: &ServerState, params: Vec<(String, String)>) -> PageResponse {
    let query = FetchQuery::from_params(params);
    let resp = state.table.query(&query);
    tracing::debug!(
        "Served start={:?} length={:?} echo={} -> {} rows of {}",
        query.start,
        query.length,
        query.echo,
        resp.rows.len(),
        resp.total_filtered
    );
    resp
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "rows": state.table.len(),
    }))
}
