use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use country_common::{Country, CountryQuery, RefreshResponse, StatusResponse};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::module::country::{api, parse_new_country, CountryStore, FieldErrors, GdpMultiplier};
use crate::module::refresh::CountryRefresher;
use crate::module::renderer::SummaryRenderer;
use crate::module::sources::HttpDataSource;

/// Shared handles for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CountryStore>,
    pub refresher: Arc<CountryRefresher>,
}

impl AppState {
    /// Wire the store, HTTP sources, renderer and multiplier from config
    pub async fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let store = Arc::new(CountryStore::open(&config.data_dir).await?);
        let source = Arc::new(HttpDataSource::new(&config.sources)?);
        let renderer = SummaryRenderer::new(&config.cache_dir, &config.render);
        let multiplier = GdpMultiplier::from_config(&config.gdp);

        let refresher = Arc::new(CountryRefresher::new(source, store.clone(), renderer, multiplier));
        Ok(Self { store, refresher })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/countries", get(list_countries).post(create_country))
        .route("/countries/refresh", post(refresh))
        .route("/countries/image", get(summary_image))
        .route("/countries/status", get(status))
        .route("/countries/{name}", get(retrieve_country).delete(delete_country))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &ServiceConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Json<Vec<Country>> {
    Json(api::list_countries(&state.store, &query).await)
}

async fn create_country(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<Country>)> {
    let Json(body) = body.map_err(|rejection| {
        ServiceError::Validation(FieldErrors::single("non_field_errors", rejection.body_text()))
    })?;
    let input = parse_new_country(&body).map_err(ServiceError::Validation)?;
    let country = api::create_country(&state.store, &input).await?;
    info!("Created country {}", country.name);
    Ok((StatusCode::CREATED, Json(country)))
}

async fn retrieve_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServiceResult<Json<Country>> {
    api::get_country(&state.store, &name).await.map(Json)
}

async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServiceResult<StatusCode> {
    api::delete_country(&state.store, &name).await?;
    info!("Deleted country {}", name);
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh(State(state): State<AppState>) -> ServiceResult<Json<RefreshResponse>> {
    state.refresher.refresh().await.map(Json)
}

async fn summary_image(State(state): State<AppState>) -> ServiceResult<impl IntoResponse> {
    let bytes = api::summary_image(&state.refresher.renderer().image_path()).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(api::status(&state.store).await)
}
