use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use clientele::{
    application::CustomerService,
    domain::customer::{Customer, CustomerId, CustomerRegistration, CustomerUpdate},
};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub fn create_router(service: CustomerService) -> Router {
    Router::new()
        .nest("/api/v1", customer_router())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn customer_router() -> Router<CustomerService> {
    Router::new()
        .route("/customer", get(get_customers).post(register_customer))
        .route(
            "/customer/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

async fn get_customers(
    State(service): State<CustomerService>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(service.get_all_customers().await?))
}

async fn get_customer(
    State(service): State<CustomerService>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(id) = path?;
    Ok(Json(service.get_customer(CustomerId::from(id)).await?))
}

// 読み取れないボディもJSONのエラーレスポンスで返す
async fn register_customer(
    State(service): State<CustomerService>,
    payload: Result<Json<CustomerRegistration>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Json(registration) = payload?;
    Ok(Json(service.add_customer(registration).await?))
}

async fn update_customer(
    State(service): State<CustomerService>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<CustomerUpdate>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(id) = path?;
    let Json(update) = payload?;
    Ok(Json(
        service.update_customer(CustomerId::from(id), update).await?,
    ))
}

async fn delete_customer(
    State(service): State<CustomerService>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    service.delete_customer_by_id(CustomerId::from(id)).await?;
    Ok(StatusCode::OK)
}
