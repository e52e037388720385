pub mod handlers;

pub use handlers::*;

use crate::config::AppConfig;
use crate::service::{AuthService, DataStore, SessionRegistry};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DataStore>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionRegistry>,
}

/// 构建全部路由
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(current_session));

    let data_routes = Router::new()
        .route("/api/products", get(list_products).post(add_product))
        .route("/api/products/:id", put(update_product).delete(delete_product))
        .route("/api/customers", get(list_customers).post(add_customer))
        .route("/api/customers/:id", put(update_customer).delete(delete_customer))
        .route("/api/orders", get(list_orders).post(add_order))
        .route("/api/orders/:id", put(update_order).delete(delete_order))
        .route("/api/refetch", post(refetch));

    let report_routes = Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/statement", post(generate_statement))
        .route("/api/statement/export/:format", get(export_statement));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(data_routes)
        .merge(report_routes)
        .with_state(state)
}
