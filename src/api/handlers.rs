use super::AppState;
use crate::error::{AppError, AppResult};
use crate::export::{self, ExportFormat, StatementHeader};
use crate::models::{
    Account, Customer, CustomerFilter, CustomerInput, Dashboard, GeneratedStatement, Order,
    OrderInput, Product, ProductInput, StatementQuery,
};
use crate::service::{build_dashboard, AuthOutcome, SignInRequest, SignUpRequest};
use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// 请求体: 对账单条件, 日期缺省为今天 (UTC)
#[derive(Debug, Deserialize)]
pub struct StatementRequest {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer: CustomerFilter,
}

impl StatementRequest {
    fn into_query(self, today: NaiveDate) -> StatementQuery {
        StatementQuery {
            start_date: self.start_date.unwrap_or(today),
            end_date: self.end_date.unwrap_or(today),
            customer: self.customer,
        }
    }
}

/// 响应体: 对账单 (含汇总)
#[derive(Debug, Serialize)]
pub struct StatementResponse {
    pub success: bool,
    pub message: String,
    pub statement: GeneratedStatement,
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub date: Option<NaiveDate>,
}

/// 已登录会话 (Authorization: Bearer <token>)
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: Uuid,
    pub account: Account,
}

impl CurrentSession {
    pub fn owner(&self) -> Uuid {
        self.account.id
    }
}

fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let account = state.sessions.current(&token).ok_or(AppError::Unauthorized)?;
        Ok(CurrentSession { token, account })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn require_name(name: &str, what: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} name is required", what)));
    }
    Ok(())
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn sign_up(State(state): State<AppState>, Json(req): Json<SignUpRequest>) -> Json<AuthOutcome> {
    Json(state.auth.sign_up(req).await)
}

pub async fn sign_in(State(state): State<AppState>, Json(req): Json<SignInRequest>) -> Json<AuthOutcome> {
    Json(state.auth.sign_in(req).await)
}

pub async fn sign_out(State(state): State<AppState>, session: CurrentSession) -> StatusCode {
    state.auth.sign_out(&session.token);
    StatusCode::NO_CONTENT
}

pub async fn current_session(session: CurrentSession) -> Json<Account> {
    Json(session.account)
}

pub async fn list_products(State(state): State<AppState>, session: CurrentSession) -> Json<Vec<Product>> {
    state.store.ensure_loaded(session.owner()).await;
    Json(state.store.products(&session.owner()))
}

pub async fn add_product(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<ProductInput>,
) -> AppResult<Response> {
    require_name(&input.name, "product")?;
    let product = state.store.add_product(session.owner(), &input).await?;
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

pub async fn update_product(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    require_name(&input.name, "product")?;
    Ok(Json(state.store.update_product(session.owner(), id, &input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.delete_product(session.owner(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_customers(State(state): State<AppState>, session: CurrentSession) -> Json<Vec<Customer>> {
    state.store.ensure_loaded(session.owner()).await;
    Json(state.store.customers(&session.owner()))
}

pub async fn add_customer(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<CustomerInput>,
) -> AppResult<Response> {
    require_name(&input.name, "customer")?;
    let customer = state.store.add_customer(session.owner(), &input).await?;
    Ok((StatusCode::CREATED, Json(customer)).into_response())
}

pub async fn update_customer(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
    Json(input): Json<CustomerInput>,
) -> AppResult<Json<Customer>> {
    require_name(&input.name, "customer")?;
    Ok(Json(state.store.update_customer(session.owner(), id, &input).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.delete_customer(session.owner(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_orders(State(state): State<AppState>, session: CurrentSession) -> Json<Vec<Order>> {
    state.store.ensure_loaded(session.owner()).await;
    Json(state.store.orders(&session.owner()))
}

pub async fn add_order(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<OrderInput>,
) -> AppResult<Response> {
    // 客户名补全依赖缓存
    state.store.ensure_loaded(session.owner()).await;
    let order = state.store.add_order(session.owner(), &input).await?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

pub async fn update_order(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
    Json(input): Json<OrderInput>,
) -> AppResult<Json<Order>> {
    state.store.ensure_loaded(session.owner()).await;
    Ok(Json(state.store.update_order(session.owner(), id, &input).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.delete_order(session.owner(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 重新拉取当前账号的全部数据
pub async fn refetch(State(state): State<AppState>, session: CurrentSession) -> Json<MessageResponse> {
    let owner = session.owner();
    state.store.refetch(owner).await;
    let (products, customers, orders) = state.store.read(&owner, |c| {
        (c.products.len(), c.customers.len(), c.orders.len())
    });
    Json(MessageResponse {
        success: true,
        message: format!(
            "Loaded {} products, {} customers, {} orders",
            products, customers, orders
        ),
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<DashboardParams>,
) -> Json<Dashboard> {
    let owner = session.owner();
    state.store.ensure_loaded(owner).await;
    let date = params.date.unwrap_or_else(today);
    Json(state.store.read(&owner, |c| build_dashboard(c, date)))
}

/// 生成对账单, 结果保留供导出
pub async fn generate_statement(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<StatementRequest>,
) -> Json<StatementResponse> {
    let owner = session.owner();
    state.store.ensure_loaded(owner).await;

    let query = req.into_query(today());
    let statement = state.store.generate_statement(owner, query);
    tracing::info!(
        "Generated statement for account {}: {} orders, customer {}",
        owner,
        statement.result.total_orders,
        statement.query.customer
    );

    Json(StatementResponse {
        success: true,
        message: format!("Found {} orders", statement.result.total_orders),
        statement,
    })
}

/// 下载最近一次生成的对账单
pub async fn export_statement(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(format): Path<String>,
) -> AppResult<Response> {
    let format: ExportFormat = format.parse()?;
    let statement = state
        .store
        .last_statement(&session.owner())
        .ok_or(AppError::NoStatement)?;

    let report = &state.config.report;
    let statement_header =
        StatementHeader::for_statement(&statement, &report.business_name, &report.currency_label);
    let artifact = export::render(format, &statement_header, &statement.result)?;

    let disposition = export::content_disposition(&artifact.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}
