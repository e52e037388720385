use crate::models::{Order, OrderItem, OrderRow, OrderStatus};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// 入库用的订单字段 (客户名已补全)
#[derive(Debug, Clone)]
pub struct OrderFields {
    pub date: NaiveDate,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total_amount: BigDecimal,
    pub amount_paid: Option<BigDecimal>,
    pub status: OrderStatus,
}

fn into_order(row: OrderRow) -> Result<Order, sqlx::Error> {
    Order::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// 查询账号下全部订单 (日期降序)
pub async fn list_orders(pool: &PgPool, owner: Uuid) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, date, customer_id, customer_name, items,
               total_amount, amount_paid, status, created_at
        FROM daily_orders
        WHERE user_id = $1
        ORDER BY date DESC, created_at DESC
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(into_order).collect()
}

/// 新增订单, 返回入库后的行
pub async fn insert_order(
    pool: &PgPool,
    owner: Uuid,
    fields: &OrderFields,
) -> Result<Order, sqlx::Error> {
    let row = sqlx::query_as::<_, OrderRow>(
        r#"
        INSERT INTO daily_orders (
            id, user_id, date, customer_id, customer_name, items,
            total_amount, amount_paid, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, date, customer_id, customer_name, items,
                  total_amount, amount_paid, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(fields.date)
    .bind(fields.customer_id)
    .bind(&fields.customer_name)
    .bind(Json(&fields.items))
    .bind(&fields.total_amount)
    .bind(&fields.amount_paid)
    .bind(fields.status.as_str())
    .fetch_one(pool)
    .await?;

    into_order(row)
}

/// 修改订单, 行不存在时返回 None
pub async fn update_order(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    fields: &OrderFields,
) -> Result<Option<Order>, sqlx::Error> {
    let row = sqlx::query_as::<_, OrderRow>(
        r#"
        UPDATE daily_orders
        SET date = $3, customer_id = $4, customer_name = $5, items = $6,
            total_amount = $7, amount_paid = $8, status = $9
        WHERE id = $1 AND user_id = $2
        RETURNING id, date, customer_id, customer_name, items,
                  total_amount, amount_paid, status, created_at
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(fields.date)
    .bind(fields.customer_id)
    .bind(&fields.customer_name)
    .bind(Json(&fields.items))
    .bind(&fields.total_amount)
    .bind(&fields.amount_paid)
    .bind(fields.status.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(into_order).transpose()
}

pub async fn delete_order(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM daily_orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
