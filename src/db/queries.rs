use crate::models::{Customer, CustomerInput, Product, ProductInput};
use sqlx::PgPool;
use uuid::Uuid;

/// 查询账号下全部商品 (新建在前)
pub async fn list_products(pool: &PgPool, owner: Uuid) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, unit, price, created_at
        FROM products
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await
}

/// 新增商品, 返回入库后的行
pub async fn insert_product(
    pool: &PgPool,
    owner: Uuid,
    input: &ProductInput,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (id, user_id, name, unit, price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, unit, price, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(&input.name)
    .bind(&input.unit)
    .bind(&input.price)
    .fetch_one(pool)
    .await
}

/// 修改商品, 行不存在时返回 None
pub async fn update_product(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    input: &ProductInput,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $3, unit = $4, price = $5
        WHERE id = $1 AND user_id = $2
        RETURNING id, name, unit, price, created_at
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(&input.name)
    .bind(&input.unit)
    .bind(&input.price)
    .fetch_optional(pool)
    .await
}

pub async fn delete_product(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// 查询账号下全部客户 (新建在前)
pub async fn list_customers(pool: &PgPool, owner: Uuid) -> Result<Vec<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, phone, address, created_at
        FROM customers
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await
}

pub async fn insert_customer(
    pool: &PgPool,
    owner: Uuid,
    input: &CustomerInput,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (id, user_id, name, phone, address)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, phone, address, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.address)
    .fetch_one(pool)
    .await
}

pub async fn update_customer(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    input: &CustomerInput,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET name = $3, phone = $4, address = $5
        WHERE id = $1 AND user_id = $2
        RETURNING id, name, phone, address, created_at
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.address)
    .fetch_optional(pool)
    .await
}

pub async fn delete_customer(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
