use crate::models::AccountRow;
use sqlx::PgPool;
use uuid::Uuid;

/// 按邮箱查询账号 (邮箱统一小写存储)
pub async fn find_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRow>, sqlx::Error> {
    sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT id, email, username, password_hash, created_at
        FROM accounts
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// 注册账号
pub async fn insert_account(
    pool: &PgPool,
    email: &str,
    username: Option<&str>,
    password_hash: &str,
) -> Result<AccountRow, sqlx::Error> {
    sqlx::query_as::<_, AccountRow>(
        r#"
        INSERT INTO accounts (id, email, username, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, username, password_hash, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}
