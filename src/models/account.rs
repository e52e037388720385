use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 登录账号 (对外暴露, 不含密码哈希)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

/// 账号表 (accounts)
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        // 未设置用户名时退回邮箱
        let username = row
            .username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| row.email.clone());
        Self {
            id: row.id,
            email: row.email,
            username,
        }
    }
}
