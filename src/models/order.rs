use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 配送状态, 只有两种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// 订单明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: BigDecimal,
}

/// 每日订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub date: NaiveDate,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total_amount: BigDecimal,
    pub amount_paid: Option<BigDecimal>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// 已付金额, 未填视为 0
    pub fn paid(&self) -> BigDecimal {
        self.amount_paid.clone().unwrap_or_else(BigDecimal::zero)
    }

    /// 剩余应收 (超付时为负)
    pub fn remaining(&self) -> BigDecimal {
        &self.total_amount - self.paid()
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }
}

/// 订单表 (daily_orders) 原始行
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub items: Json<Vec<OrderItem>>,
    pub total_amount: BigDecimal,
    pub amount_paid: Option<BigDecimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = UnknownStatus;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            date: row.date,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            items: row.items.0,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// 新增/修改订单请求体
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInput {
    pub date: NaiveDate,
    pub customer_id: Uuid,
    /// 为空时按客户缓存补全
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub amount_paid: Option<BigDecimal>,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
}

fn default_status() -> OrderStatus {
    OrderStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn order(total: &str, paid: Option<&str>) -> Order {
        Order {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            customer_id: Uuid::new_v4(),
            customer_name: "Ramesh".to_string(),
            items: Vec::new(),
            total_amount: dec(total),
            amount_paid: paid.map(dec),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_payment_counts_as_zero() {
        let o = order("75.50", None);
        assert_eq!(o.paid(), BigDecimal::zero());
        assert_eq!(o.remaining(), dec("75.50"));
    }

    #[test]
    fn overpayment_leaves_negative_remaining() {
        let o = order("40", Some("55"));
        assert_eq!(o.remaining(), dec("-15"));
    }

    #[test]
    fn status_parses_lowercase_names_only() {
        assert_eq!("pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!("delivered".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert!("Delivered".parse::<OrderStatus>().is_err());
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn input_defaults_to_pending() {
        let input: OrderInput = serde_json::from_value(serde_json::json!({
            "date": "2024-03-05",
            "customer_id": Uuid::nil(),
            "total_amount": "120.00"
        }))
        .unwrap();
        assert_eq!(input.status, OrderStatus::Pending);
        assert!(input.items.is_empty());
        assert!(input.amount_paid.is_none());
    }

    #[test]
    fn row_with_bad_status_is_rejected() {
        let row = OrderRow {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            customer_id: Uuid::new_v4(),
            customer_name: "Sita".to_string(),
            items: Json(vec![]),
            total_amount: dec("10"),
            amount_paid: None,
            status: "lost".to_string(),
            created_at: Utc::now(),
        };
        assert!(Order::try_from(row).is_err());
    }
}
