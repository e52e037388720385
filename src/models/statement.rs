use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Order;

/// 客户筛选条件, 线上格式为 "all" 或客户 UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CustomerFilter {
    #[default]
    All,
    Customer(Uuid),
}

impl CustomerFilter {
    pub const ALL: &'static str = "all";

    pub fn matches(&self, customer_id: &Uuid) -> bool {
        match self {
            CustomerFilter::All => true,
            CustomerFilter::Customer(id) => id == customer_id,
        }
    }
}

impl FromStr for CustomerFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::ALL) {
            return Ok(CustomerFilter::All);
        }
        Uuid::parse_str(s)
            .map(CustomerFilter::Customer)
            .map_err(|_| format!("invalid customer id `{}`", s))
    }
}

impl TryFrom<String> for CustomerFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CustomerFilter> for String {
    fn from(filter: CustomerFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for CustomerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerFilter::All => f.write_str(Self::ALL),
            CustomerFilter::Customer(id) => write!(f, "{}", id),
        }
    }
}

/// 对账单查询条件 (日期闭区间)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub customer: CustomerFilter,
}

/// 对账单结果 (派生数据, 不落库)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub orders: Vec<Order>,
    pub total_amount: BigDecimal,
    pub total_paid: BigDecimal,
    pub pending_amount: BigDecimal,
    pub total_orders: usize,
    pub delivered_orders: usize,
    pub pending_orders: usize,
}

impl StatementResult {
    pub fn empty() -> Self {
        Self {
            orders: Vec::new(),
            total_amount: BigDecimal::zero(),
            total_paid: BigDecimal::zero(),
            pending_amount: BigDecimal::zero(),
            total_orders: 0,
            delivered_orders: 0,
            pending_orders: 0,
        }
    }
}

/// 最近一次生成的对账单, 导出时使用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedStatement {
    pub query: StatementQuery,
    pub customer_name: String,
    pub result: StatementResult,
}
