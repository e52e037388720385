use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

use super::Order;

/// 单个商品当日订购总量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductTally {
    pub product_name: String,
    pub total: BigDecimal,
}

/// 首页今日概览
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub pending_deliveries: usize,
    pub delivered_today: usize,
    pub todays_collection: BigDecimal,
    pub total_products: usize,
    pub total_customers: usize,
    pub total_orders_today: usize,
    pub product_summary: Vec<ProductTally>,
    pub recent_orders: Vec<Order>,
    pub more_orders: usize,
}
