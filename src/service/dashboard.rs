use bigdecimal::{BigDecimal, Zero};
use crate::models::{Dashboard, Order, ProductTally};
use crate::service::store::Collections;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

/// 首页最多展示的今日订单数
pub const RECENT_ORDER_LIMIT: usize = 5;

/// 汇总某一天的首页概览
pub fn build_dashboard(collections: &Collections, today: NaiveDate) -> Dashboard {
    let todays: Vec<&Order> = collections
        .orders
        .values()
        .filter(|o| o.date == today)
        .collect();

    let delivered: Vec<&Order> = todays.iter().copied().filter(|o| o.is_delivered()).collect();
    let todays_collection = delivered
        .iter()
        .fold(BigDecimal::zero(), |sum, o| sum + &o.total_amount);

    // 已删除的商品不计入
    let mut tally: HashMap<Uuid, BigDecimal> = HashMap::new();
    for order in &todays {
        for item in &order.items {
            if !collections.products.contains_key(&item.product_id) {
                continue;
            }
            *tally.entry(item.product_id).or_insert_with(BigDecimal::zero) += &item.quantity;
        }
    }

    let mut product_summary: Vec<ProductTally> = tally
        .into_iter()
        .filter_map(|(id, total)| {
            collections.products.get(&id).map(|p| ProductTally {
                product_name: p.name.clone(),
                total,
            })
        })
        .collect();
    product_summary.sort_by(|a, b| a.product_name.cmp(&b.product_name));

    let recent_orders: Vec<Order> = todays
        .iter()
        .take(RECENT_ORDER_LIMIT)
        .map(|o| (*o).clone())
        .collect();

    Dashboard {
        date: today,
        pending_deliveries: todays.len() - delivered.len(),
        delivered_today: delivered.len(),
        todays_collection,
        total_products: collections.products.len(),
        total_customers: collections.customers.len(),
        total_orders_today: todays.len(),
        product_summary,
        more_orders: todays.len().saturating_sub(RECENT_ORDER_LIMIT),
        recent_orders,
    }
}
