use bigdecimal::{BigDecimal, Zero};
use crate::models::{Customer, CustomerFilter, Order, StatementQuery, StatementResult};
use indexmap::IndexMap;
use uuid::Uuid;

/// 生成对账单: 按日期闭区间和客户筛选订单, 计算汇总
///
/// 纯函数, 不会失败. 无匹配订单 (含 start > end) 时返回全零结果.
/// 结果订单按日期降序, 同日保持输入顺序.
pub fn generate_statement<'a, I>(orders: I, query: &StatementQuery) -> StatementResult
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut filtered: Vec<Order> = orders
        .into_iter()
        .filter(|o| o.date >= query.start_date && o.date <= query.end_date)
        .filter(|o| query.customer.matches(&o.customer_id))
        .cloned()
        .collect();

    // 稳定排序
    filtered.sort_by(|a, b| b.date.cmp(&a.date));

    let mut total_amount = BigDecimal::zero();
    let mut total_paid = BigDecimal::zero();
    let mut delivered_orders = 0;
    for order in &filtered {
        total_amount += &order.total_amount;
        if let Some(paid) = &order.amount_paid {
            total_paid += paid;
        }
        if order.is_delivered() {
            delivered_orders += 1;
        }
    }

    // 超付时允许为负, 不截断
    let pending_amount = &total_amount - &total_paid;
    let total_orders = filtered.len();

    StatementResult {
        orders: filtered,
        total_amount,
        total_paid,
        pending_amount,
        total_orders,
        delivered_orders,
        pending_orders: total_orders - delivered_orders,
    }
}

/// 对账单上展示的客户名
pub fn customer_display_name(filter: &CustomerFilter, customers: &IndexMap<Uuid, Customer>) -> String {
    match filter {
        CustomerFilter::All => "All Customers".to_string(),
        CustomerFilter::Customer(id) => customers
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Customer".to_string()),
    }
}
