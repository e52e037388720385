use crate::db::{self, OrderFields};
use crate::error::{AppError, AppResult};
use crate::models::{
    Customer, CustomerInput, GeneratedStatement, Order, OrderInput, Product, ProductInput,
    StatementQuery,
};
use crate::service::session::{SessionChange, SessionEvent, SessionSubscription};
use crate::service::statement;
use dashmap::DashMap;
use indexmap::IndexMap;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// 可按 id 缓存的实体
pub trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for Product {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Customer {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Order {
    fn key(&self) -> Uuid {
        self.id
    }
}

fn index<T: Keyed>(rows: Vec<T>) -> IndexMap<Uuid, T> {
    rows.into_iter().map(|row| (row.key(), row)).collect()
}

/// 插到最前 (与远端 "新建在前" 一致)
fn put_front<T: Keyed>(map: &mut IndexMap<Uuid, T>, row: T) {
    map.shift_remove(&row.key());
    map.shift_insert(0, row.key(), row);
}

/// 原位替换, 不存在时返回 false
fn replace<T: Keyed>(map: &mut IndexMap<Uuid, T>, row: T) -> bool {
    match map.get_mut(&row.key()) {
        Some(slot) => {
            *slot = row;
            true
        }
        None => false,
    }
}

/// 单个账号的本地镜像
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub products: IndexMap<Uuid, Product>,
    pub customers: IndexMap<Uuid, Customer>,
    pub orders: IndexMap<Uuid, Order>,
    pub last_statement: Option<GeneratedStatement>,
}

impl Collections {
    pub fn from_lists(products: Vec<Product>, customers: Vec<Customer>, orders: Vec<Order>) -> Self {
        Self {
            products: index(products),
            customers: index(customers),
            orders: index(orders),
            last_statement: None,
        }
    }

    pub fn apply_product_inserted(&mut self, product: Product) {
        put_front(&mut self.products, product);
    }

    pub fn apply_product_updated(&mut self, product: Product) -> bool {
        replace(&mut self.products, product)
    }

    pub fn apply_product_deleted(&mut self, id: &Uuid) -> bool {
        self.products.shift_remove(id).is_some()
    }

    pub fn apply_customer_inserted(&mut self, customer: Customer) {
        put_front(&mut self.customers, customer);
    }

    pub fn apply_customer_updated(&mut self, customer: Customer) -> bool {
        replace(&mut self.customers, customer)
    }

    pub fn apply_customer_deleted(&mut self, id: &Uuid) -> bool {
        self.customers.shift_remove(id).is_some()
    }

    /// 新订单放最前后按日期降序重排 (稳定)
    pub fn apply_order_inserted(&mut self, order: Order) {
        put_front(&mut self.orders, order);
        self.orders.sort_by(|_, a, _, b| b.date.cmp(&a.date));
    }

    pub fn apply_order_updated(&mut self, order: Order) -> bool {
        replace(&mut self.orders, order)
    }

    pub fn apply_order_deleted(&mut self, id: &Uuid) -> bool {
        self.orders.shift_remove(id).is_some()
    }
}

/// 各账号数据的缓存镜像
///
/// 先写库, 成功后用库返回的行修补本地缓存, 不重新拉取.
pub struct DataStore {
    pool: PgPool,
    accounts: DashMap<Uuid, Collections>,
}

impl DataStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            accounts: DashMap::new(),
        }
    }

    /// 并发拉取三张表; 失败时只记录日志, 保留已有缓存
    pub async fn load(&self, owner: Uuid) {
        let fetched = futures::try_join!(
            db::list_products(&self.pool, owner),
            db::list_customers(&self.pool, owner),
            db::list_orders(&self.pool, owner),
        );

        match fetched {
            Ok((products, customers, orders)) => {
                tracing::info!(
                    "Loaded account {}: {} products, {} customers, {} orders",
                    owner,
                    products.len(),
                    customers.len(),
                    orders.len()
                );
                let mut fresh = Collections::from_lists(products, customers, orders);
                if let Some(previous) = self.accounts.get(&owner) {
                    fresh.last_statement = previous.last_statement.clone();
                }
                self.replace_collections(owner, fresh);
            }
            Err(e) => {
                tracing::error!("Error fetching data for account {}: {:?}", owner, e);
                self.accounts.entry(owner).or_default();
            }
        }
    }

    pub async fn ensure_loaded(&self, owner: Uuid) {
        if !self.accounts.contains_key(&owner) {
            self.load(owner).await;
        }
    }

    pub async fn refetch(&self, owner: Uuid) {
        self.load(owner).await;
    }

    pub fn evict(&self, owner: &Uuid) {
        if self.accounts.remove(owner).is_some() {
            tracing::info!("Evicted cached data for account {}", owner);
        }
    }

    pub fn is_loaded(&self, owner: &Uuid) -> bool {
        self.accounts.contains_key(owner)
    }

    pub(crate) fn replace_collections(&self, owner: Uuid, collections: Collections) {
        self.accounts.insert(owner, collections);
    }

    /// 只读访问某账号缓存, 未加载时视为空
    pub fn read<R>(&self, owner: &Uuid, f: impl FnOnce(&Collections) -> R) -> R {
        match self.accounts.get(owner) {
            Some(entry) => f(entry.value()),
            None => f(&Collections::default()),
        }
    }

    fn patch<R>(&self, owner: Uuid, f: impl FnOnce(&mut Collections) -> R) -> R {
        let mut entry = self.accounts.entry(owner).or_default();
        f(entry.value_mut())
    }

    /// 未加载的账号不修补, 下次加载时从库里拿到最新数据
    fn patch_loaded(&self, owner: &Uuid, f: impl FnOnce(&mut Collections)) {
        if let Some(mut entry) = self.accounts.get_mut(owner) {
            f(entry.value_mut());
        }
    }

    pub fn products(&self, owner: &Uuid) -> Vec<Product> {
        self.read(owner, |c| c.products.values().cloned().collect())
    }

    pub fn customers(&self, owner: &Uuid) -> Vec<Customer> {
        self.read(owner, |c| c.customers.values().cloned().collect())
    }

    pub fn orders(&self, owner: &Uuid) -> Vec<Order> {
        self.read(owner, |c| c.orders.values().cloned().collect())
    }

    pub async fn add_product(&self, owner: Uuid, input: &ProductInput) -> AppResult<Product> {
        let product = db::insert_product(&self.pool, owner, input).await?;
        tracing::debug!("Inserted product {} for account {}", product.id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_product_inserted(product.clone());
        });
        Ok(product)
    }

    pub async fn update_product(
        &self,
        owner: Uuid,
        id: Uuid,
        input: &ProductInput,
    ) -> AppResult<Product> {
        let product = db::update_product(&self.pool, owner, id, input)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;
        tracing::debug!("Updated product {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_product_updated(product.clone());
        });
        Ok(product)
    }

    pub async fn delete_product(&self, owner: Uuid, id: Uuid) -> AppResult<()> {
        if !db::delete_product(&self.pool, owner, id).await? {
            return Err(AppError::NotFound(format!("product {}", id)));
        }
        tracing::debug!("Deleted product {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_product_deleted(&id);
        });
        Ok(())
    }

    pub async fn add_customer(&self, owner: Uuid, input: &CustomerInput) -> AppResult<Customer> {
        let customer = db::insert_customer(&self.pool, owner, input).await?;
        tracing::debug!("Inserted customer {} for account {}", customer.id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_customer_inserted(customer.clone());
        });
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        owner: Uuid,
        id: Uuid,
        input: &CustomerInput,
    ) -> AppResult<Customer> {
        let customer = db::update_customer(&self.pool, owner, id, input)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("customer {}", id)))?;
        tracing::debug!("Updated customer {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_customer_updated(customer.clone());
        });
        Ok(customer)
    }

    pub async fn delete_customer(&self, owner: Uuid, id: Uuid) -> AppResult<()> {
        if !db::delete_customer(&self.pool, owner, id).await? {
            return Err(AppError::NotFound(format!("customer {}", id)));
        }
        tracing::debug!("Deleted customer {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_customer_deleted(&id);
        });
        Ok(())
    }

    /// 请求未带客户名时用缓存中的客户补全
    fn order_fields(&self, owner: &Uuid, input: &OrderInput) -> AppResult<OrderFields> {
        let customer_name = match input.customer_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .read(owner, |c| c.customers.get(&input.customer_id).map(|c| c.name.clone()))
                .ok_or_else(|| {
                    AppError::BadRequest(format!("unknown customer {}", input.customer_id))
                })?,
        };

        Ok(OrderFields {
            date: input.date,
            customer_id: input.customer_id,
            customer_name,
            items: input.items.clone(),
            total_amount: input.total_amount.clone(),
            amount_paid: input.amount_paid.clone(),
            status: input.status,
        })
    }

    pub async fn add_order(&self, owner: Uuid, input: &OrderInput) -> AppResult<Order> {
        let fields = self.order_fields(&owner, input)?;
        let order = db::insert_order(&self.pool, owner, &fields).await?;
        tracing::debug!("Inserted order {} ({}) for account {}", order.id, order.date, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_order_inserted(order.clone());
        });
        Ok(order)
    }

    pub async fn update_order(&self, owner: Uuid, id: Uuid, input: &OrderInput) -> AppResult<Order> {
        let fields = self.order_fields(&owner, input)?;
        let order = db::update_order(&self.pool, owner, id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;
        tracing::debug!("Updated order {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_order_updated(order.clone());
        });
        Ok(order)
    }

    pub async fn delete_order(&self, owner: Uuid, id: Uuid) -> AppResult<()> {
        if !db::delete_order(&self.pool, owner, id).await? {
            return Err(AppError::NotFound(format!("order {}", id)));
        }
        tracing::debug!("Deleted order {} for account {}", id, owner);
        self.patch_loaded(&owner, |c| {
            c.apply_order_deleted(&id);
        });
        Ok(())
    }

    /// 基于缓存订单生成对账单, 并替换上一次的结果
    pub fn generate_statement(&self, owner: Uuid, query: StatementQuery) -> GeneratedStatement {
        self.patch(owner, |c| {
            let result = statement::generate_statement(c.orders.values(), &query);
            let customer_name = statement::customer_display_name(&query.customer, &c.customers);
            let generated = GeneratedStatement {
                query,
                customer_name,
                result,
            };
            c.last_statement = Some(generated.clone());
            generated
        })
    }

    pub fn last_statement(&self, owner: &Uuid) -> Option<GeneratedStatement> {
        self.read(owner, |c| c.last_statement.clone())
    }

    /// 清除已无在线会话的账号缓存, 返回清除数量
    pub fn evict_signed_out(&self, still_signed_in: impl Fn(&Uuid) -> bool) -> usize {
        let before = self.accounts.len();
        self.accounts.retain(|owner, _| still_signed_in(owner));
        let evicted = before - self.accounts.len();
        if evicted > 0 {
            tracing::info!("Evicted cached data for {} signed-out accounts", evicted);
        }
        evicted
    }

    /// 跟随会话变化: 登录时预加载, 账号全部会话退出后清除缓存
    ///
    /// 加载在独立任务中进行, 不阻塞通知接收; 通知丢失时整体清扫一次.
    pub fn follow_sessions(
        self: Arc<Self>,
        mut subscription: SessionSubscription,
        still_signed_in: impl Fn(&Uuid) -> bool + Send + Sync + 'static,
    ) -> JoinHandle<()> {
        let still_signed_in = Arc::new(still_signed_in);
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                match event {
                    SessionEvent::Changed(SessionChange {
                        account: Some(account),
                        ..
                    }) => {
                        let store = self.clone();
                        let still_signed_in = still_signed_in.clone();
                        tokio::spawn(async move {
                            store.ensure_loaded(account.id).await;
                            // 加载期间已退出
                            if !still_signed_in(&account.id) {
                                store.evict(&account.id);
                            }
                        });
                    }
                    SessionEvent::Changed(change) => {
                        if !still_signed_in(&change.account_id) {
                            self.evict(&change.account_id);
                        }
                    }
                    SessionEvent::Lagged(_) => {
                        self.evict_signed_out(|owner| still_signed_in(owner));
                    }
                }
            }
            tracing::info!("Session listener stopped");
        })
    }
}
