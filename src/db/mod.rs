pub mod pool;
pub mod queries;
pub mod queries_accounts;
pub mod queries_orders;

pub use pool::{create_pool, run_migrations};
pub use queries::*;
pub use queries_accounts::*;
pub use queries_orders::*;
