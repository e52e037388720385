pub mod account;
pub mod customer;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod statement;

pub use account::{Account, AccountRow};
pub use customer::{Customer, CustomerInput};
pub use dashboard::{Dashboard, ProductTally};
pub use order::{Order, OrderInput, OrderItem, OrderRow, OrderStatus, UnknownStatus};
pub use product::{Product, ProductInput};
pub use statement::{CustomerFilter, GeneratedStatement, StatementQuery, StatementResult};
