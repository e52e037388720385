pub mod auth;
pub mod dashboard;
pub mod session;
pub mod statement;
pub mod store;

pub use auth::{AuthOutcome, AuthService, Session, SignInRequest, SignUpRequest};
pub use dashboard::build_dashboard;
pub use session::{SessionChange, SessionEvent, SessionRegistry, SessionSubscription};
pub use statement::{customer_display_name, generate_statement};
pub use store::{Collections, DataStore};
