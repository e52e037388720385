use dairy_ledger::{api, create_pool, run_migrations, AppConfig, AuthService, DataStore, SessionRegistry};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 本地时间格式, RUST_LOG 优先于配置
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_str()));
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        info!("Migrations applied");
    }

    // 会话 / 缓存 / 认证
    let sessions = Arc::new(SessionRegistry::new());
    let store = Arc::new(DataStore::new(pool.clone()));
    let auth = Arc::new(AuthService::new(pool, sessions.clone()));

    // 登录预加载, 退出清理缓存
    let registry = sessions.clone();
    store
        .clone()
        .follow_sessions(sessions.subscribe(), move |account_id| registry.is_signed_in(account_id));

    let addr = config.listen_addr();
    let app = api::router(api::AppState {
        config: Arc::new(config),
        store,
        auth,
        sessions,
    });

    // 启动服务器
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/auth/sign-up | sign-in | sign-out, GET /api/auth/session");
    info!("  GET|POST /api/products, /api/customers, /api/orders  (PUT|DELETE .../:id)");
    info!("  POST /api/refetch, GET /api/dashboard");
    info!("  POST /api/statement, GET /api/statement/export/:format (pdf|xlsx|csv)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
