use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loanledger::config::{AppConfig, Config, LogFormat};
use loanledger::middleware::RequestId;
use loanledger::notifications::{BroadcastNotificationSink, NotificationSink};
use loanledger::Services;

fn init_tracing(app: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(app.default_log_filter()));

    let registry = tracing_subscriber::registry().with(filter);
    match app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app);
    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::info!(
        env = config.app.env.as_str(),
        bind_address = %config.server.bind_address(),
        "Starting loan ledger"
    );

    let notifier: Arc<dyn NotificationSink> = Arc::new(BroadcastNotificationSink::default());

    let (services, db_pool) = match config.database.url {
        Some(_) => {
            let pool = config
                .database
                .create_pool()
                .await
                .context("Failed to create database pool")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!(
                pool_size = config.database.pool_size,
                max_connections = config.database.max_connections,
                "Database pool initialized"
            );

            (
                Services::mysql(pool.clone(), notifier, &config.reconciliation),
                Some(pool),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            (
                Services::in_memory(notifier, &config.reconciliation),
                None,
            )
        }
    };

    if config.reconciliation.enabled {
        let scheduler = Arc::new(services.scheduler(&config.reconciliation));
        tokio::spawn(scheduler.start());
    } else {
        tracing::info!("Reconciliation scheduler disabled");
    }

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .configure(|cfg| services.configure(cfg));

        if let Some(pool) = &db_pool {
            app = app.app_data(web::Data::new(pool.clone()));
        }

        app
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("HTTP server error")
}
