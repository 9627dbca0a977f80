use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use ledger_store::PgLedgerStore;
use platform_api::{
    config::Config,
    handlers,
    services::{AdminService, WithdrawalService},
};
use settlement::{LogSink, SettlementConfig, SettlementEngine, SettlementScheduler};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    let settlement_config =
        SettlementConfig::from_env().expect("Failed to load settlement configuration");

    info!("Starting Platform API on port {}", config.server.port);

    let store = Arc::new(
        PgLedgerStore::connect(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to connect to database"),
    );

    let engine = Arc::new(SettlementEngine::new(
        store.clone(),
        Arc::new(LogSink),
        settlement_config,
    ));

    let scheduler = Arc::new(SettlementScheduler::new(engine.clone()));
    tokio::spawn(scheduler.clone().start());

    let admin_service = Arc::new(AdminService::new(engine, scheduler));
    let withdrawal_service = Arc::new(WithdrawalService::new(store));

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(admin_service.clone()))
            .app_data(web::Data::new(withdrawal_service.clone()))
            .configure(handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
