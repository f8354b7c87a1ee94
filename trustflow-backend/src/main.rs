use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

mod config;
mod controllers;
mod db;
mod error;
mod intents;
mod ledger;
mod models;

use config::Config;
use db::Database;
use intents::{ActionRegistry, Orchestrator};
use ledger::{EvmLedger, Ledger};

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Config,
    /// System account address, lowercase hex
    pub account: String,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    log::debug!("Loaded {:?}", config);
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(io::Error::other)?;
    let db = Arc::new(db);

    log::info!("Connecting to ledger at {}", config.rpc_url);
    let ledger = EvmLedger::connect(&config.rpc_url, &config.private_key)
        .await
        .map_err(|e| {
            log::error!("Failed to connect to ledger: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e)
        })?;
    let account = format!("{:?}", ledger.account_address()).to_lowercase();
    log::info!(
        "Ledger ready: chain_id={} account={}",
        ledger.chain_id(),
        account
    );

    let registry = Arc::new(ActionRegistry::with_defaults());
    log::info!("Registered actions: {:?}", registry.actions());

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(ledger),
        db.clone(),
        registry,
        config.settlement_delay,
    ));

    log::info!(
        "Starting TrustFlow server on port {} (settlement delay {:?}, intent timeout {:?})",
        port,
        config.settlement_delay,
        config.intent_timeout
    );

    let state = web::Data::new(AppState {
        orchestrator,
        config,
        account,
    });

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(controllers::json_config())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::intents::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
