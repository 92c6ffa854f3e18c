use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use std::path::Path;

use storage_bridge::api;
use storage_bridge::app_state::AppState;
use storage_bridge::config::{AppConfig, LoggingConfig};

fn init_logging(logging: &LoggingConfig) {
    if Path::new(&logging.config_file).exists() {
        match log4rs::init_file(&logging.config_file, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load {}: {}, falling back to env_logger", logging.config_file, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    init_logging(&config.logging);

    let state = web::Data::new(AppState::from_config(config.clone()));
    if state.services().is_err() {
        warn!("Starting without storage; requests will answer 500 until the connection string is fixed");
    }

    let server = &config.server;
    info!("Starting server on {}:{}", server.host, server.port);
    let payload_limit = server.max_payload_size as usize;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(web::PayloadConfig::default().limit(payload_limit))
            .configure(api::configure)
    })
    .workers(server.workers)
    .bind((server.host.as_str(), server.port))?
    .run()
    .await
}
