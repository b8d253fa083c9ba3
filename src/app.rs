use std::error::Error;

use actix_web::web;
use tracing::info;

use crate::application::ColumnStatsUseCase;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::logging::{init_tracing, RequestLog};
use crate::interfaces::http::{start_server, HttpState};

pub fn run() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    let config = ServerConfig::load()?;
    init_tracing(config.log_path().map(|path| path.as_path()))?;

    let stats = ColumnStatsUseCase::new(RequestLog::new(config.log_capacity));
    let state = web::Data::new(HttpState::new(stats, config.max_body_bytes));

    info!(
        host = %config.host,
        port = config.port,
        max_body_bytes = config.max_body_bytes,
        "Starting stats server"
    );

    actix_web::rt::System::new().block_on(async move { start_server(&config, state)?.await })?;

    Ok(())
}
