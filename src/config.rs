use std::env;
use std::net::SocketAddr;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub period_watch_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://pfa.db".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::BadRequest(format!("BIND_ADDR is not a valid address: {}", e)))?;

        let period_watch_interval_secs = match env::var("PERIOD_WATCH_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::BadRequest("PERIOD_WATCH_INTERVAL_SECS must be an integer".to_string()))?,
            Err(_) => 60,
        };

        Ok(Self {
            database_url,
            bind_addr,
            period_watch_interval_secs,
        })
    }
}
