use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: SocketAddr,
    pub page_size: u32,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn load() -> Result<Self> {
        let page_size: u32 = try_load("PAGE_SIZE", "10")?;
        if page_size == 0 {
            return Err(anyhow!("PAGE_SIZE must be at least 1"));
        }
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            bind_address: try_load("BIND_ADDRESS", "127.0.0.1:3001")?,
            page_size,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid value for {key}: {e}")
    })
}
