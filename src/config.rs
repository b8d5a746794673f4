use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// MySQL connection string; unset means the in-memory store.
    pub database_url: Option<String>,

    // Rate limiting
    pub rate_api_per_min: u32,

    pub api_prefix: String,

    /// Annual entitlement a lazily created ledger starts with.
    pub default_annual_entitlement: Decimal,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),

            rate_api_per_min: env::var("RATE_API_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            default_annual_entitlement: env::var("DEFAULT_ANNUAL_ENTITLEMENT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap(),
        }
    }
}
