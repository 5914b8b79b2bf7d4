use serde::Deserialize;
use std::env;

// Top-level configuration container for the service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
    pub pagination: PaginationConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Database settings; url is optional so the service can run fully
// in-process (tests, local development) without Postgres
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Seat-hold and concurrency settings
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// How long a seat block stays valid, in seconds.
    pub hold_duration_secs: u64,
    /// How often the background sweep reclaims expired blocks, in seconds.
    pub sweep_interval_secs: u64,
    /// Bounded retry budget for optimistic-lock contention.
    pub max_cas_retries: u32,
}

// Listing pagination settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "showtime_system=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            booking: BookingConfig {
                hold_duration_secs: env::var("SEAT_HOLD_DURATION_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .expect("SEAT_HOLD_DURATION_SECS must be a valid number"),
                sweep_interval_secs: env::var("BLOCK_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "45".to_string())
                    .parse()
                    .expect("BLOCK_SWEEP_INTERVAL_SECS must be a valid number"),
                max_cas_retries: env::var("MAX_CAS_RETRIES")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .expect("MAX_CAS_RETRIES must be a valid number"),
            },
            pagination: PaginationConfig {
                default_page_size: env::var("DEFAULT_PAGE_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DEFAULT_PAGE_SIZE must be a valid number"),
                max_page_size: env::var("MAX_PAGE_SIZE")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .expect("MAX_PAGE_SIZE must be a valid number"),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                environment: "development".to_string(),
                rust_log: "showtime_system=debug".to_string(),
            },
            database: DatabaseConfig { url: None, pool_size: 20 },
            booking: BookingConfig {
                hold_duration_secs: 600,
                sweep_interval_secs: 45,
                max_cas_retries: 8,
            },
            pagination: PaginationConfig { default_page_size: 20, max_page_size: 100 },
        }
    }
}
