use serde::Deserialize;
use std::env;

// Top-level configuration container
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// Base URL used to build ticket links in confirmation responses.
    pub site_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// External payment gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub gateway_url: String,
    pub secret_key: String,
    pub success_url: String,
    pub cancel_url: String,
    pub failure_threshold: u32,
    pub cooldown_seconds: u64,
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
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "showtime=debug,tower_http=debug".to_string()),
                site_base_url: env::var("SITE_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            payment: PaymentConfig {
                gateway_url: env::var("PAYMENT_GATEWAY_URL")
                    .unwrap_or_else(|_| "https://gateway.example.com".to_string()),
                secret_key: env::var("PAYMENT_SECRET_KEY").expect("PAYMENT_SECRET_KEY must be set"),
                success_url: env::var("PAYMENT_SUCCESS_URL")
                    .unwrap_or_else(|_| "http://localhost:8000/api/payments/success".to_string()),
                cancel_url: env::var("PAYMENT_CANCEL_URL")
                    .unwrap_or_else(|_| "http://localhost:8000/api/payments/failure".to_string()),
                failure_threshold: env::var("PAYMENT_FAILURE_THRESHOLD")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("PAYMENT_FAILURE_THRESHOLD must be a valid number"),
                cooldown_seconds: env::var("PAYMENT_COOLDOWN_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("PAYMENT_COOLDOWN_SECONDS must be a valid number"),
            },
        }
    }
}
