use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

pub const DEFAULT_GATEWAY_URL: &str = "https://app.sandbox.midtrans.com";
pub const DEFAULT_MERCHANT_NAME: &str = "Costume Rental";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub server_key: String,
    pub merchant_name: String,
    pub timeout_secs: u64,
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: parse_or("SERVER_PORT", 3000)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            gateway: GatewayConfig {
                base_url: env::var("PAYMENT_GATEWAY_URL")
                    .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
                server_key: env::var("PAYMENT_SERVER_KEY")
                    .context("PAYMENT_SERVER_KEY must be set")?,
                merchant_name: env::var("MERCHANT_NAME")
                    .unwrap_or_else(|_| DEFAULT_MERCHANT_NAME.to_string()),
                timeout_secs: parse_or("GATEWAY_TIMEOUT_SECS", 30)?,
                failure_threshold: parse_or("GATEWAY_FAILURE_THRESHOLD", 3)?,
                reset_timeout_secs: parse_or("GATEWAY_RESET_TIMEOUT_SECS", 60)?,
            },
        })
    }

    /// Checks values that parse fine but cannot work at runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        if self.gateway.server_key.trim().is_empty() {
            anyhow::bail!("PAYMENT_SERVER_KEY is empty");
        }
        if self.gateway.failure_threshold == 0 {
            anyhow::bail!("GATEWAY_FAILURE_THRESHOLD must be greater than 0");
        }

        url::Url::parse(&self.gateway.base_url)
            .context("PAYMENT_GATEWAY_URL is not a valid URL")?;

        Ok(())
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/costumes".to_string(),
            database_max_connections: 5,
            gateway: GatewayConfig {
                base_url: DEFAULT_GATEWAY_URL.to_string(),
                server_key: "SB-Mid-server-test".to_string(),
                merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
                timeout_secs: 30,
                failure_threshold: 3,
                reset_timeout_secs: 60,
            },
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_server_key() {
        let mut config = config();
        config.gateway.server_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_gateway_url() {
        let mut config = config();
        config.gateway.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: u16 = parse_or("COSTUME_PAYMENTS_UNSET_TEST_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }
}
