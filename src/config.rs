//! Environment-driven configuration

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use uuid::Uuid;

const DEFAULT_COMMISSION_RATE: &str = "0.10";
const DEFAULT_PENALTY_RATE: &str = "0.05";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Platform commission as a fraction of the price, 0..=1.
    pub commission_rate: Decimal,
    /// Per-party penalty as a fraction of the price, 0..=1.
    pub penalty_rate: Decimal,
    /// Revenue account credited with commissions and penalties.
    pub platform_account_id: Uuid,
    pub jwt_secret: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .context("PORT must be a number")?;

        let commission_rate = parse_rate(
            &env::var("PLATFORM_COMMISSION_RATE")
                .unwrap_or_else(|_| DEFAULT_COMMISSION_RATE.to_string()),
            "PLATFORM_COMMISSION_RATE",
        )?;

        let penalty_rate = parse_rate(
            &env::var("DISPUTE_PENALTY_RATE")
                .unwrap_or_else(|_| DEFAULT_PENALTY_RATE.to_string()),
            "DISPUTE_PENALTY_RATE",
        )?;

        let platform_account_id = env::var("PLATFORM_ACCOUNT_ID")
            .context("PLATFORM_ACCOUNT_ID must be set")?
            .parse::<Uuid>()
            .context("PLATFORM_ACCOUNT_ID must be a UUID")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url,
            port,
            commission_rate,
            penalty_rate,
            platform_account_id,
            jwt_secret,
            cors_allowed_origins,
        })
    }
}

fn parse_rate(raw: &str, name: &str) -> Result<Decimal> {
    let rate = Decimal::from_str(raw).with_context(|| format!("{name} must be a decimal"))?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        bail!("{name} must be between 0 and 1, got {rate}");
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_rates() {
        assert_eq!(
            parse_rate("0.10", "RATE").unwrap(),
            Decimal::from_str("0.10").unwrap()
        );
        assert_eq!(parse_rate("0", "RATE").unwrap(), Decimal::ZERO);
        assert_eq!(parse_rate("1", "RATE").unwrap(), Decimal::ONE);
    }

    #[test]
    fn rejects_out_of_range_rates() {
        assert!(parse_rate("1.5", "RATE").is_err());
        assert!(parse_rate("-0.1", "RATE").is_err());
        assert!(parse_rate("ten percent", "RATE").is_err());
    }
}
