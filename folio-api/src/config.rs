//! Server configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use folio_coingecko::CoinGeckoConfig;
use folio_services::{HoldingsLoaderConfig, PortfolioServiceConfig, RefresherConfig};
use folio_supabase::SupabaseCredentials;

/// Everything the server needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub supabase: SupabaseCredentials,
    pub coingecko: CoinGeckoConfig,
    pub portfolio: PortfolioServiceConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Requires `SUPABASE_URL` and `SUPABASE_ANON_KEY`; everything else has
    /// a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let supabase = SupabaseCredentials {
            url: lookup("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
            anon_key: lookup("SUPABASE_ANON_KEY")
                .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            access_token: lookup("SUPABASE_ACCESS_TOKEN"),
        };

        let price_timeout =
            Duration::from_secs(parse_or(&lookup, "PRICE_REQUEST_TIMEOUT_SECS", 15)?);

        let mut coingecko = CoinGeckoConfig {
            api_key: lookup("COINGECKO_API_KEY"),
            timeout: price_timeout,
            ..CoinGeckoConfig::default()
        };
        if let Some(base_url) = lookup("COINGECKO_API_BASE") {
            coingecko.base_url = base_url;
        }

        let initial_capital: Decimal = parse_or(&lookup, "INITIAL_CAPITAL", Decimal::ZERO)?;
        if initial_capital < Decimal::ZERO {
            return Err(ConfigError::NegativeCapital(initial_capital));
        }

        let refresh_interval = parse_or(&lookup, "PRICE_REFRESH_INTERVAL_SECS", 120)?;
        let holdings_interval = parse_or(&lookup, "HOLDINGS_REFRESH_INTERVAL_SECS", 300)?;
        for (field, secs) in [
            ("PRICE_REFRESH_INTERVAL_SECS", refresh_interval),
            ("HOLDINGS_REFRESH_INTERVAL_SECS", holdings_interval),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    value: "0".to_string(),
                    error: "interval must be at least one second".to_string(),
                });
            }
        }

        Ok(Self {
            port: parse_or(&lookup, "SERVER_PORT", 3001)?,
            supabase,
            coingecko,
            portfolio: PortfolioServiceConfig {
                initial_capital,
                refresher: RefresherConfig {
                    refresh_interval: Duration::from_secs(refresh_interval),
                    price_timeout,
                },
                holdings: HoldingsLoaderConfig {
                    refresh_interval: Duration::from_secs(holdings_interval),
                },
            },
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    field: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(field) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            field,
            value: raw.clone(),
            error: e.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {field}: {error}")]
    Invalid {
        field: &'static str,
        value: String,
        error: String,
    },

    #[error("INITIAL_CAPITAL cannot be negative: {0}")]
    NegativeCapital(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://demo.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
    ];

    #[test]
    fn test_defaults() {
        let config = config(&REQUIRED).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.portfolio.initial_capital, Decimal::ZERO);
        assert_eq!(
            config.portfolio.refresher.refresh_interval,
            Duration::from_secs(120)
        );
        assert_eq!(
            config.portfolio.refresher.price_timeout,
            Duration::from_secs(15)
        );
        assert_eq!(
            config.portfolio.holdings.refresh_interval,
            Duration::from_secs(300)
        );
        assert_eq!(config.coingecko.base_url, "https://api.coingecko.com/api/v3");
        assert!(config.coingecko.api_key.is_none());
        assert!(config.supabase.access_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SERVER_PORT", "8080"),
            ("INITIAL_CAPITAL", "10000.50"),
            ("PRICE_REFRESH_INTERVAL_SECS", "60"),
            ("PRICE_REQUEST_TIMEOUT_SECS", "5"),
            ("COINGECKO_API_BASE", "https://pro-api.coingecko.com/api/v3"),
            ("COINGECKO_API_KEY", "cg-key"),
        ]);

        let config = config(&vars).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.portfolio.initial_capital, dec!(10000.50));
        assert_eq!(
            config.portfolio.refresher.refresh_interval,
            Duration::from_secs(60)
        );
        assert_eq!(config.coingecko.timeout, Duration::from_secs(5));
        assert_eq!(config.coingecko.api_key.as_deref(), Some("cg-key"));
        assert!(config.coingecko.base_url.starts_with("https://pro-api"));
    }

    #[test]
    fn test_missing_supabase() {
        let err = config(&[("SUPABASE_URL", "https://demo.supabase.co")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_ANON_KEY")));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVER_PORT", "not-a-port"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid { field: "SERVER_PORT", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("INITIAL_CAPITAL", "-1"));
        assert!(matches!(config(&vars), Err(ConfigError::NegativeCapital(_))));

        let mut vars = REQUIRED.to_vec();
        vars.push(("PRICE_REFRESH_INTERVAL_SECS", "0"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid {
                field: "PRICE_REFRESH_INTERVAL_SECS",
                ..
            })
        ));
    }
}
