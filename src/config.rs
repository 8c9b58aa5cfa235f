// Runtime configuration for the supplier client, the booking stores and the wizard

use crate::token::TokenPolicy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

// Flight-offer supplier settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub max_results: u32,
    pub currency_code: String,
    pub timeout_ms: u64,
    pub token_policy: TokenPolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://test.api.amadeus.com".to_string(),
            client_id: None,
            client_secret: None,
            max_results: 10,
            currency_code: "USD".to_string(),
            timeout_ms: 10_000,
            token_policy: TokenPolicy::default(),
        }
    }
}

impl ProviderConfig {
    pub fn token_url(&self) -> String {
        format!("{}/v1/security/oauth2/token", self.base_url.trim_end_matches('/'))
    }

    pub fn offers_url(&self) -> String {
        format!("{}/v2/shopping/flight-offers", self.base_url.trim_end_matches('/'))
    }

    // Both halves of the client-credentials pair, if present and non-blank
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }
}

// Booking record persistence settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub api_base_url: String,
    pub cache_dir: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            cache_dir: None,
            timeout_ms: 10_000,
        }
    }
}

// Display currency, conversion rates and payment simulation
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub display_currency: String,
    // units of display currency per unit of the keyed currency
    pub exchange_rates: HashMap<String, Decimal>,
    pub payment_delay: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        let mut exchange_rates = HashMap::new();
        exchange_rates.insert("USD".to_string(), Decimal::from(83));

        Self {
            display_currency: "INR".to_string(),
            exchange_rates,
            payment_delay: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub store: StoreConfig,
    pub booking: BookingConfig,
}

impl AppConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // a missing .env file is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Builds the configuration from any key lookup, defaults filling the gaps
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        config.provider.client_id = get("AMADEUS_API_KEY");
        config.provider.client_secret = get("AMADEUS_API_SECRET");
        if let Some(base_url) = get("AMADEUS_BASE_URL") {
            config.provider.base_url = base_url;
        }
        if let Some(max) = parse_value::<u32>("AMADEUS_MAX_RESULTS", get("AMADEUS_MAX_RESULTS"))? {
            if max == 0 {
                return Err(ConfigError::Invalid {
                    key: "AMADEUS_MAX_RESULTS".to_string(),
                    value: max.to_string(),
                });
            }
            config.provider.max_results = max;
        }
        if let Some(currency) = get("AMADEUS_CURRENCY") {
            config.provider.currency_code = currency.to_uppercase();
        }
        if let Some(timeout) = parse_value::<u64>("HTTP_TIMEOUT_MS", get("HTTP_TIMEOUT_MS"))? {
            config.provider.timeout_ms = timeout;
            config.store.timeout_ms = timeout;
        }

        if let Some(url) = get("BOOKING_API_URL") {
            config.store.api_base_url = url;
        }
        config.store.cache_dir = get("BOOKING_CACHE_DIR").map(PathBuf::from);

        if let Some(currency) = get("DISPLAY_CURRENCY") {
            config.booking.display_currency = currency.to_uppercase();
        }
        if let Some(rate) = parse_value::<Decimal>("USD_TO_DISPLAY_RATE", get("USD_TO_DISPLAY_RATE"))? {
            if rate <= Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    key: "USD_TO_DISPLAY_RATE".to_string(),
                    value: rate.to_string(),
                });
            }
            config.booking.exchange_rates.insert("USD".to_string(), rate);
        }
        if let Some(delay) = parse_value::<u64>("PAYMENT_DELAY_MS", get("PAYMENT_DELAY_MS"))? {
            config.booking.payment_delay = Duration::from_millis(delay);
        }

        // supplier prices must be convertible into the display currency
        let provider_currency = &config.provider.currency_code;
        if provider_currency != &config.booking.display_currency
            && !config.booking.exchange_rates.contains_key(provider_currency)
        {
            return Err(ConfigError::Missing(format!(
                "exchange rate from {} to {}",
                provider_currency, config.booking.display_currency
            )));
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.provider.max_results, 10);
        assert_eq!(config.provider.currency_code, "USD");
        assert!(config.provider.credentials().is_none());
        assert_eq!(
            config.provider.offers_url(),
            "https://test.api.amadeus.com/v2/shopping/flight-offers"
        );
        assert_eq!(config.booking.display_currency, "INR");
        assert_eq!(config.booking.exchange_rates["USD"], Decimal::from(83));
        assert_eq!(config.booking.payment_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AMADEUS_API_KEY", "key"),
            ("AMADEUS_API_SECRET", "secret"),
            ("AMADEUS_BASE_URL", "http://localhost:9000/"),
            ("AMADEUS_MAX_RESULTS", "25"),
            ("BOOKING_CACHE_DIR", "/tmp/bookings"),
            ("USD_TO_DISPLAY_RATE", "84.5"),
            ("PAYMENT_DELAY_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.provider.credentials(), Some(("key", "secret")));
        assert_eq!(
            config.provider.token_url(),
            "http://localhost:9000/v1/security/oauth2/token"
        );
        assert_eq!(config.provider.max_results, 25);
        assert_eq!(config.store.cache_dir, Some(PathBuf::from("/tmp/bookings")));
        assert_eq!(
            config.booking.exchange_rates["USD"],
            Decimal::from_str("84.5").unwrap()
        );
        assert_eq!(config.booking.payment_delay, Duration::ZERO);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("AMADEUS_MAX_RESULTS", "ten")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = AppConfig::from_lookup(lookup_from(&[("USD_TO_DISPLAY_RATE", "-2")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_unconvertible_provider_currency_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("AMADEUS_CURRENCY", "eur")]));
        assert!(matches!(result, Err(ConfigError::Missing(_))));

        let same = AppConfig::from_lookup(lookup_from(&[
            ("AMADEUS_CURRENCY", "inr"),
            ("DISPLAY_CURRENCY", "INR"),
        ]));
        assert!(same.is_ok());
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AMADEUS_API_KEY", "key"),
            ("AMADEUS_API_SECRET", "  "),
        ]))
        .unwrap();
        assert!(config.provider.credentials().is_none());
    }
}
