// Flight Offer Client
// Searches the supplier for priced itineraries, owning the bearer-token cache
// and the single refresh-and-retry on an authorization failure.

use crate::config::ProviderConfig;
use crate::models::FlightOffer;
use crate::supplier::{SupplierErrorBody, SupplierOfferResponse, SupplierTokenResponse};
use crate::token::{AccessToken, Clock, SystemClock, TokenCache};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// Errors surfaced to callers of `search`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("No flights found for the selected route")]
    NoResults,

    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from flight provider: {0}")]
    InvalidResponse(String),
}

// Errors raised by a transport, before they are mapped for the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("unauthorized")]
    Unauthorized(Option<String>),

    #[error("status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<TransportError> for SearchError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unauthorized(message) => SearchError::Authentication(
                message.unwrap_or_else(|| "access token rejected".to_string()),
            ),
            TransportError::Status { status, message } => SearchError::Provider {
                status,
                message: message.unwrap_or_else(|| "Failed to search flights".to_string()),
            },
            TransportError::Network(message) => SearchError::Network(message),
            TransportError::Decode(message) => SearchError::InvalidResponse(message),
        }
    }
}

pub const MAX_SEARCH_PASSENGERS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub adults: u32,
}

impl SearchQuery {
    pub fn new(
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        adults: u32,
    ) -> Self {
        Self {
            origin: origin.trim().to_uppercase(),
            destination: destination.trim().to_uppercase(),
            departure_date,
            adults,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), SearchError> {
        for (label, code) in [("origin", &self.origin), ("destination", &self.destination)] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(SearchError::InvalidRequest(format!(
                    "{} must be a 3-letter location code, got '{}'",
                    label, code
                )));
            }
        }
        if self.origin == self.destination {
            return Err(SearchError::InvalidRequest(
                "Origin and destination cannot be the same city".to_string(),
            ));
        }
        if self.departure_date < today {
            return Err(SearchError::InvalidRequest(format!(
                "departure date {} is in the past",
                self.departure_date
            )));
        }
        if !(1..=MAX_SEARCH_PASSENGERS).contains(&self.adults) {
            return Err(SearchError::InvalidRequest(format!(
                "passenger count must be between 1 and {}, got {}",
                MAX_SEARCH_PASSENGERS, self.adults
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

// Network seam between the client logic and the supplier's HTTP API
#[async_trait]
pub trait OfferTransport: Send + Sync + 'static {
    // Client-credentials exchange
    async fn request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, TransportError>;

    // Flight-offers search with an already acquired bearer token
    async fn fetch_offers(
        &self,
        token: &str,
        query: &SearchQuery,
        max_results: u32,
        currency_code: &str,
    ) -> Result<SupplierOfferResponse, TransportError>;
}

#[async_trait]
impl<T: OfferTransport> OfferTransport for Arc<T> {
    async fn request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, TransportError> {
        (**self).request_token(client_id, client_secret).await
    }

    async fn fetch_offers(
        &self,
        token: &str,
        query: &SearchQuery,
        max_results: u32,
        currency_code: &str,
    ) -> Result<SupplierOfferResponse, TransportError> {
        (**self)
            .fetch_offers(token, query, max_results, currency_code)
            .await
    }
}

// reqwest-backed transport for the real supplier
pub struct HttpOfferTransport {
    http: reqwest::Client,
    token_url: String,
    offers_url: String,
}

impl HttpOfferTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http,
            token_url: config.token_url(),
            offers_url: config.offers_url(),
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<(u16, String), TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl OfferTransport for HttpOfferTransport {
    async fn request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, TransportError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let (status, body) = Self::read_body(response).await?;
        match status {
            200..=299 => {}
            400 | 401 => return Err(TransportError::Unauthorized(SupplierErrorBody::parse(&body))),
            _ => {
                return Err(TransportError::Status {
                    status,
                    message: SupplierErrorBody::parse(&body),
                })
            }
        }

        let parsed: SupplierTokenResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TransportError::Decode("No access token received".to_string()))?;

        Ok(TokenGrant {
            access_token,
            expires_in: parsed.expires_in,
        })
    }

    async fn fetch_offers(
        &self,
        token: &str,
        query: &SearchQuery,
        max_results: u32,
        currency_code: &str,
    ) -> Result<SupplierOfferResponse, TransportError> {
        let params: Vec<(&str, String)> = vec![
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            ("departureDate", query.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", query.adults.to_string()),
            ("max", max_results.to_string()),
            ("currencyCode", currency_code.to_string()),
        ];

        let response = self
            .http
            .get(&self.offers_url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let (status, body) = Self::read_body(response).await?;
        match status {
            200..=299 => serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string())),
            401 => Err(TransportError::Unauthorized(SupplierErrorBody::parse(&body))),
            _ => Err(TransportError::Status {
                status,
                message: SupplierErrorBody::parse(&body),
            }),
        }
    }
}

// Snapshot of the client's counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub searches_sent: usize,
    pub searches_succeeded: usize,
    pub searches_failed: usize,
    pub token_requests: usize,
    pub auth_retries: usize,
}

#[derive(Debug, Default)]
struct StatsCounters {
    searches_sent: AtomicUsize,
    searches_succeeded: AtomicUsize,
    searches_failed: AtomicUsize,
    token_requests: AtomicUsize,
    auth_retries: AtomicUsize,
}

// One instance per process; cloneable handles are obtained by wrapping it in an Arc
pub struct FlightOfferClient<T: OfferTransport = HttpOfferTransport> {
    config: ProviderConfig,
    display_currency: String,
    transport: T,
    tokens: TokenCache,
    clock: Arc<dyn Clock>,
    stats: StatsCounters,
}

impl FlightOfferClient<HttpOfferTransport> {
    pub fn from_config(config: ProviderConfig) -> Result<Self, SearchError> {
        let transport = HttpOfferTransport::new(&config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: OfferTransport> FlightOfferClient<T> {
    pub fn new(config: ProviderConfig, transport: T) -> Self {
        Self {
            config,
            display_currency: "INR".to_string(),
            transport,
            tokens: TokenCache::new(),
            clock: Arc::new(SystemClock),
            stats: StatsCounters::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // Currency assumed for supplier prices that carry none
    pub fn with_display_currency(mut self, currency: &str) -> Self {
        self.display_currency = currency.to_uppercase();
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Searches one-way offers. Returns a non-empty list or an error.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<FlightOffer>, SearchError> {
        query.validate(self.clock.now().date_naive())?;

        self.stats.searches_sent.fetch_add(1, Ordering::SeqCst);
        info!(
            origin = %query.origin,
            destination = %query.destination,
            date = %query.departure_date,
            adults = query.adults,
            "searching flight offers"
        );

        let result = self.search_authenticated(query).await;
        match &result {
            Ok(offers) => {
                self.stats.searches_succeeded.fetch_add(1, Ordering::SeqCst);
                info!(count = offers.len(), "flight search returned offers");
            }
            Err(error) => {
                self.stats.searches_failed.fetch_add(1, Ordering::SeqCst);
                warn!(%error, "flight search failed");
            }
        }
        result
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            searches_sent: self.stats.searches_sent.load(Ordering::SeqCst),
            searches_succeeded: self.stats.searches_succeeded.load(Ordering::SeqCst),
            searches_failed: self.stats.searches_failed.load(Ordering::SeqCst),
            token_requests: self.stats.token_requests.load(Ordering::SeqCst),
            auth_retries: self.stats.auth_retries.load(Ordering::SeqCst),
        }
    }

    pub fn cached_token(&self) -> Option<AccessToken> {
        self.tokens.snapshot()
    }

    async fn search_authenticated(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<FlightOffer>, SearchError> {
        let token = self.ensure_token().await?;
        match self.fetch(&token, query).await {
            Err(TransportError::Unauthorized(_)) => {
                info!("access token rejected, re-authenticating once");
                self.stats.auth_retries.fetch_add(1, Ordering::SeqCst);
                self.tokens.invalidate();

                let token = self.ensure_token().await?;
                match self.fetch(&token, query).await {
                    Err(TransportError::Unauthorized(message)) => {
                        self.tokens.invalidate();
                        Err(SearchError::Authentication(message.unwrap_or_else(|| {
                            "access token rejected twice in a row".to_string()
                        })))
                    }
                    other => self.collect_offers(other),
                }
            }
            other => self.collect_offers(other),
        }
    }

    async fn fetch(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SupplierOfferResponse, TransportError> {
        self.transport
            .fetch_offers(
                token,
                query,
                self.config.max_results,
                &self.config.currency_code,
            )
            .await
    }

    fn collect_offers(
        &self,
        response: Result<SupplierOfferResponse, TransportError>,
    ) -> Result<Vec<FlightOffer>, SearchError> {
        let offers = response?.into_offers(&self.display_currency);
        if offers.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(offers)
    }

    async fn ensure_token(&self) -> Result<String, SearchError> {
        if let Some(token) = self.tokens.valid_token(self.clock.now()) {
            debug!("using cached access token");
            return Ok(token);
        }

        let (client_id, client_secret) = self.config.credentials().ok_or_else(|| {
            SearchError::Authentication(
                "API credentials are missing. Please check your environment.".to_string(),
            )
        })?;

        info!("requesting new access token");
        self.stats.token_requests.fetch_add(1, Ordering::SeqCst);
        let grant = self
            .transport
            .request_token(client_id, client_secret)
            .await
            .map_err(|error| match error {
                TransportError::Network(message) => SearchError::Network(message),
                TransportError::Unauthorized(message) => SearchError::Authentication(
                    message.unwrap_or_else(|| "API credentials were rejected".to_string()),
                ),
                TransportError::Status { status, message } => SearchError::Authentication(
                    message.unwrap_or_else(|| format!("token endpoint returned {}", status)),
                ),
                TransportError::Decode(message) => SearchError::Authentication(message),
            })?;

        let issued_at = self.clock.now();
        let token = AccessToken {
            token: grant.access_token.clone(),
            issued_at,
            expires_at: issued_at + self.config.token_policy.lifetime(grant.expires_in),
        };
        debug!(expires_at = %token.expires_at, "access token cached");
        self.tokens.store(token);

        Ok(grant.access_token)
    }
}

// In-process stand-in for the supplier
#[cfg(test)]
pub mod mock_provider {
    use super::*;
    use crate::supplier::samples::OFFERS_JSON;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Token,
        Search,
    }

    pub struct MockProvider {
        issued_count: AtomicUsize,
        valid_token: Mutex<Option<String>>,
        expires_in: Mutex<Option<i64>>,
        reject_credentials: AtomicBool,
        always_unauthorized: AtomicBool,
        offers_json: Mutex<String>,
        failure: Mutex<Option<(u16, Option<String>)>>,
        calls: Mutex<Vec<Call>>,
        last_query: Mutex<Option<(SearchQuery, u32, String)>>,
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                issued_count: AtomicUsize::new(0),
                valid_token: Mutex::new(None),
                expires_in: Mutex::new(Some(1800)),
                reject_credentials: AtomicBool::new(false),
                always_unauthorized: AtomicBool::new(false),
                offers_json: Mutex::new(OFFERS_JSON.to_string()),
                failure: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                last_query: Mutex::new(None),
            }
        }

        pub async fn set_offers_json(&self, json: &str) {
            *self.offers_json.lock().await = json.to_string();
        }

        pub async fn set_expires_in(&self, expires_in: Option<i64>) {
            *self.expires_in.lock().await = expires_in;
        }

        pub async fn fail_searches_with(&self, status: u16, message: Option<&str>) {
            *self.failure.lock().await = Some((status, message.map(str::to_string)));
        }

        pub fn reject_credentials(&self) {
            self.reject_credentials.store(true, Ordering::SeqCst);
        }

        pub fn always_unauthorized(&self) {
            self.always_unauthorized.store(true, Ordering::SeqCst);
        }

        // Server-side expiry of whatever token the client currently holds
        pub async fn revoke_current_token(&self) {
            *self.valid_token.lock().await = None;
        }

        pub async fn calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }

        pub async fn last_query(&self) -> Option<(SearchQuery, u32, String)> {
            self.last_query.lock().await.clone()
        }
    }

    #[async_trait]
    impl OfferTransport for MockProvider {
        async fn request_token(
            &self,
            client_id: &str,
            _client_secret: &str,
        ) -> Result<TokenGrant, TransportError> {
            self.calls.lock().await.push(Call::Token);
            if self.reject_credentials.load(Ordering::SeqCst) || client_id == "bad" {
                return Err(TransportError::Unauthorized(Some(
                    "Client credentials are invalid".to_string(),
                )));
            }

            let issued = self.issued_count.fetch_add(1, Ordering::SeqCst) + 1;
            let token = format!("token-{}", issued);
            *self.valid_token.lock().await = Some(token.clone());

            Ok(TokenGrant {
                access_token: token,
                expires_in: *self.expires_in.lock().await,
            })
        }

        async fn fetch_offers(
            &self,
            token: &str,
            query: &SearchQuery,
            max_results: u32,
            currency_code: &str,
        ) -> Result<SupplierOfferResponse, TransportError> {
            self.calls.lock().await.push(Call::Search);
            *self.last_query.lock().await =
                Some((query.clone(), max_results, currency_code.to_string()));

            if self.always_unauthorized.load(Ordering::SeqCst) {
                return Err(TransportError::Unauthorized(None));
            }
            if self.valid_token.lock().await.as_deref() != Some(token) {
                return Err(TransportError::Unauthorized(Some(
                    "Access token expired".to_string(),
                )));
            }
            if let Some((status, message)) = self.failure.lock().await.clone() {
                return Err(TransportError::Status { status, message });
            }

            let json = self.offers_json.lock().await.clone();
            serde_json::from_str(&json).map_err(|e| TransportError::Decode(e.to_string()))
        }
    }
}
